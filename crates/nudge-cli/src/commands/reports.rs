//! Dashboard and monthly report commands

use anyhow::{Context, Result};
use chrono::Local;
use nudge_core::aggregation::DashboardSummary;
use nudge_core::ai::FinancialCoach;
use nudge_core::auth::{LocalAuth, SessionProvider};
use nudge_core::db::{Database, PurchaseQuery};
use nudge_core::reports::{MonthlyInsight, MonthlyReportGenerator};

pub fn cmd_dashboard(db: &Database, auth: &LocalAuth) -> Result<()> {
    let session = auth.current_session().context("Not signed in")?;
    let records = db.list_purchases(&PurchaseQuery::for_user(session.user_id))?;
    let summary = DashboardSummary::from_records(&records);

    println!();
    println!("╭─────────────────────────────────────────╮");
    println!("│           💰 Nudge Dashboard            │");
    println!("╰─────────────────────────────────────────╯");
    println!();
    println!("  Hi {}!", session.display_name());
    println!();
    println!("  Decisions logged:  {}", summary.decision_count);
    println!("  💵 Total saved:     ${:.2}", summary.total_saved);
    if let Some(last) = summary.last_decision_at {
        println!(
            "  Last decision:     {}",
            last.with_timezone(&Local).format("%Y-%m-%d")
        );
    }
    println!();

    if summary.total_saved > 0.0 {
        println!("  Run 'nudge invest' to see what your savings could grow into.");
    } else if summary.decision_count == 0 {
        println!("  Run 'nudge decide' before your next purchase.");
    }

    Ok(())
}

pub async fn cmd_report(
    db: &Database,
    auth: &LocalAuth,
    coach: Option<&FinancialCoach>,
) -> Result<()> {
    let user_id = auth.current_user_id().context("Not signed in")?;

    if coach.is_none() {
        println!("💡 AI insights disabled; showing totals only.");
    }

    let reports = MonthlyReportGenerator::new(db, coach)
        .generate(user_id)
        .await?;

    if reports.is_empty() {
        println!("No decisions yet, so there is nothing to report.");
        return Ok(());
    }

    for report in &reports {
        let a = &report.aggregate;
        println!();
        println!("📅 {}", a.label);
        println!("   ─────────────────────────────");
        println!("   Total spent:        ${:.2}", a.total_spent);
        println!("   Avoidable spending: ${:.2}", a.avoidable_spend);
        println!(
            "   Verdicts:           {} positive, {} neutral, {} negative",
            a.positive_count, a.neutral_count, a.negative_count
        );
        println!(
            "   Categories:         {}",
            a.categories
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );
        println!();
        match &report.insight {
            MonthlyInsight::Generated(text) => println!("   🤖 {}", text),
            MonthlyInsight::Fallback(text) => println!("   ⚠️  {}", text),
        }
    }

    Ok(())
}
