//! Savings projection commands

use anyhow::{anyhow, Context, Result};
use nudge_core::aggregation::total_saved;
use nudge_core::auth::{LocalAuth, SessionProvider};
use nudge_core::db::{Database, PurchaseQuery};
use nudge_core::projection::{project, InvestmentStrategy, PROJECTION_HORIZON_YEARS};

pub fn cmd_invest(db: &Database, auth: &LocalAuth, strategy: &str) -> Result<()> {
    let strategy: InvestmentStrategy = strategy.parse().map_err(|e: String| anyhow!(e))?;
    let user_id = auth.current_user_id().context("Not signed in")?;
    let records = db.list_purchases(&PurchaseQuery::for_user(user_id))?;
    let principal = total_saved(&records);

    let projection = project(principal, strategy);

    println!();
    println!("📈 {}", strategy);
    println!("   Saved so far: ${:.2}", principal);
    println!("   ─────────────────────────────");

    if projection.points.is_empty() {
        println!("   Nothing to invest yet. Every decision you log can change that.");
        return Ok(());
    }

    let max = projection
        .points
        .iter()
        .map(|p| p.value)
        .fold(0.0_f64, f64::max);
    for point in &projection.points {
        let width = if max > 0.0 {
            ((point.value / max) * 30.0).round() as usize
        } else {
            0
        };
        println!(
            "   {:>6}  {:<30}  ${:.0}",
            point.label,
            "█".repeat(width),
            point.value
        );
    }
    println!();
    println!(
        "   In {} years: ${:.2}",
        PROJECTION_HORIZON_YEARS, projection.future_value
    );

    Ok(())
}

pub fn cmd_strategies() -> Result<()> {
    println!("Investment strategies:\n");
    for s in InvestmentStrategy::all() {
        println!("  {:<8} {}", s.key(), s);
    }
    println!();
    println!("Use: nudge invest --strategy <key>");
    Ok(())
}
