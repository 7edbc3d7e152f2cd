//! Decision history command

use anyhow::{Context, Result};
use chrono::Local;
use nudge_core::auth::{LocalAuth, SessionProvider};
use nudge_core::db::{Database, PurchaseQuery};

use super::truncate;

pub fn cmd_history(db: &Database, auth: &LocalAuth, limit: i64) -> Result<()> {
    let user_id = auth.current_user_id().context("Not signed in")?;
    let records = db.list_purchases(&PurchaseQuery::for_user(user_id).limit(limit))?;

    if records.is_empty() {
        println!("No decisions yet. Start one with:");
        println!("  nudge decide");
        return Ok(());
    }

    println!();
    println!(
        "{:<17} {:<24} {:>10} {:<13} {:<8} {:>10}",
        "DATE", "ITEM", "PLANNED", "CATEGORY", "VERDICT", "SPENT"
    );
    println!("{}", "-".repeat(88));

    for r in &records {
        println!(
            "{:<17} {:<24} {:>10} {:<13} {:<8} {:>10}",
            r.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            truncate(&r.item, 24),
            format!("${:.2}", r.amount),
            r.category.as_str(),
            r.verdict.as_str(),
            format!("${:.2}", r.final_amount),
        );
    }

    println!();
    println!("Showing {} of {} decisions", records.len(), db.count_purchases(user_id)?);
    Ok(())
}
