//! Spending summary command implementation

use anyhow::{anyhow, Result};
use slip_core::ai::AiClient;
use slip_core::db::Database;
use slip_core::models::Period;
use slip_core::summary::SummaryGenerator;

pub async fn cmd_summary(db: &Database, phone: &str, period: &str) -> Result<()> {
    let user = db
        .get_user_by_phone(phone)?
        .ok_or_else(|| anyhow!("No user registered with phone {}", phone))?;

    let period: Period = period.parse().map_err(|e: String| anyhow!(e))?;

    // AI narrative when configured; the generator falls back to a template
    let ai = AiClient::from_env();
    let generator = SummaryGenerator::new(db.clone(), ai);
    let summary = generator.summarize(user.id, period).await?;

    println!();
    println!(
        "💰 {} spending ({} since {})",
        user.name,
        period.as_str(),
        summary.window_start
    );
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   Total: {:.2} {}",
        summary.total_spend, summary.currency
    );

    for cat in &summary.categories {
        println!(
            "   {:<14} {:>10.2}  ({:>5.1}%)  {} expense(s)",
            cat.category, cat.amount, cat.percentage, cat.expense_count
        );
    }

    println!();
    println!("   {}", summary.narrative);
    println!();

    Ok(())
}
