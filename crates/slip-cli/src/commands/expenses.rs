//! Expense listing command implementation

use anyhow::{anyhow, Result};
use slip_core::db::Database;

use super::truncate;

pub fn cmd_expenses_list(db: &Database, phone: &str) -> Result<()> {
    let user = db
        .get_user_by_phone(phone)?
        .ok_or_else(|| anyhow!("No user registered with phone {}", phone))?;

    let expenses = db.list_expenses_for_user(user.id)?;

    if expenses.is_empty() {
        println!("No expenses recorded for {} yet.", user.name);
        println!("Send a receipt photo to the bot to get started.");
        return Ok(());
    }

    println!();
    println!("🧾 Expenses for {} ({})", user.name, user.phone);
    println!("   ─────────────────────────────────────────────────────────────");

    for expense in &expenses {
        let category = expense
            .category
            .map(|c| c.label())
            .unwrap_or("Uncategorized");
        println!(
            "   {} │ {:>10} │ {:<12} │ {}",
            expense.date,
            format!("{:.2} {}", expense.amount, expense.currency),
            category,
            truncate(&expense.merchant, 32)
        );
    }

    println!();
    println!("   {} expense(s)", expenses.len());

    Ok(())
}
