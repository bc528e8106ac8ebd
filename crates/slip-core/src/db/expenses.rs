//! Expense CRUD and period-window queries

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, Expense, ExpenseStatus, NewExpense};

impl Database {
    /// Persist a new expense
    ///
    /// Rejects negative amounts before hitting the CHECK constraint so the
    /// caller gets a readable error instead of a SQLite one.
    pub fn create_expense(&self, expense: &NewExpense) -> Result<Expense> {
        if expense.amount < 0.0 {
            return Err(Error::InvalidData(format!(
                "Expense amount must be non-negative, got {}",
                expense.amount
            )));
        }

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO expenses (user_id, image_url, merchant, amount, date,
             category, currency, language, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                expense.user_id,
                expense.image_url,
                expense.merchant,
                expense.amount,
                expense.date.to_string(),
                expense.category.as_str(),
                expense.currency,
                expense.language,
                expense.status.as_str(),
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_expense(id)?
            .ok_or_else(|| Error::NotFound(format!("Expense {} after insert", id)))
    }

    /// Get an expense by ID
    pub fn get_expense(&self, id: i64) -> Result<Option<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, image_url, merchant, amount, date, category,
                    currency, language, status, created_at, updated_at
             FROM expenses WHERE id = ?",
        )?;

        let expense = stmt
            .query_row(params![id], Self::row_to_expense)
            .optional()?;

        Ok(expense)
    }

    /// List a user's expenses, newest transaction date first
    pub fn list_expenses_for_user(&self, user_id: i64) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, image_url, merchant, amount, date, category,
                    currency, language, status, created_at, updated_at
             FROM expenses WHERE user_id = ? ORDER BY date DESC, id DESC",
        )?;

        let expenses = stmt
            .query_map(params![user_id], Self::row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// List a user's expenses with `date >= since`, for summary windows
    pub fn list_expenses_since(&self, user_id: i64, since: NaiveDate) -> Result<Vec<Expense>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, image_url, merchant, amount, date, category,
                    currency, language, status, created_at, updated_at
             FROM expenses WHERE user_id = ? AND date >= ? ORDER BY date DESC, id DESC",
        )?;

        let expenses = stmt
            .query_map(params![user_id, since.to_string()], Self::row_to_expense)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Count all expenses (for the status command)
    pub fn count_expenses(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Helper to convert a row to Expense
    fn row_to_expense(row: &rusqlite::Row) -> rusqlite::Result<Expense> {
        let date_str: String = row.get(5)?;
        let category_str: String = row.get(6)?;
        let status_str: String = row.get(9)?;
        let created_at_str: String = row.get(10)?;
        let updated_at_str: String = row.get(11)?;

        Ok(Expense {
            id: row.get(0)?,
            user_id: row.get(1)?,
            image_url: row.get(2)?,
            merchant: row.get(3)?,
            amount: row.get(4)?,
            date: NaiveDate::parse_from_str(&date_str, "%Y-%m-%d").unwrap_or_default(),
            category: category_str.parse::<Category>().ok(),
            currency: row.get(7)?,
            language: row.get(8)?,
            status: status_str.parse().unwrap_or(ExpenseStatus::Pending),
            created_at: parse_datetime(&created_at_str),
            updated_at: parse_datetime(&updated_at_str),
        })
    }
}
