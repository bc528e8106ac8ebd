//! Spending summary generator
//!
//! Aggregates a user's expenses over a period window into category totals
//! and a chat-ready narrative. The arithmetic is always local; the AI
//! backend only rewrites the narrative, and only for non-empty summaries.

use chrono::{NaiveDate, Utc};
use tracing::warn;

use crate::ai::{AiBackend, AiClient};
use crate::db::Database;
use crate::error::Result;
use crate::models::{CategoryTotal, Expense, Period, SpendingSummary, DEFAULT_CURRENCY};

/// Bucket label for expenses whose category is unknown
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// How many categories the narrative highlights
const NARRATIVE_TOP_N: usize = 3;

/// Summary generator over the persistence store and an optional AI backend
#[derive(Clone)]
pub struct SummaryGenerator {
    db: Database,
    ai: Option<AiClient>,
}

impl SummaryGenerator {
    pub fn new(db: Database, ai: Option<AiClient>) -> Self {
        Self { db, ai }
    }

    /// Summarize spending for the period ending today
    pub async fn summarize(&self, user_id: i64, period: Period) -> Result<SpendingSummary> {
        self.summarize_as_of(user_id, period, Utc::now().date_naive())
            .await
    }

    /// Summarize with an explicit "today" (injectable for tests)
    pub async fn summarize_as_of(
        &self,
        user_id: i64,
        period: Period,
        today: NaiveDate,
    ) -> Result<SpendingSummary> {
        let window_start = period.window_start(today);
        let expenses = self.db.list_expenses_since(user_id, window_start)?;

        if expenses.is_empty() {
            // Canned response; the AI backend is deliberately not consulted
            return Ok(SpendingSummary {
                period,
                window_start,
                total_spend: 0.0,
                categories: vec![],
                currency: DEFAULT_CURRENCY.to_string(),
                narrative: empty_narrative(period),
            });
        }

        let (total, categories) = build_breakdown(&expenses);
        let narrative = self.narrative(period, total, &categories).await;

        Ok(SpendingSummary {
            period,
            window_start,
            total_spend: total,
            categories,
            currency: DEFAULT_CURRENCY.to_string(),
            narrative,
        })
    }

    /// Produce the narrative, preferring the AI backend when configured
    ///
    /// AI failures fall back to the template so a summary request never
    /// fails because of the narrative.
    async fn narrative(&self, period: Period, total: f64, categories: &[CategoryTotal]) -> String {
        if let Some(ref ai) = self.ai {
            match ai
                .summarize_spending(period_label(period), total, DEFAULT_CURRENCY, categories)
                .await
            {
                Ok(text) if !text.trim().is_empty() => return text,
                Ok(_) => warn!("AI narrative was empty, using template"),
                Err(e) => warn!(error = %e, "AI narrative failed, using template"),
            }
        }
        template_narrative(period, total, categories)
    }
}

/// Compute the grand total and ranked per-category totals
///
/// Unknown categories fold into a single "Uncategorized" bucket. Ordering is
/// descending by amount, ties broken by label for stable output.
pub fn build_breakdown(expenses: &[Expense]) -> (f64, Vec<CategoryTotal>) {
    use std::collections::HashMap;

    let mut sums: HashMap<&str, (f64, i64)> = HashMap::new();
    let mut total = 0.0;

    for expense in expenses {
        let label = expense
            .category
            .map(|c| c.label())
            .unwrap_or(UNCATEGORIZED_LABEL);
        let entry = sums.entry(label).or_insert((0.0, 0));
        entry.0 += expense.amount;
        entry.1 += 1;
        total += expense.amount;
    }

    let mut categories: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(label, (amount, count))| CategoryTotal {
            category: label.to_string(),
            amount,
            // total > 0 is guaranteed by the caller's empty-set branch, but
            // guard anyway for zero-amount expense sets
            percentage: if total > 0.0 {
                (amount / total) * 100.0
            } else {
                0.0
            },
            expense_count: count,
        })
        .collect();

    categories.sort_by(|a, b| {
        b.amount
            .partial_cmp(&a.amount)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.category.cmp(&b.category))
    });

    (total, categories)
}

/// Human label for a period, used in narratives and AI prompts
pub fn period_label(period: Period) -> &'static str {
    match period {
        Period::Week => "the last 7 days",
        Period::Month => "this month",
        Period::Ytd => "this year",
    }
}

/// Templated narrative: total, top categories with percentages, one insight
fn template_narrative(period: Period, total: f64, categories: &[CategoryTotal]) -> String {
    let mut lines = vec![format!(
        "You spent {:.2} {} over {}.",
        total,
        DEFAULT_CURRENCY,
        period_label(period)
    )];

    let top: Vec<String> = categories
        .iter()
        .take(NARRATIVE_TOP_N)
        .map(|c| format!("{} {:.2} ({:.1}%)", c.category, c.amount, c.percentage))
        .collect();
    lines.push(format!("Top categories: {}.", top.join(", ")));

    if let Some(leader) = categories.first() {
        lines.push(format!(
            "{} is your biggest spend area - worth a look if you're trimming costs.",
            leader.category
        ));
    }

    lines.join(" ")
}

/// Canned narrative for an empty window
fn empty_narrative(period: Period) -> String {
    format!(
        "No expenses recorded for {} yet. Send me a receipt photo to get started!",
        period_label(period)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;
    use crate::models::{Category, ExpenseStatus, NewExpense, NewUser};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn seed_user(db: &Database, phone: &str) -> i64 {
        db.create_user(&NewUser {
            phone: phone.to_string(),
            name: "Sam".to_string(),
            email: Some("sam@example.com".to_string()),
            company_id: None,
        })
        .unwrap()
        .id
    }

    fn seed_expense(db: &Database, user_id: i64, d: NaiveDate, amount: f64, category: Category) {
        db.create_expense(&NewExpense {
            user_id,
            image_url: None,
            merchant: "M".to_string(),
            amount,
            date: d,
            category,
            currency: "USD".to_string(),
            language: "en".to_string(),
            status: ExpenseStatus::Pending,
        })
        .unwrap();
    }

    #[test]
    fn test_breakdown_sums_match_total() {
        let db = Database::in_memory().unwrap();
        let user = seed_user(&db, "+15550001");
        seed_expense(&db, user, date(2025, 6, 1), 10.0, Category::Food);
        seed_expense(&db, user, date(2025, 6, 2), 30.0, Category::Food);
        seed_expense(&db, user, date(2025, 6, 3), 60.0, Category::Fuel);

        let expenses = db.list_expenses_for_user(user).unwrap();
        let (total, categories) = build_breakdown(&expenses);

        assert!((total - 100.0).abs() < 1e-9);
        let sum: f64 = categories.iter().map(|c| c.amount).sum();
        assert!((sum - total).abs() < 1e-9);

        let pct: f64 = categories.iter().map(|c| c.percentage).sum();
        assert!(pct <= 100.0 + 1e-9);

        // Ranked descending
        assert_eq!(categories[0].category, "Fuel");
        assert_eq!(categories[1].category, "Food");
        assert!((categories[0].percentage - 60.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_period_windowing() {
        let db = Database::in_memory().unwrap();
        let user = seed_user(&db, "+15550002");
        let today = date(2025, 6, 15);

        seed_expense(&db, user, today, 10.0, Category::Food);
        seed_expense(&db, user, today - chrono::Duration::days(10), 20.0, Category::Fuel);
        seed_expense(&db, user, today - chrono::Duration::days(40), 30.0, Category::Travel);

        let generator = SummaryGenerator::new(db, None);

        let week = generator
            .summarize_as_of(user, Period::Week, today)
            .await
            .unwrap();
        assert!((week.total_spend - 10.0).abs() < 1e-9);

        // Run "on the 15th": the 10-day-old expense is June 5 (in month),
        // the 40-day-old one is May (excluded)
        let month = generator
            .summarize_as_of(user, Period::Month, today)
            .await
            .unwrap();
        assert!((month.total_spend - 30.0).abs() < 1e-9);

        let ytd = generator
            .summarize_as_of(user, Period::Ytd, today)
            .await
            .unwrap();
        assert!((ytd.total_spend - 60.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_summary_skips_ai() {
        let db = Database::in_memory().unwrap();
        let user = seed_user(&db, "+15550003");

        let mock = MockBackend::new();
        let generator = SummaryGenerator::new(db, Some(AiClient::Mock(mock.clone())));

        let summary = generator.summarize(user, Period::Week).await.unwrap();
        assert_eq!(summary.total_spend, 0.0);
        assert!(summary.categories.is_empty());
        assert!(summary.narrative.contains("No expenses recorded"));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_ai_narrative_used_when_available() {
        let db = Database::in_memory().unwrap();
        let user = seed_user(&db, "+15550004");
        seed_expense(&db, user, date(2025, 6, 14), 25.0, Category::Groceries);

        let generator = SummaryGenerator::new(db, Some(AiClient::mock()));
        let summary = generator
            .summarize_as_of(user, Period::Week, date(2025, 6, 15))
            .await
            .unwrap();
        assert!(summary.narrative.starts_with("Mock digest"));
    }

    #[tokio::test]
    async fn test_ai_failure_falls_back_to_template() {
        let db = Database::in_memory().unwrap();
        let user = seed_user(&db, "+15550005");
        seed_expense(&db, user, date(2025, 6, 14), 25.0, Category::Groceries);

        let mock = MockBackend::new();
        mock.set_failing(true);
        let generator = SummaryGenerator::new(db, Some(AiClient::Mock(mock)));

        let summary = generator
            .summarize_as_of(user, Period::Week, date(2025, 6, 15))
            .await
            .unwrap();
        assert!(summary.narrative.contains("Top categories"));
        assert!(summary.narrative.contains("Groceries"));
    }

    #[tokio::test]
    async fn test_template_narrative_top_three_with_percentages() {
        let db = Database::in_memory().unwrap();
        let user = seed_user(&db, "+15550006");
        seed_expense(&db, user, date(2025, 6, 10), 50.0, Category::Food);
        seed_expense(&db, user, date(2025, 6, 11), 30.0, Category::Fuel);
        seed_expense(&db, user, date(2025, 6, 12), 15.0, Category::Travel);
        seed_expense(&db, user, date(2025, 6, 13), 5.0, Category::Office);

        let generator = SummaryGenerator::new(db, None);
        let summary = generator
            .summarize_as_of(user, Period::Week, date(2025, 6, 15))
            .await
            .unwrap();

        assert!(summary.narrative.contains("Food 50.00 (50.0%)"));
        assert!(summary.narrative.contains("Fuel 30.00 (30.0%)"));
        assert!(summary.narrative.contains("Travel 15.00 (15.0%)"));
        // Fourth category is not in the top-3 listing
        assert!(!summary.narrative.contains("Office 5.00"));
    }
}
