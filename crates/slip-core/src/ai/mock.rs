//! Mock backend for testing
//!
//! Returns predictable responses for all AI operations and counts calls so
//! tests can assert the backend was (or was not) invoked.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::CategoryTotal;

use super::types::ParsedExpense;
use super::AiBackend;

/// Mock AI backend for testing
#[derive(Clone, Default)]
pub struct MockBackend {
    /// Whether health_check should return true
    healthy: bool,
    /// When set, parse_expense and summarize_spending return errors
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicU64>,
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            failing: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Create an unhealthy mock backend
    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Make subsequent operations fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of parse/summarize calls made so far
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AiBackend for MockBackend {
    async fn parse_expense(&self, text: &str) -> Result<ParsedExpense> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::InvalidData("mock parse failure".into()));
        }

        // Derive a stable record from the input so tests can vary inputs
        let upper = text.to_uppercase();
        let category = if upper.contains("GROCER") || upper.contains("MART") {
            "groceries"
        } else if upper.contains("FUEL") || upper.contains("GAS") {
            "fuel"
        } else if upper.contains("CAFE") || upper.contains("RESTAURANT") {
            "food"
        } else {
            "other"
        };

        Ok(ParsedExpense {
            merchant: Some(
                text.lines()
                    .next()
                    .unwrap_or("Unknown Merchant")
                    .trim()
                    .to_string(),
            ),
            amount: Some(42.50),
            // Today, so summary windows in tests always include the row
            date: Some(chrono::Utc::now().date_naive().to_string()),
            category: Some(category.to_string()),
            currency: Some("USD".to_string()),
            language: Some("en".to_string()),
        })
    }

    async fn summarize_spending(
        &self,
        period_label: &str,
        total: f64,
        _currency: &str,
        categories: &[CategoryTotal],
    ) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::InvalidData("mock summary failure".into()));
        }

        let top = categories
            .first()
            .map(|c| c.category.as_str())
            .unwrap_or("nothing");
        Ok(format!(
            "Mock digest for {}: {:.2} total, mostly {}.",
            period_label, total, top
        ))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
