//! Shared types for AI backends

use serde::{Deserialize, Serialize};

/// Structured expense record parsed from extracted receipt text
///
/// All fields are optional at this layer; the dispatcher fills defaults
/// before persisting (amount stays required, a missing date falls back to
/// today).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedExpense {
    pub merchant: Option<String>,
    pub amount: Option<f64>,
    /// YYYY-MM-DD as returned by the model
    pub date: Option<String>,
    pub category: Option<String>,
    /// ISO 4217 code
    pub currency: Option<String>,
    /// ISO 639-1 code of the receipt language
    pub language: Option<String>,
}
