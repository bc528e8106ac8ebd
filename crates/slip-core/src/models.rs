//! Data models for Slip
//!
//! Two durable entities (users, expenses) plus the value types that flow
//! through the dispatcher and summary generator.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Currency reported by summaries until multi-currency aggregation is designed
pub const DEFAULT_CURRENCY: &str = "USD";

/// A registered user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// E.164-like phone number, unique per user
    pub phone: String,
    pub name: String,
    /// Collected during onboarding; nullable for rows created via the API
    pub email: Option<String>,
    pub company_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A new user to be persisted (end of onboarding, or API)
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub phone: String,
    pub name: String,
    pub email: Option<String>,
    pub company_id: Option<String>,
}

/// A recorded expense
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    /// Source receipt image, when the expense came through the chat pipeline
    pub image_url: Option<String>,
    pub merchant: String,
    /// Always non-negative
    pub amount: f64,
    pub date: NaiveDate,
    /// None when the stored value is not a known category; summaries fold
    /// these into an "Uncategorized" bucket
    pub category: Option<Category>,
    pub currency: String,
    /// Language detected on the receipt (ISO 639-1 code)
    pub language: String,
    pub status: ExpenseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A new expense before DB insertion
#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub user_id: i64,
    pub image_url: Option<String>,
    pub merchant: String,
    pub amount: f64,
    pub date: NaiveDate,
    pub category: Category,
    pub currency: String,
    pub language: String,
    #[serde(default)]
    pub status: ExpenseStatus,
}

/// Expense category
///
/// Parsing is lenient: anything the LLM returns outside the known set maps
/// to `Other` so a low-confidence parse still produces a valid row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Food,
    Travel,
    Office,
    Shopping,
    Fuel,
    Groceries,
    #[default]
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Food => "food",
            Self::Travel => "travel",
            Self::Office => "office",
            Self::Shopping => "shopping",
            Self::Fuel => "fuel",
            Self::Groceries => "groceries",
            Self::Other => "other",
        }
    }

    /// Display name used in summaries and chat messages
    pub fn label(&self) -> &'static str {
        match self {
            Self::Food => "Food",
            Self::Travel => "Travel",
            Self::Office => "Office",
            Self::Shopping => "Shopping",
            Self::Fuel => "Fuel",
            Self::Groceries => "Groceries",
            Self::Other => "Other",
        }
    }

    /// Lenient parse: unknown or empty input folds into `Other`
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(Self::Other)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "food" | "dining" | "restaurant" => Ok(Self::Food),
            "travel" | "transport" => Ok(Self::Travel),
            "office" | "supplies" => Ok(Self::Office),
            "shopping" | "retail" => Ok(Self::Shopping),
            "fuel" | "gas" | "petrol" => Ok(Self::Fuel),
            "groceries" | "grocery" => Ok(Self::Groceries),
            "other" | "misc" | "miscellaneous" => Ok(Self::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Expense lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Recorded from a parsed receipt, not yet reviewed
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

impl ExpenseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Rejected => "rejected",
        }
    }
}

impl std::str::FromStr for ExpenseStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Unknown expense status: {}", s)),
        }
    }
}

/// Summary aggregation window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    /// Trailing 7 days
    #[default]
    Week,
    /// First of the current calendar month through now
    Month,
    /// January 1 of the current year through now
    Ytd,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Week => "week",
            Self::Month => "month",
            Self::Ytd => "ytd",
        }
    }

    /// Start of the aggregation window for this period, relative to `today`
    pub fn window_start(&self, today: NaiveDate) -> NaiveDate {
        use chrono::Datelike;
        match self {
            Self::Week => today - chrono::Duration::days(7),
            Self::Month => today.with_day(1).unwrap_or(today),
            Self::Ytd => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
        }
    }
}

impl std::str::FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "ytd" | "year" => Ok(Self::Ytd),
            _ => Err(format!("Unknown period: {} (use week, month, or ytd)", s)),
        }
    }
}

/// Per-category slice of a spending summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTotal {
    /// Category label; "Uncategorized" when the stored value didn't parse
    pub category: String,
    pub amount: f64,
    /// Share of the grand total, 0..=100
    pub percentage: f64,
    pub expense_count: i64,
}

/// Spending summary for one user and period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingSummary {
    pub period: Period,
    pub window_start: NaiveDate,
    pub total_spend: f64,
    /// Ranked descending by amount
    pub categories: Vec<CategoryTotal>,
    pub currency: String,
    pub narrative: String,
}

/// An inbound webhook message, normalized from the provider's form payload
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Sender phone number with any channel prefix stripped
    pub from: String,
    pub body: String,
    pub num_media: u32,
    pub media_url: Option<String>,
    pub media_content_type: Option<String>,
    /// Present on delivery-status callbacks, absent on user messages
    pub message_status: Option<String>,
    pub message_sid: Option<String>,
}

impl InboundMessage {
    /// Delivery receipts carry a status and no user intent
    pub fn is_status_update(&self) -> bool {
        self.message_status.is_some() && self.body.trim().is_empty() && self.num_media == 0
    }

    /// True when exactly one attachment with an image content type is present
    pub fn has_single_image(&self) -> bool {
        self.num_media == 1
            && self
                .media_content_type
                .as_deref()
                .is_some_and(|ct| ct.starts_with("image/"))
    }
}
