//! Slip Core Library
//!
//! Shared functionality for the Slip receipt-tracking bot:
//! - Database access and migrations (users, expenses)
//! - Pluggable AI backends (Ollama, mock) for receipt structuring and
//!   summary narratives
//! - OCR service client for receipt text extraction
//! - Messaging gateway client (Twilio-style WhatsApp API)
//! - Onboarding session store
//! - Conversation dispatcher and spending summary generator

pub mod ai;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod messaging;
pub mod models;
pub mod ocr;
pub mod onboarding;
pub mod summary;

pub use ai::{AiBackend, AiClient, MockBackend, OllamaBackend, ParsedExpense};
pub use db::Database;
pub use dispatcher::{detect_period, Dispatcher};
pub use error::{Error, Result};
pub use messaging::{MessageSender, Messenger, MockMessenger, SentMessage};
pub use models::{
    Category, CategoryTotal, Expense, ExpenseStatus, InboundMessage, NewExpense, NewUser, Period,
    SpendingSummary, User, DEFAULT_CURRENCY,
};
pub use ocr::{MockOcrBackend, OcrBackend, OcrClient};
pub use onboarding::{is_valid_email, OnboardingState, OnboardingStep, SessionStore};
pub use summary::{build_breakdown, period_label, SummaryGenerator};
