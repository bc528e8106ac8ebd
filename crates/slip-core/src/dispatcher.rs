//! Conversation dispatcher
//!
//! Routes each inbound WhatsApp message to exactly one flow: delivery-status
//! ack, onboarding, the receipt pipeline, or a summary request. Routing is
//! keyed on the sender's phone number; handling for one phone is serialized
//! through its onboarding session slot so near-simultaneous messages cannot
//! interleave.
//!
//! Upstream failures (OCR, AI, messaging, persistence) never escape to the
//! webhook: they are logged and turned into a generic apology reply so the
//! provider always gets its ack.

use chrono::Utc;
use tracing::{debug, warn};

use crate::ai::{AiBackend, AiClient};
use crate::db::Database;
use crate::error::{Error, Result};
use crate::messaging::{MessageSender, Messenger};
use crate::models::{
    Category, Expense, ExpenseStatus, InboundMessage, NewExpense, NewUser, Period, User,
    DEFAULT_CURRENCY,
};
use crate::ocr::{OcrBackend, OcrClient};
use crate::onboarding::{is_valid_email, OnboardingState, OnboardingStep, SessionStore};
use crate::summary::SummaryGenerator;

/// Replies sent by the dispatcher, public so server tests can assert on them
pub mod replies {
    pub const NAME_PROMPT: &str = "Hi! Welcome to Slip. What's your name?";
    pub const EMAIL_INVALID: &str =
        "That doesn't look like an email address. Please send it like name@example.com.";
    pub const JOIN_FIRST: &str = "Hi! Send \"join\" to get started.";
    pub const HELP: &str = "Send a receipt photo to record an expense, or ask for a \"summary\" \
        (add \"month\" or \"year\" for a longer window).";
    pub const APOLOGY: &str =
        "Sorry, something went wrong processing that. Please try again in a bit.";

    pub fn email_prompt(name: &str) -> String {
        format!("Thanks, {}! What's your email address?", name)
    }

    pub fn onboarding_complete(name: &str) -> String {
        format!(
            "You're all set, {}! Send me a receipt photo and I'll track it for you.",
            name
        )
    }

    pub fn welcome_back(name: &str) -> String {
        format!(
            "Welcome back, {}! Send a receipt photo or ask for a \"summary\".",
            name
        )
    }

    pub fn receipt_recorded(merchant: &str, amount: f64, currency: &str) -> String {
        format!(
            "Got it! Recorded {} for {:.2} {}. Ask for a \"summary\" anytime.",
            merchant, amount, currency
        )
    }
}

/// Pick the summary period mentioned in a message body
///
/// "month" and "year"/"ytd" widen the window; anything else means the
/// trailing week.
pub fn detect_period(text: &str) -> Period {
    let lower = text.to_lowercase();
    if lower.contains("month") {
        Period::Month
    } else if lower.contains("year") || lower.contains("ytd") {
        Period::Ytd
    } else {
        Period::Week
    }
}

/// Central message router over all backend clients
///
/// The OCR, AI, and messaging clients are optional so the server can come up
/// partially configured; flows that need a missing client degrade to the
/// apology reply (or silence, for outbound sends).
#[derive(Clone)]
pub struct Dispatcher {
    db: Database,
    sessions: SessionStore,
    ocr: Option<OcrClient>,
    ai: Option<AiClient>,
    messenger: Option<Messenger>,
    summaries: SummaryGenerator,
}

impl Dispatcher {
    pub fn new(
        db: Database,
        ocr: Option<OcrClient>,
        ai: Option<AiClient>,
        messenger: Option<Messenger>,
    ) -> Self {
        let summaries = SummaryGenerator::new(db.clone(), ai.clone());
        Self {
            db,
            sessions: SessionStore::new(),
            ocr,
            ai,
            messenger,
            summaries,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn summaries(&self) -> &SummaryGenerator {
        &self.summaries
    }

    pub fn messenger(&self) -> Option<&Messenger> {
        self.messenger.as_ref()
    }

    /// Handle one inbound message end to end
    ///
    /// Returns Err only for failures outside any chat flow (for example the
    /// user lookup itself); everything inside a flow is absorbed into a
    /// reply.
    pub async fn handle(&self, msg: &InboundMessage) -> Result<()> {
        if msg.is_status_update() {
            debug!(
                status = msg.message_status.as_deref().unwrap_or(""),
                sid = msg.message_sid.as_deref().unwrap_or(""),
                "Delivery status update"
            );
            return Ok(());
        }

        let phone = msg.from.trim();
        if phone.is_empty() {
            warn!("Inbound message without a sender, dropping");
            return Ok(());
        }

        let body = msg.body.trim();

        // Everything below mutates or reads this phone's onboarding state,
        // so hold its slot for the rest of the message. The user lookup also
        // happens under the lock so it cannot race a registration that
        // another message from the same phone is completing.
        let slot = self.sessions.slot(phone);
        let mut session = slot.lock().await;

        let user = self.db.get_user_by_phone(phone)?;

        if body.to_lowercase().contains("join") {
            match user {
                Some(user) => {
                    // Repeat joins are harmless; no new rows, no session
                    self.reply(phone, &replies::welcome_back(&user.name)).await;
                }
                None => {
                    *session = Some(OnboardingState::new());
                    self.reply(phone, replies::NAME_PROMPT).await;
                }
            }
            return Ok(());
        }

        if let Some(state) = session.as_ref() {
            let step = state.step;
            let name = state.name.clone();
            return self
                .handle_onboarding_step(phone, step, name, body, &mut session)
                .await;
        }
        drop(session);

        let Some(user) = user else {
            self.reply(phone, replies::JOIN_FIRST).await;
            return Ok(());
        };

        if msg.has_single_image() {
            return self.handle_receipt(&user, msg).await;
        }

        if body.to_lowercase().contains("summary") {
            return self.handle_summary(&user, detect_period(body)).await;
        }

        self.reply(phone, replies::HELP).await;
        Ok(())
    }

    /// Advance (or re-prompt) one onboarding step
    async fn handle_onboarding_step(
        &self,
        phone: &str,
        step: OnboardingStep,
        name: Option<String>,
        body: &str,
        session: &mut Option<OnboardingState>,
    ) -> Result<()> {
        match step {
            OnboardingStep::AwaitingName => {
                if body.is_empty() {
                    self.reply(phone, replies::NAME_PROMPT).await;
                    return Ok(());
                }
                *session = Some(OnboardingState {
                    step: OnboardingStep::AwaitingEmail,
                    name: Some(body.to_string()),
                });
                self.reply(phone, &replies::email_prompt(body)).await;
            }
            OnboardingStep::AwaitingEmail => {
                if !is_valid_email(body) {
                    // State unchanged, ask again
                    self.reply(phone, replies::EMAIL_INVALID).await;
                    return Ok(());
                }

                let name = name.unwrap_or_else(|| "there".to_string());
                // Persistence failures stay inside the chat flow: the webhook
                // must still ack, so apologize instead of propagating
                let user = match self.db.create_user(&NewUser {
                    phone: phone.to_string(),
                    name: name.clone(),
                    email: Some(body.to_string()),
                    company_id: None,
                }) {
                    Ok(user) => user,
                    Err(e) => {
                        warn!(phone, error = %e, "Failed to persist user at end of onboarding");
                        self.reply(phone, replies::APOLOGY).await;
                        return Ok(());
                    }
                };
                *session = None;

                debug!(user_id = user.id, phone, "Onboarding complete");
                self.reply(phone, &replies::onboarding_complete(&name)).await;
            }
        }
        Ok(())
    }

    /// Receipt pipeline: OCR, AI structuring, persistence, confirmation
    async fn handle_receipt(&self, user: &User, msg: &InboundMessage) -> Result<()> {
        let Some(media_url) = msg.media_url.as_deref() else {
            warn!(phone = %user.phone, "Image message without a media URL");
            self.reply(&user.phone, replies::APOLOGY).await;
            return Ok(());
        };

        match self.process_receipt(user, media_url).await {
            Ok(Some(expense)) => {
                self.reply(
                    &user.phone,
                    &replies::receipt_recorded(&expense.merchant, expense.amount, &expense.currency),
                )
                .await;
            }
            Ok(None) => {
                // Nothing readable on the image; deliberately no reply
                debug!(phone = %user.phone, media_url, "Receipt yielded no text, skipping");
            }
            Err(e) => {
                warn!(phone = %user.phone, error = %e, "Receipt pipeline failed");
                self.reply(&user.phone, replies::APOLOGY).await;
            }
        }
        Ok(())
    }

    /// Run the extraction and structuring stages; None means no readable text
    async fn process_receipt(&self, user: &User, media_url: &str) -> Result<Option<Expense>> {
        let ocr = self
            .ocr
            .as_ref()
            .ok_or_else(|| Error::Extraction("No OCR backend configured".into()))?;
        let text = ocr.extract_text(media_url).await?;
        if text.trim().is_empty() {
            return Ok(None);
        }

        let ai = self
            .ai
            .as_ref()
            .ok_or_else(|| Error::Extraction("No AI backend configured".into()))?;
        let parsed = ai.parse_expense(&text).await?;

        let amount = parsed
            .amount
            .ok_or_else(|| Error::InvalidData("Parsed expense is missing an amount".into()))?;
        let date = parsed
            .date
            .as_deref()
            .and_then(|d| chrono::NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or_else(|| Utc::now().date_naive());

        let expense = self.db.create_expense(&NewExpense {
            user_id: user.id,
            image_url: Some(media_url.to_string()),
            merchant: parsed
                .merchant
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "Unknown Merchant".to_string()),
            amount,
            date,
            category: parsed
                .category
                .as_deref()
                .map(Category::parse_lenient)
                .unwrap_or_default(),
            currency: parsed
                .currency
                .filter(|c| !c.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            language: parsed
                .language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| "en".to_string()),
            status: ExpenseStatus::Pending,
        })?;

        debug!(
            expense_id = expense.id,
            user_id = user.id,
            merchant = %expense.merchant,
            amount = expense.amount,
            "Receipt recorded"
        );
        Ok(Some(expense))
    }

    /// Summary flow: aggregate and send the narrative back
    async fn handle_summary(&self, user: &User, period: Period) -> Result<()> {
        match self.summaries.summarize(user.id, period).await {
            Ok(summary) => {
                self.reply(&user.phone, &summary.narrative).await;
            }
            Err(e) => {
                warn!(phone = %user.phone, error = %e, "Summary generation failed");
                self.reply(&user.phone, replies::APOLOGY).await;
            }
        }
        Ok(())
    }

    /// Send a reply, logging (not propagating) messaging failures
    async fn reply(&self, phone: &str, body: &str) -> Option<String> {
        let messenger = match &self.messenger {
            Some(m) => m,
            None => {
                debug!(phone, "No messenger configured, dropping reply");
                return None;
            }
        };
        match messenger.send(phone, body).await {
            Ok(sid) => Some(sid),
            Err(e) => {
                warn!(phone, error = %e, "Failed to send reply");
                None
            }
        }
    }
}
