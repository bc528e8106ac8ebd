//! Messaging gateway client
//!
//! Outbound side of the WhatsApp channel: a Twilio-style Messages API over
//! form-encoded POST with basic auth. Inbound delivery arrives separately via
//! the webhook, so this module only knows how to send.
//!
//! Rate limiting is the one retryable failure: on HTTP 429 the client waits a
//! fixed delay and retries a small bounded number of times, then surfaces the
//! error to the caller.
//!
//! # Configuration
//!
//! - `TWILIO_ACCOUNT_SID`, `TWILIO_AUTH_TOKEN`: API credentials
//! - `TWILIO_WHATSAPP_FROM`: sender number, e.g. "whatsapp:+14155238886"
//! - `MESSAGING_BACKEND=mock`: use the recording mock instead

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Maximum send attempts when rate limited
const MAX_SEND_ATTEMPTS: u32 = 3;

/// Fixed delay between rate-limited attempts
const RATE_LIMIT_DELAY: Duration = Duration::from_secs(2);

/// Channel prefix the provider uses on phone addresses
const CHANNEL_PREFIX: &str = "whatsapp:";

/// Trait for outbound message senders
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send a text message to a phone number; returns the provider message id
    async fn send(&self, to_phone: &str, body: &str) -> Result<String>;
}

/// Concrete messenger enum
#[derive(Clone)]
pub enum Messenger {
    Twilio(TwilioBackend),
    Mock(MockMessenger),
}

impl Messenger {
    /// Create a messenger from environment variables
    ///
    /// `MESSAGING_BACKEND=mock` forces the recording mock; otherwise the
    /// Twilio credentials are required and None is returned without them.
    pub fn from_env() -> Option<Self> {
        if std::env::var("MESSAGING_BACKEND").as_deref() == Ok("mock") {
            return Some(Messenger::Mock(MockMessenger::new()));
        }

        let account_sid = std::env::var("TWILIO_ACCOUNT_SID").ok()?;
        let auth_token = std::env::var("TWILIO_AUTH_TOKEN").ok()?;
        let from = std::env::var("TWILIO_WHATSAPP_FROM").ok()?;
        Some(Messenger::Twilio(TwilioBackend::new(
            &account_sid,
            &auth_token,
            &from,
        )))
    }

    /// Create a recording mock for testing
    pub fn mock() -> Self {
        Messenger::Mock(MockMessenger::new())
    }
}

#[async_trait]
impl MessageSender for Messenger {
    async fn send(&self, to_phone: &str, body: &str) -> Result<String> {
        match self {
            Messenger::Twilio(b) => b.send(to_phone, body).await,
            Messenger::Mock(b) => b.send(to_phone, body).await,
        }
    }
}

/// Twilio Messages API backend
#[derive(Clone)]
pub struct TwilioBackend {
    http_client: Client,
    account_sid: String,
    auth_token: String,
    from: String,
}

/// Successful create-message response (only the field we use)
#[derive(Debug, Deserialize)]
struct TwilioMessageResponse {
    sid: String,
}

impl TwilioBackend {
    pub fn new(account_sid: &str, auth_token: &str, from: &str) -> Self {
        Self {
            http_client: Client::new(),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from: from.to_string(),
        }
    }

    fn messages_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )
    }
}

#[async_trait]
impl MessageSender for TwilioBackend {
    async fn send(&self, to_phone: &str, body: &str) -> Result<String> {
        let to = if to_phone.starts_with(CHANNEL_PREFIX) {
            to_phone.to_string()
        } else {
            format!("{}{}", CHANNEL_PREFIX, to_phone)
        };

        for attempt in 1..=MAX_SEND_ATTEMPTS {
            let response = self
                .http_client
                .post(self.messages_url())
                .basic_auth(&self.account_sid, Some(&self.auth_token))
                .form(&[("From", self.from.as_str()), ("To", &to), ("Body", body)])
                .send()
                .await?;

            if response.status() == StatusCode::TOO_MANY_REQUESTS {
                warn!(attempt, to = %to, "Messaging gateway rate limited");
                if attempt < MAX_SEND_ATTEMPTS {
                    tokio::time::sleep(RATE_LIMIT_DELAY).await;
                    continue;
                }
                return Err(Error::RateLimited(MAX_SEND_ATTEMPTS));
            }

            if !response.status().is_success() {
                let status = response.status();
                let detail = response.text().await.unwrap_or_default();
                return Err(Error::Messaging(format!(
                    "Send failed with {}: {}",
                    status, detail
                )));
            }

            let message: TwilioMessageResponse = response.json().await?;
            debug!(sid = %message.sid, to = %to, "Message sent");
            return Ok(message.sid);
        }

        // Loop always returns; kept for the compiler
        Err(Error::RateLimited(MAX_SEND_ATTEMPTS))
    }
}

/// A message recorded by the mock messenger
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub to: String,
    pub body: String,
}

/// Mock messenger that records outbound messages for assertions
#[derive(Clone, Default)]
pub struct MockMessenger {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far, oldest first
    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("mock messenger lock").clone()
    }

    /// Make subsequent sends fail
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("mock messenger lock") = failing;
    }
}

#[async_trait]
impl MessageSender for MockMessenger {
    async fn send(&self, to_phone: &str, body: &str) -> Result<String> {
        if *self.failing.lock().expect("mock messenger lock") {
            return Err(Error::Messaging("mock send failure".into()));
        }
        let mut sent = self.sent.lock().expect("mock messenger lock");
        sent.push(SentMessage {
            to: to_phone.to_string(),
            body: body.to_string(),
        });
        Ok(format!("SMmock{:08}", sent.len()))
    }
}
