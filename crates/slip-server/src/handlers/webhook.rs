//! WhatsApp webhook handler
//!
//! Twilio posts every inbound message (and every delivery-status callback)
//! here as a form body. The handler normalizes the payload, runs it through
//! the dispatcher, and always acks 200 so the provider does not retry; chat
//! flow failures become apology replies inside the dispatcher, never error
//! responses here.

use std::sync::Arc;

use axum::{extract::State, Form, Json};
use serde::Deserialize;
use tracing::debug;

use slip_core::models::InboundMessage;

use crate::{AppError, AppState};

/// Twilio message webhook form fields (only the ones the bot uses)
///
/// Twilio sends numeric fields as strings; `NumMedia` is parsed leniently.
#[derive(Debug, Default, Deserialize)]
pub struct TwilioWebhookForm {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
    #[serde(rename = "NumMedia", default)]
    pub num_media: String,
    #[serde(rename = "MediaUrl0")]
    pub media_url0: Option<String>,
    #[serde(rename = "MediaContentType0")]
    pub media_content_type0: Option<String>,
    #[serde(rename = "MessageStatus")]
    pub message_status: Option<String>,
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
}

impl TwilioWebhookForm {
    /// Normalize into the dispatcher's inbound shape
    ///
    /// The "whatsapp:" channel prefix is stripped so phone numbers match the
    /// bare form stored in the users table.
    pub fn into_inbound(self) -> InboundMessage {
        let from = self
            .from
            .strip_prefix("whatsapp:")
            .unwrap_or(&self.from)
            .to_string();

        InboundMessage {
            from,
            body: self.body,
            num_media: self.num_media.trim().parse().unwrap_or(0),
            media_url: self.media_url0,
            media_content_type: self.media_content_type0,
            message_status: self.message_status,
            message_sid: self.message_sid,
        }
    }
}

/// POST /webhook - Receive a WhatsApp message or status callback
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    Form(form): Form<TwilioWebhookForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let msg = form.into_inbound();
    debug!(
        from = %msg.from,
        num_media = msg.num_media,
        status = msg.message_status.as_deref().unwrap_or(""),
        "Webhook received"
    );

    state.dispatcher.handle(&msg).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
