//! Spending summary handler

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::warn;

use slip_core::messaging::MessageSender;
use slip_core::models::Period;

use crate::{AppError, AppState};

/// Query parameters for the summary endpoint
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// week (default), month, or ytd
    pub period: Option<String>,
}

/// GET /api/summary/:phone?period=week|month|ytd
///
/// Generates the summary and also pushes the narrative to the user over the
/// messaging gateway. `messageSid` is the gateway's message id, null when no
/// gateway is configured or the send failed.
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Path(phone): Path<String>,
    Query(params): Query<SummaryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    if !phone.starts_with('+') {
        return Err(AppError::bad_request(
            "Phone number must be in E.164 format starting with '+'",
        ));
    }

    let period: Period = params
        .period
        .as_deref()
        .unwrap_or("week")
        .parse()
        .map_err(|e: String| AppError::bad_request(&e))?;

    let user = state
        .db()
        .get_user_by_phone(&phone)?
        .ok_or_else(|| AppError::not_found("No user registered with that phone number"))?;

    let summary = state.dispatcher.summaries().summarize(user.id, period).await?;

    let message_sid = match state.dispatcher.messenger() {
        Some(messenger) => match messenger.send(&phone, &summary.narrative).await {
            Ok(sid) => Some(sid),
            Err(e) => {
                warn!(phone = %phone, error = %e, "Failed to send summary message");
                None
            }
        },
        None => None,
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "summary": summary.narrative,
        "spendingData": summary,
        "messageSid": message_sid,
    })))
}
