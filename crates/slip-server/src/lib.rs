//! Slip Web Server
//!
//! Axum-based webhook and REST API for the Slip receipt-tracking bot.
//!
//! The webhook endpoint is the WhatsApp entry point: every inbound message
//! flows through the conversation dispatcher and is always acked with 200 so
//! the provider does not retry. The `/api` endpoints expose the same data
//! over plain HTTP.
//!
//! - Restrictive CORS policy
//! - Request tracing via tower-http
//! - Sanitized error responses (internals are logged, not returned)

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use slip_core::ai::{AiBackend, AiClient};
use slip_core::db::Database;
use slip_core::dispatcher::Dispatcher;
use slip_core::messaging::Messenger;
use slip_core::ocr::OcrClient;

mod handlers;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
}

/// Shared application state
pub struct AppState {
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn db(&self) -> &Database {
        self.dispatcher.db()
    }
}

/// Create the application router around a fully built dispatcher
///
/// The dispatcher is passed in (rather than built from env here) so tests
/// can wire in mock clients.
pub fn create_router(dispatcher: Dispatcher, config: ServerConfig) -> Router {
    let state = Arc::new(AppState { dispatcher });

    let api_routes = Router::new()
        .route("/expenses", post(handlers::create_expense))
        .route("/expenses/:phone", get(handlers::list_expenses))
        .route("/summary/:phone", get(handlers::get_summary));

    // Build CORS layer
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE])
    };

    Router::new()
        .route("/webhook", post(handlers::receive_webhook))
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
}

/// Start the server, wiring clients from the environment
pub async fn serve(db: Database, host: &str, port: u16, config: ServerConfig) -> anyhow::Result<()> {
    let ai = AiClient::from_env();
    match ai {
        Some(ref client) => {
            info!(
                "AI backend configured: {} (model: {})",
                client.host(),
                client.model()
            );
        }
        None => {
            info!("AI backend not configured (set OLLAMA_HOST to enable receipt parsing)");
        }
    }

    let ocr = OcrClient::from_env();
    if ocr.is_none() {
        info!("OCR service not configured (set OCR_API_URL to enable receipt extraction)");
    }

    let messenger = Messenger::from_env();
    if messenger.is_none() {
        warn!("Messaging gateway not configured - replies will be dropped (set TWILIO_* vars)");
    }

    check_ai_connection(ai.as_ref()).await;

    let dispatcher = Dispatcher::new(db, ocr, ai, messenger);
    let app = create_router(dispatcher, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Check and log AI backend connection status
async fn check_ai_connection(ai: Option<&AiClient>) {
    if let Some(client) = ai {
        if client.health_check().await {
            info!(
                "AI backend connected: {} (model: {})",
                client.host(),
                client.model()
            );
        } else {
            warn!(
                "AI backend configured but not responding: {} (model: {})",
                client.host(),
                client.model()
            );
        }
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}

#[cfg(test)]
mod tests;
