//! Text extraction (OCR) service client
//!
//! The bot never runs OCR itself; it hands the receipt image URL to a hosted
//! extraction API and gets back plain text. An empty string is a valid
//! answer and means the image yielded nothing readable.
//!
//! # Configuration
//!
//! - `OCR_API_URL`: Extraction service endpoint (required for http backend)
//! - `OCR_API_KEY`: API key sent with each request (optional)

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};

/// Trait for text extraction backends
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Extract text from the image behind `media_url`
    ///
    /// Returns an empty string when the service finds no readable text.
    async fn extract_text(&self, media_url: &str) -> Result<String>;
}

/// Concrete OCR client enum
#[derive(Clone)]
pub enum OcrClient {
    /// Hosted HTTP extraction service
    Http(HttpOcrBackend),
    /// Mock for testing
    Mock(MockOcrBackend),
}

impl OcrClient {
    /// Create an OCR client from environment variables
    ///
    /// Returns None when `OCR_API_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let url = std::env::var("OCR_API_URL").ok()?;
        let api_key = std::env::var("OCR_API_KEY").ok();
        Some(OcrClient::Http(HttpOcrBackend::new(&url, api_key)))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        OcrClient::Mock(MockOcrBackend::new())
    }
}

#[async_trait]
impl OcrBackend for OcrClient {
    async fn extract_text(&self, media_url: &str) -> Result<String> {
        match self {
            OcrClient::Http(b) => b.extract_text(media_url).await,
            OcrClient::Mock(b) => b.extract_text(media_url).await,
        }
    }
}

/// HTTP extraction backend
///
/// Posts the image URL to the service and concatenates the parsed regions.
#[derive(Clone)]
pub struct HttpOcrBackend {
    http_client: Client,
    api_url: String,
    api_key: Option<String>,
}

impl HttpOcrBackend {
    pub fn new(api_url: &str, api_key: Option<String>) -> Self {
        Self {
            http_client: Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }
}

/// One parsed region from the extraction service
#[derive(Debug, Deserialize)]
struct OcrParsedResult {
    #[serde(rename = "ParsedText", default)]
    parsed_text: String,
}

/// Response envelope from the extraction service
#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(rename = "ParsedResults", default)]
    parsed_results: Vec<OcrParsedResult>,
    #[serde(rename = "IsErroredOnProcessing", default)]
    is_errored: bool,
    #[serde(rename = "ErrorMessage", default)]
    error_message: Option<serde_json::Value>,
}

#[async_trait]
impl OcrBackend for HttpOcrBackend {
    async fn extract_text(&self, media_url: &str) -> Result<String> {
        let mut form = vec![("url", media_url.to_string())];
        if let Some(ref key) = self.api_key {
            form.push(("apikey", key.clone()));
        }

        let response = self
            .http_client
            .post(&self.api_url)
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Extraction(format!(
                "OCR service returned {}",
                response.status()
            )));
        }

        let body: OcrResponse = response.json().await?;
        if body.is_errored {
            return Err(Error::Extraction(format!(
                "OCR processing failed: {:?}",
                body.error_message
            )));
        }

        let text = body
            .parsed_results
            .iter()
            .map(|r| r.parsed_text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        debug!(media_url, chars = text.len(), "Extracted receipt text");
        Ok(text)
    }
}

/// Mock OCR backend for testing
///
/// Maps media URLs to canned text; unknown URLs yield an empty string,
/// which matches the "nothing readable" behavior of the real service.
#[derive(Clone, Default)]
pub struct MockOcrBackend {
    responses: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<Mutex<bool>>,
}

impl MockOcrBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the text returned for a media URL
    pub fn set_text(&self, media_url: &str, text: &str) {
        self.responses
            .lock()
            .expect("mock ocr lock")
            .insert(media_url.to_string(), text.to_string());
    }

    /// Make subsequent extractions fail
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().expect("mock ocr lock") = failing;
    }
}

#[async_trait]
impl OcrBackend for MockOcrBackend {
    async fn extract_text(&self, media_url: &str) -> Result<String> {
        if *self.failing.lock().expect("mock ocr lock") {
            return Err(Error::Extraction("mock extraction failure".into()));
        }
        Ok(self
            .responses
            .lock()
            .expect("mock ocr lock")
            .get(media_url)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_returns_registered_text() {
        let mock = MockOcrBackend::new();
        mock.set_text("https://media/1", "FRESH MART\nTOTAL 42.50");

        let text = mock.extract_text("https://media/1").await.unwrap();
        assert!(text.contains("FRESH MART"));
    }

    #[tokio::test]
    async fn test_mock_unknown_url_is_empty() {
        let mock = MockOcrBackend::new();
        let text = mock.extract_text("https://media/unknown").await.unwrap();
        assert!(text.is_empty());
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockOcrBackend::new();
        mock.set_failing(true);
        assert!(mock.extract_text("https://media/1").await.is_err());
    }
}
