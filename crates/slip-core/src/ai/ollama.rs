//! Ollama backend implementation
//!
//! HTTP client for the Ollama generate API. Prompts ask for strict JSON and
//! the parsing helpers tolerate chatter around the payload anyway.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::CategoryTotal;

use super::parsing::{clean_narrative, parse_expense_response};
use super::types::ParsedExpense;
use super::AiBackend;

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("OLLAMA_HOST").ok()?;
        let model = std::env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string());
        Some(Self::new(&host, &model))
    }

    async fn generate(&self, prompt: String) -> Result<String> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt,
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Http(response.error_for_status().unwrap_err()));
        }

        let ollama_response: OllamaResponse = response.json().await?;
        debug!("Ollama response: {}", ollama_response.response);

        Ok(ollama_response.response)
    }
}

/// Request to Ollama API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[async_trait]
impl AiBackend for OllamaBackend {
    async fn parse_expense(&self, text: &str) -> Result<ParsedExpense> {
        let prompt = format!(
            r#"Extract a structured expense record from this receipt text.

Receipt text:
{}

Respond with ONLY a JSON object in this exact shape:
{{"merchant": "store name", "amount": 0.0, "date": "YYYY-MM-DD", "category": "food|travel|office|shopping|fuel|groceries|other", "currency": "USD", "language": "en"}}

Rules:
- amount is the receipt grand total as a number
- date is the transaction date on the receipt, if visible
- category must be one of the listed values
- language is the two-letter code of the receipt's language"#,
            text
        );

        let response = self.generate(prompt).await?;
        parse_expense_response(&response)
    }

    async fn summarize_spending(
        &self,
        period_label: &str,
        total: f64,
        currency: &str,
        categories: &[CategoryTotal],
    ) -> Result<String> {
        let breakdown = categories
            .iter()
            .map(|c| format!("- {}: {:.2} ({:.1}%)", c.category, c.amount, c.percentage))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"You are a friendly expense assistant. Write a short spending digest
for a chat message (3-5 sentences, no markdown).

Period: {}
Total spend: {:.2} {}
Category breakdown (ranked):
{}

Mention the top categories with their amounts and percentages, then end with
one brief, practical insight about the spending pattern."#,
            period_label, total, currency, breakdown
        );

        let response = self.generate(prompt).await?;
        Ok(clean_narrative(&response))
    }

    async fn health_check(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.http_client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
