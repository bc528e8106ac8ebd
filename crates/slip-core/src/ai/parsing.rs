//! JSON parsing helpers for AI backend responses
//!
//! These functions extract JSON from AI model responses, which often include
//! extra text before/after the JSON payload.

use crate::error::{Error, Result};

use super::types::ParsedExpense;

/// Parse a structured expense record from an AI response
pub fn parse_expense_response(response: &str) -> Result<ParsedExpense> {
    let json_str = extract_json_object(response).ok_or_else(|| {
        Error::InvalidData(format!(
            "No JSON found in AI expense response | Raw: {}",
            truncate(response)
        ))
    })?;

    serde_json::from_str(json_str).map_err(|e| {
        Error::InvalidData(format!(
            "Invalid expense JSON from AI: {} | Raw: {}",
            e,
            truncate(json_str)
        ))
    })
}

/// Strip chatter around a narrative response
///
/// Models sometimes wrap the narrative in quotes or prefix it with a label;
/// keep this conservative and only trim whitespace and a single quote pair.
pub fn clean_narrative(response: &str) -> String {
    let trimmed = response.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    unquoted.trim().to_string()
}

/// Find the first balanced JSON object in a response
fn extract_json_object(response: &str) -> Option<&str> {
    let start = response.find('{')?;
    let mut depth = 0;

    for (i, c) in response[start..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&response[start..=start + i]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Truncate long responses for error messages
///
/// Receipts and model chatter are frequently multi-byte UTF-8, so the cut
/// point backs up to a char boundary.
fn truncate(s: &str) -> String {
    if s.len() <= 200 {
        return s.to_string();
    }
    let mut end = 200;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
