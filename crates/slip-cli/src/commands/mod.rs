//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db)
//! - `expenses` - Expense listing command
//! - `serve` - Web server command
//! - `status` - Database status command
//! - `summary` - Spending summary command

pub mod core;
pub mod expenses;
pub mod serve;
pub mod status;
pub mod summary;

// Re-export command functions for main.rs
pub use core::*;
pub use expenses::*;
pub use serve::*;
pub use status::*;
pub use summary::*;

/// Truncate a string to a maximum length, adding "..." if truncated
///
/// Merchant names can be multi-byte UTF-8, so the cut point backs up to a
/// char boundary.
pub fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max.saturating_sub(3);
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
