//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod expenses;
pub mod health;
pub mod summary;
pub mod webhook;

// Re-export all handlers for use in router
pub use expenses::*;
pub use health::*;
pub use summary::*;
pub use webhook::*;
