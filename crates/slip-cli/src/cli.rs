//! CLI argument definitions using clap
//!
//! This module contains the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Slip - WhatsApp receipt-tracking bot
#[derive(Parser)]
#[command(name = "slip")]
#[command(about = "Self-hosted WhatsApp receipt tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "slip.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SLIP_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Start the webhook and API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },

    /// Show database status (encryption, size, row counts)
    Status,

    /// List a user's expenses
    Expenses {
        /// User's phone number (E.164, e.g. +15551234567)
        #[arg(short, long)]
        phone: String,
    },

    /// Generate a spending summary for a user
    Summary {
        /// User's phone number (E.164, e.g. +15551234567)
        #[arg(short, long)]
        phone: String,

        /// Summary window: week, month, or ytd
        #[arg(long, default_value = "week")]
        period: String,
    },
}
