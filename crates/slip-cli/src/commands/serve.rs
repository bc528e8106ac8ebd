//! Server command implementation

use std::path::Path;

use anyhow::Result;

use slip_server::ServerConfig;

use super::open_db;

pub async fn cmd_serve(db_path: &Path, host: &str, port: u16, no_encrypt: bool) -> Result<()> {
    println!("🚀 Starting Slip server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    println!("   Webhook:   http://{}:{}/webhook", host, port);

    // Parse allowed CORS origins from environment (comma-separated)
    let allowed_origins: Vec<String> = std::env::var("SLIP_ALLOWED_ORIGINS")
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let db = open_db(db_path, no_encrypt)?;
    let config = ServerConfig { allowed_origins };

    slip_server::serve(db, host, port, config).await
}
