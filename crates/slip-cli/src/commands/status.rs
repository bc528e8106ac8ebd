//! Database status command implementation

use std::path::Path;

use anyhow::Result;

use super::open_db;

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    use slip_core::db::DB_KEY_ENV;
    use std::fs;

    println!();
    println!("📊 Slip Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    // Backend configuration
    println!();
    println!(
        "   AI backend: {}",
        if std::env::var("OLLAMA_HOST").is_ok() {
            "configured (OLLAMA_HOST)"
        } else {
            "not configured"
        }
    );
    println!(
        "   OCR service: {}",
        if std::env::var("OCR_API_URL").is_ok() {
            "configured (OCR_API_URL)"
        } else {
            "not configured"
        }
    );
    println!(
        "   Messaging: {}",
        if std::env::var("TWILIO_ACCOUNT_SID").is_ok() {
            "configured (TWILIO_ACCOUNT_SID)"
        } else {
            "not configured"
        }
    );

    // Try to open the database and show row counts
    if db_path.exists() {
        match open_db(db_path, no_encrypt) {
            Ok(db) => {
                if let (Ok(users), Ok(expenses)) = (db.count_users(), db.count_expenses()) {
                    println!();
                    println!("   Users: {}", users);
                    println!("   Expenses: {}", expenses);
                }
            }
            Err(e) => {
                println!();
                println!("   ❌ Error opening database: {}", e);
                if !no_encrypt && !has_key {
                    println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
                } else if has_key {
                    println!("      (Check if {} is correct)", DB_KEY_ENV);
                }
            }
        }
    }

    println!();
    Ok(())
}
