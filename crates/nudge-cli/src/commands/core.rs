//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `load_config` / `resolve_db_path` - Config resolution
//! - `build_coach` - AI coach from config
//! - `cmd_init` - Initialize the database

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nudge_core::ai::{AIClient, FinancialCoach};
use nudge_core::config::Config;
use nudge_core::db::Database;

/// Database file used when neither --db nor the config file names one
pub const DEFAULT_DB_FILE: &str = "nudge.db";

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Load config from --config or the default location, with env overrides
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    Config::load(path).context("Failed to load config")
}

/// --db wins over the config file
pub fn resolve_db_path(flag: Option<&Path>, config: &Config) -> PathBuf {
    flag.map(Path::to_path_buf)
        .or_else(|| config.database.path.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
}

/// Build the AI coach, or explain how to configure one
pub fn build_coach(config: &Config) -> Result<FinancialCoach> {
    let client = AIClient::from_config(&config.ai).with_context(|| {
        format!(
            "AI backend '{}' is not configured. Set GEMINI_API_KEY, or AI_BACKEND=ollama with OLLAMA_HOST.",
            config.ai.backend_name()
        )
    })?;
    Ok(FinancialCoach::new(client))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if db.is_encrypted().unwrap_or(false) {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create an account: nudge signup --email you@example.com");
    println!("  2. Reflect on a purchase: nudge decide");

    Ok(())
}
