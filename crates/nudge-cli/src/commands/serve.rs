//! Server command implementation

use std::path::Path;

use anyhow::Result;
use nudge_core::ai::{AIClient, FinancialCoach};
use nudge_core::config::Config;

use super::open_db;

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    config: &Config,
) -> Result<()> {
    println!("🚀 Starting Nudge web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);

    let server_config = nudge_server::ServerConfig::from_env();
    if !server_config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (NUDGE_ALLOWED_ORIGINS)",
            server_config.allowed_origins.join(", ")
        );
    }

    let coach = AIClient::from_config(&config.ai).map(FinancialCoach::new);
    match &coach {
        Some(c) => println!("   🤖 AI backend: {}", c.client().backend_name()),
        None => {
            println!("   ⚠️  AI backend not configured; decisions cannot advance past step 1");
            println!("      Set GEMINI_API_KEY, or AI_BACKEND=ollama with OLLAMA_HOST");
        }
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    nudge_server::serve(db, coach, host, port, server_config).await
}
