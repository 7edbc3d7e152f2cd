//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - init and shared utilities (open_db, config, AI coach)
//! - `auth` - signup, login, logout, whoami and the saved session
//! - `decide` - the interactive three-step purchase decision
//! - `history` - past decisions
//! - `reports` - dashboard and monthly reports
//! - `invest` - savings projections
//! - `prompts` - Prompt library management commands
//! - `ai` - AI backend diagnostics
//! - `serve` - Web server command

pub mod ai;
pub mod auth;
pub mod core;
pub mod decide;
pub mod history;
pub mod invest;
pub mod prompts;
pub mod reports;
pub mod serve;

// Re-export command functions for main.rs
pub use ai::*;
pub use auth::*;
pub use core::*;
pub use decide::*;
pub use history::*;
pub use invest::*;
pub use prompts::*;
pub use reports::*;
pub use serve::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
