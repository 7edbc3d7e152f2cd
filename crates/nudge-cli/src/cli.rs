//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Nudge - Pause before you buy
#[derive(Parser)]
#[command(name = "nudge")]
#[command(about = "Reflect on purchases before you make them", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path (defaults to the config file value, then nudge.db)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set NUDGE_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Config file (defaults to <data dir>/nudge/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Create an account and sign in
    Signup {
        #[arg(short, long)]
        email: String,

        /// Password (prompted for if omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign in to an existing account
    Login {
        #[arg(short, long)]
        email: String,

        /// Password (prompted for if omitted)
        #[arg(long)]
        password: Option<String>,
    },

    /// Sign out and forget the saved session
    Logout,

    /// Show the signed-in account
    Whoami,

    /// Walk through a purchase decision interactively
    Decide,

    /// List past decisions, newest first
    History {
        /// Maximum number of decisions to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Show total savings
    Dashboard,

    /// Month-by-month report with AI insights
    Report {
        /// Skip AI insights
        #[arg(long)]
        no_ai: bool,
    },

    /// Project what your savings could grow into
    Invest {
        /// Strategy: snp, bonds, growth, cash
        #[arg(short, long, default_value = "snp")]
        strategy: String,
    },

    /// List investment strategies
    Strategies,

    /// Manage AI prompts
    Prompts {
        #[command(subcommand)]
        action: Option<PromptsAction>,
    },

    /// AI backend commands
    Ai {
        #[command(subcommand)]
        action: AiAction,
    },

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
    },
}

#[derive(Subcommand)]
pub enum PromptsAction {
    /// List all prompts and their override status
    List,

    /// Show the content of a prompt
    Show {
        /// Prompt ID (e.g. reflection_questions)
        prompt_id: String,

        /// Fill the placeholders with example values
        #[arg(long)]
        sample: bool,
    },

    /// Print the override directory
    Path,
}

#[derive(Subcommand)]
pub enum AiAction {
    /// Check the configured backend and run a sample prompt
    Test {
        /// Override the configured model
        #[arg(short, long)]
        model: Option<String>,
    },
}
