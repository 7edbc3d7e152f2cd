//! Nudge CLI - Pause before you buy
//!
//! Usage:
//!   nudge init                    Initialize database
//!   nudge signup --email ADDR     Create an account
//!   nudge decide                  Reflect on a purchase
//!   nudge report                  Monthly report with AI insights
//!   nudge serve --port 3000       Start web server

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config = commands::load_config(cli.config.as_deref())?;
    let db_path = commands::resolve_db_path(cli.db.as_deref(), &config);
    let session_file = commands::session_path()?;

    match cli.command {
        Commands::Init => commands::cmd_init(&db_path, cli.no_encrypt),
        Commands::Signup { email, password } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let password = commands::password_or_prompt(password)?;
            commands::cmd_signup(&db, &session_file, &email, &password)
        }
        Commands::Login { email, password } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let password = commands::password_or_prompt(password)?;
            commands::cmd_login(&db, &session_file, &email, &password)
        }
        Commands::Logout => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            commands::cmd_logout(&db, &session_file)
        }
        Commands::Whoami => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            commands::cmd_whoami(&db, &session_file)
        }
        Commands::Decide => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let auth = commands::require_auth(&db, &session_file)?;
            let coach = commands::build_coach(&config)?;
            let stdin = std::io::stdin();
            commands::cmd_decide(&db, &auth, &coach, &mut stdin.lock(), &mut std::io::stdout())
                .await
                .map(|_| ())
        }
        Commands::History { limit } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let auth = commands::require_auth(&db, &session_file)?;
            commands::cmd_history(&db, &auth, limit)
        }
        Commands::Dashboard => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let auth = commands::require_auth(&db, &session_file)?;
            commands::cmd_dashboard(&db, &auth)
        }
        Commands::Report { no_ai } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let auth = commands::require_auth(&db, &session_file)?;
            let coach = if no_ai {
                None
            } else {
                match commands::build_coach(&config) {
                    Ok(coach) => Some(coach),
                    Err(e) => {
                        warn!("{:#}", e);
                        None
                    }
                }
            };
            commands::cmd_report(&db, &auth, coach.as_ref()).await
        }
        Commands::Invest { strategy } => {
            let db = commands::open_db(&db_path, cli.no_encrypt)?;
            let auth = commands::require_auth(&db, &session_file)?;
            commands::cmd_invest(&db, &auth, &strategy)
        }
        Commands::Strategies => commands::cmd_strategies(),
        Commands::Prompts { action } => match action {
            None | Some(PromptsAction::List) => commands::cmd_prompts_list(),
            Some(PromptsAction::Show { prompt_id, sample }) => {
                commands::cmd_prompts_show(&prompt_id, sample)
            }
            Some(PromptsAction::Path) => commands::cmd_prompts_path(),
        },
        Commands::Ai { action } => match action {
            AiAction::Test { model } => commands::cmd_ai_test(&config, model.as_deref()).await,
        },
        Commands::Serve { port, host } => {
            commands::cmd_serve(&db_path, &host, port, cli.no_encrypt, &config).await
        }
    }
}
