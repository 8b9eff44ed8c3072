//! Tally CLI - Transaction relationship graph
//!
//! Usage:
//!   tally init                         Initialize database
//!   tally rebuild --user 1             Rebuild one user's relation graph
//!   tally rebuild --all                Rebuild every user's graph
//!   tally recommend --user 1 --json    Print recommendations as JSON

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
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

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Rebuild {
            user,
            all,
            timeout_secs,
        } => {
            let service = commands::open_service(&cli.db, cli.no_encrypt, config_path)?;
            let target = match (user, all) {
                (Some(user_id), false) => RebuildTarget::User(user_id),
                (None, true) => RebuildTarget::All,
                _ => anyhow::bail!("Specify exactly one of --user ID or --all"),
            };
            commands::cmd_rebuild(service, target, timeout_secs).await
        }
        Commands::Patterns { user, json } => {
            let service = commands::open_service(&cli.db, cli.no_encrypt, config_path)?;
            commands::cmd_patterns(&service, user, json).await
        }
        Commands::Recommend { user, json } => {
            let service = commands::open_service(&cli.db, cli.no_encrypt, config_path)?;
            commands::cmd_recommend(&service, user, json).await
        }
        Commands::Schedule { interval_hours } => {
            let service = commands::open_service(&cli.db, cli.no_encrypt, config_path)?;
            commands::cmd_schedule(service, interval_hours).await
        }
        Commands::Config { path } => commands::cmd_config(config_path, path),
    }
}
