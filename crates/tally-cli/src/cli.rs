//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tally - Find the patterns behind your spending
#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Transaction relationship graph and spending recommendations", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "tally.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set TALLY_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// Graph configuration file (defaults to the user data directory, then built-in defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Rebuild relation graphs from transactions
    Rebuild {
        /// User whose graph to rebuild
        #[arg(short, long, conflicts_with = "all")]
        user: Option<i64>,

        /// Rebuild every user that has transactions
        #[arg(long)]
        all: bool,

        /// Per-user deadline in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Show relation patterns and insights
    Patterns {
        /// User to analyze
        #[arg(short, long)]
        user: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show spending recommendations
    Recommend {
        /// User to analyze
        #[arg(short, long)]
        user: i64,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the background rebuild scheduler until interrupted
    Schedule {
        /// Hours between rebuild passes (overrides TALLY_GRAPH_SCHEDULE)
        #[arg(long)]
        interval_hours: Option<u64>,
    },

    /// Print the effective graph configuration
    Config {
        /// Print the config file location instead
        #[arg(long)]
        path: bool,
    },
}

/// What `tally rebuild` should cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RebuildTarget {
    User(i64),
    All,
}
