//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `open_service` - Database plus graph configuration, ready to run
//! - `cmd_init` - Initialize the database

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tally_core::{Database, GraphConfig, GraphService};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path is not valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

/// Open the database and load the graph configuration
pub fn open_service(
    db_path: &Path,
    no_encrypt: bool,
    config_path: Option<&Path>,
) -> Result<Arc<GraphService>> {
    let db = open_db(db_path, no_encrypt)?;
    let config = GraphConfig::load(config_path).context("Failed to load graph configuration")?;
    Ok(Arc::new(GraphService::with_database(db, config)))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let users = db.list_user_ids().context("Failed to read transactions")?;
    println!("   {} user(s) with transactions", users.len());

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Build relation graphs: tally rebuild --all");
    println!("  2. See recommendations: tally recommend --user 1");

    Ok(())
}
