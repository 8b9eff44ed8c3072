//! Config command - show the effective graph configuration

use std::path::Path;

use anyhow::{Context, Result};
use tally_core::config::default_config_path;
use tally_core::GraphConfig;

pub fn cmd_config(config_path: Option<&Path>, show_path: bool) -> Result<()> {
    if show_path {
        match config_path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(path) if path.exists() => println!("{}", path.display()),
            Some(path) => println!("{} (not present, using built-in defaults)", path.display()),
            None => println!("(no data directory, using built-in defaults)"),
        }
        return Ok(());
    }

    let config = GraphConfig::load(config_path).context("Failed to load graph configuration")?;
    print!("{}", config.to_toml()?);
    Ok(())
}
