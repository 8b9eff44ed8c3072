//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Core commands (init) and shared utilities (open_db, open_service)
//! - `graph` - Graph commands (rebuild, patterns, recommend)
//! - `schedule` - Background rebuild scheduler
//! - `config` - Configuration inspection

pub mod config;
pub mod core;
pub mod graph;
pub mod schedule;

// Re-export command functions for main.rs
pub use config::*;
pub use core::*;
pub use graph::*;
pub use schedule::*;
