//! Error types for Tally

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The transaction store could not be read. Nothing was deleted.
    #[error("Failed to fetch transactions: {0}")]
    Fetch(String),

    /// Clearing the previous relation set failed. Nothing was inserted.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Some relation batches were not written. Committed batches stay in place.
    #[error("Partial write: {written}/{expected} relations written, {failed_batches} batch(es) failed")]
    PartialWrite {
        written: usize,
        expected: usize,
        failed_batches: usize,
    },

    #[error("Background task failed: {0}")]
    Task(String),

    #[error("Rebuild timed out after {0:?}")]
    Timeout(Duration),
}

impl Error {
    /// Relations committed before the run failed, if the failure happened mid-write
    pub fn written(&self) -> Option<usize> {
        match self {
            Error::PartialWrite { written, .. } => Some(*written),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
