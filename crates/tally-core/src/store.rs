//! Storage seams for the graph subsystem
//!
//! The graph builder and analyzers never reach for a global client. Callers
//! hand them a [`TransactionStore`] and a [`RelationStore`] scoped to the
//! current request or job. [`crate::db::Database`] implements both; tests use
//! the in-memory store from `test_utils`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{RelationRecord, TransactionRecord};

/// Read-only source of a user's transactions
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Transactions for one user since `since`, ascending by occurrence time
    async fn transactions_for_user(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>>;

    /// Every user that owns at least one transaction
    async fn user_ids(&self) -> Result<Vec<i64>>;
}

/// Durable storage for relation records
#[async_trait]
pub trait RelationStore: Send + Sync {
    /// Remove every relation owned by the user, returning how many went away
    async fn delete_all_for_user(&self, user_id: i64) -> Result<usize>;

    /// Insert one batch atomically, returning the number of rows written
    async fn insert_batch(&self, records: &[RelationRecord]) -> Result<usize>;

    /// The user's current relation set, in insertion order
    async fn relations_for_user(&self, user_id: i64) -> Result<Vec<RelationRecord>>;
}
