//! Test utilities for tally-core
//!
//! [`MemoryStore`] implements both store traits in memory, records every call
//! it receives and can be told to fail specific operations.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{Error, Result};
use crate::models::{RelationRecord, TransactionRecord};
use crate::store::{RelationStore, TransactionStore};

/// A call observed by [`MemoryStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    Fetch(i64),
    DeleteAll(i64),
    InsertBatch(usize),
    ReadRelations(i64),
}

#[derive(Default)]
struct Inner {
    transactions: Vec<(i64, TransactionRecord)>,
    relations: Vec<RelationRecord>,
    calls: Vec<StoreCall>,
    batch_calls: usize,
    fail_fetch: bool,
    fail_delete: bool,
    fail_reads: bool,
    fail_batches: HashSet<usize>,
    insert_delay: Option<Duration>,
}

/// In-memory transaction and relation store
///
/// Transactions are returned in insertion order, not time order.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a transaction owned by `user_id`
    pub fn add_transaction(&self, user_id: i64, record: TransactionRecord) {
        self.lock().transactions.push((user_id, record));
    }

    /// Seed relations directly, bypassing the builder
    pub fn add_relations(&self, records: impl IntoIterator<Item = RelationRecord>) {
        self.lock().relations.extend(records);
    }

    /// Make every transaction fetch fail
    pub fn fail_fetch(&self, fail: bool) {
        self.lock().fail_fetch = fail;
    }

    /// Make every delete fail
    pub fn fail_delete(&self, fail: bool) {
        self.lock().fail_delete = fail;
    }

    /// Make every relation read fail
    pub fn fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Fail the `n`th insert_batch call (0-based, over the store's lifetime)
    pub fn fail_batch(&self, n: usize) {
        self.lock().fail_batches.insert(n);
    }

    /// Sleep inside every insert_batch call
    pub fn set_insert_delay(&self, delay: Duration) {
        self.lock().insert_delay = Some(delay);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    /// Stored relations for one user
    pub fn relations(&self, user_id: i64) -> Vec<RelationRecord> {
        self.lock()
            .relations
            .iter()
            .filter(|r| r.owner_user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn transactions_for_user(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<TransactionRecord>> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::Fetch(user_id));
        if inner.fail_fetch {
            return Err(Error::Fetch("transaction store unavailable".to_string()));
        }

        Ok(inner
            .transactions
            .iter()
            .filter(|(owner, tx)| *owner == user_id && tx.occurred_at.map_or(true, |t| t >= since))
            .map(|(_, tx)| tx.clone())
            .collect())
    }

    async fn user_ids(&self) -> Result<Vec<i64>> {
        let inner = self.lock();
        let mut ids: Vec<i64> = inner.transactions.iter().map(|(owner, _)| *owner).collect();
        ids.sort_unstable();
        ids.dedup();
        Ok(ids)
    }
}

#[async_trait]
impl RelationStore for MemoryStore {
    async fn delete_all_for_user(&self, user_id: i64) -> Result<usize> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::DeleteAll(user_id));
        if inner.fail_delete {
            return Err(Error::Persistence("delete rejected".to_string()));
        }

        let before = inner.relations.len();
        inner.relations.retain(|r| r.owner_user_id != user_id);
        Ok(before - inner.relations.len())
    }

    async fn insert_batch(&self, records: &[RelationRecord]) -> Result<usize> {
        let delay = {
            let mut inner = self.lock();
            inner.calls.push(StoreCall::InsertBatch(records.len()));
            inner.insert_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        let call = inner.batch_calls;
        inner.batch_calls += 1;
        if inner.fail_batches.contains(&call) {
            return Err(Error::Persistence(format!("batch {} rejected", call)));
        }

        inner.relations.extend_from_slice(records);
        Ok(records.len())
    }

    async fn relations_for_user(&self, user_id: i64) -> Result<Vec<RelationRecord>> {
        let mut inner = self.lock();
        inner.calls.push(StoreCall::ReadRelations(user_id));
        if inner.fail_reads {
            return Err(Error::Persistence("relation store unavailable".to_string()));
        }

        Ok(inner
            .relations
            .iter()
            .filter(|r| r.owner_user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Parse "YYYY-MM-DD HH:MM" as UTC
pub fn at(ts: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M")
        .expect("timestamp in YYYY-MM-DD HH:MM form")
        .and_utc()
}

/// A well-formed debit transaction record
pub fn tx_record(
    id: i64,
    ts: &str,
    category_id: Option<i64>,
    account_id: Option<i64>,
) -> TransactionRecord {
    TransactionRecord {
        id,
        occurred_at: Some(at(ts)),
        category_id,
        account_id,
        amount: -10.0,
        direction: "debit".to_string(),
    }
}
