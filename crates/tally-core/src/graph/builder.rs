//! Graph Builder - turns a transaction snapshot into a full relation set
//!
//! A rebuild has two I/O points, the transaction fetch and the batched
//! relation writes. Everything in between is synchronous work over the
//! in-memory snapshot (see [`build_relations`]).
//!
//! Persistence is full-replace: the user's previous relations are deleted
//! and the new set is inserted in fixed-size batches. A failed fetch aborts
//! before anything is deleted. A failed batch does not roll back earlier
//! batches; the next successful rebuild repairs the partial state.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::config::{BucketOverflow, BuilderConfig};
use crate::error::{Error, Result};
use crate::models::{
    EntityRef, Relation, RelationRecord, RelationType, Transaction, TransactionRecord,
};
use crate::store::{RelationStore, TransactionStore};

/// Strength of transaction → category and transaction → account edges
pub const STRUCTURAL_STRENGTH: f64 = 1.0;
/// Strength of a same-day edge between transactions sharing a category
pub const SAME_DAY_SAME_CATEGORY_STRENGTH: f64 = 0.8;
/// Strength of any other same-day edge
pub const SAME_DAY_STRENGTH: f64 = 0.5;

/// Outcome of a successful rebuild
#[derive(Debug, Clone, Serialize)]
pub struct RebuildSummary {
    pub user_id: i64,
    /// Valid transactions in the snapshot
    pub transactions: usize,
    /// Malformed records skipped at the fetch boundary
    pub skipped: usize,
    /// Relations removed from the previous snapshot
    pub deleted: usize,
    /// Relations written
    pub written: usize,
    pub by_type: BTreeMap<RelationType, usize>,
}

/// Builds and persists one user's relation graph
pub struct GraphBuilder {
    transactions: Arc<dyn TransactionStore>,
    relations: Arc<dyn RelationStore>,
    config: BuilderConfig,
}

impl GraphBuilder {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        relations: Arc<dyn RelationStore>,
        config: BuilderConfig,
    ) -> Self {
        Self {
            transactions,
            relations,
            config,
        }
    }

    /// Rebuild over the configured lookback window, returning the relation count written
    pub async fn rebuild(&self, user_id: i64) -> Result<usize> {
        let since = lookback_start(Utc::now(), self.config.lookback_months);
        Ok(self.rebuild_detailed(user_id, since).await?.written)
    }

    /// Rebuild from transactions since `since`
    pub async fn rebuild_since(&self, user_id: i64, since: DateTime<Utc>) -> Result<usize> {
        Ok(self.rebuild_detailed(user_id, since).await?.written)
    }

    /// Rebuild and report what happened
    pub async fn rebuild_detailed(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<RebuildSummary> {
        // A read failure must never reach the delete below
        let records = self
            .transactions
            .transactions_for_user(user_id, since)
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let (snapshot, skipped) = prepare_snapshot(records);
        let relations = build_relations(user_id, &snapshot, &self.config)?;

        let mut by_type = BTreeMap::new();
        for r in &relations {
            *by_type.entry(r.relation_type).or_insert(0) += 1;
        }

        let deleted = self
            .relations
            .delete_all_for_user(user_id)
            .await
            .map_err(|e| Error::Persistence(format!("Failed to clear relations: {}", e)))?;

        let records: Vec<RelationRecord> = relations.iter().map(RelationRecord::from).collect();
        let written = self.write_batches(user_id, &records).await?;

        let summary = RebuildSummary {
            user_id,
            transactions: snapshot.len(),
            skipped,
            deleted,
            written,
            by_type,
        };

        info!(
            user_id,
            transactions = summary.transactions,
            skipped = summary.skipped,
            relations = summary.written,
            "Relation graph rebuilt"
        );
        Ok(summary)
    }

    async fn write_batches(&self, user_id: i64, records: &[RelationRecord]) -> Result<usize> {
        let mut written = 0;
        let mut failed_batches = 0;

        for (index, batch) in records.chunks(self.config.batch_size).enumerate() {
            match self.insert_with_retry(batch).await {
                Ok(count) => written += count,
                Err(e) => {
                    failed_batches += 1;
                    warn!(user_id, batch = index, size = batch.len(), error = %e, "Relation batch insert failed");
                }
            }
        }

        if failed_batches > 0 {
            error!(
                user_id,
                written,
                expected = records.len(),
                failed_batches,
                "Relation graph partially written"
            );
            return Err(Error::PartialWrite {
                written,
                expected: records.len(),
                failed_batches,
            });
        }

        Ok(written)
    }

    async fn insert_with_retry(&self, batch: &[RelationRecord]) -> Result<usize> {
        let mut attempt = 0;
        loop {
            match self.relations.insert_batch(batch).await {
                Ok(count) => return Ok(count),
                Err(e) if attempt < self.config.batch_retries => {
                    attempt += 1;
                    debug!(attempt, error = %e, "Retrying relation batch");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Start of the lookback window ending at `now`
pub fn lookback_start(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Validate fetched records and order them by time
///
/// Malformed records are skipped with a warning. Returns the snapshot and
/// the number of records skipped.
pub fn prepare_snapshot(records: Vec<TransactionRecord>) -> (Vec<Transaction>, usize) {
    let mut skipped = 0;
    let mut snapshot: Vec<Transaction> = records
        .into_iter()
        .filter_map(|record| {
            let id = record.id;
            match Transaction::try_from(record) {
                Ok(tx) => Some(tx),
                Err(e) => {
                    skipped += 1;
                    warn!(transaction_id = id, error = %e, "Skipping malformed transaction");
                    None
                }
            }
        })
        .collect();

    snapshot.sort_by(|a, b| {
        a.occurred_at
            .cmp(&b.occurred_at)
            .then_with(|| a.id.cmp(&b.id))
    });

    (snapshot, skipped)
}

/// Build the complete relation set for a time-ordered snapshot
pub fn build_relations(
    user_id: i64,
    snapshot: &[Transaction],
    config: &BuilderConfig,
) -> Result<Vec<Relation>> {
    let mut relations = structural_edges(user_id, snapshot);
    relations.extend(adjacency_edges(user_id, snapshot, config));
    relations.extend(same_day_edges(user_id, snapshot, config)?);
    Ok(relations)
}

/// `belongs_to` and `from_account` edges
pub fn structural_edges(user_id: i64, snapshot: &[Transaction]) -> Vec<Relation> {
    let mut edges = Vec::new();
    for tx in snapshot {
        let node = EntityRef::transaction(tx.id);
        if let Some(category_id) = tx.category_id {
            edges.push(Relation::new(
                user_id,
                node,
                EntityRef::category(category_id),
                RelationType::BelongsTo,
                STRUCTURAL_STRENGTH,
            ));
        }
        if let Some(account_id) = tx.account_id {
            edges.push(Relation::new(
                user_id,
                node,
                EntityRef::account(account_id),
                RelationType::FromAccount,
                STRUCTURAL_STRENGTH,
            ));
        }
    }
    edges
}

/// Strength of a `followed_by` edge for a gap of `delta_secs`, or `None`
/// when the gap is outside the window
pub fn adjacency_strength(delta_secs: f64, config: &BuilderConfig) -> Option<f64> {
    let window = config.window_secs();
    if delta_secs < 0.0 || delta_secs > window {
        return None;
    }
    Some((1.0 - delta_secs / window).max(config.followed_by_floor))
}

/// `followed_by` edges between consecutive transactions
pub fn adjacency_edges(
    user_id: i64,
    snapshot: &[Transaction],
    config: &BuilderConfig,
) -> Vec<Relation> {
    snapshot
        .windows(2)
        .filter_map(|pair| {
            let (a, b) = (&pair[0], &pair[1]);
            let delta_secs = (b.occurred_at - a.occurred_at).num_milliseconds() as f64 / 1000.0;
            let strength = adjacency_strength(delta_secs, config)?;
            Some(
                Relation::new(
                    user_id,
                    EntityRef::transaction(a.id),
                    EntityRef::transaction(b.id),
                    RelationType::FollowedBy,
                    strength,
                )
                .with_metadata(json!({ "time_diff_hours": delta_secs / 3600.0 })),
            )
        })
        .collect()
}

/// `same_day` / `same_day_same_category` edges within each calendar day
///
/// Enumeration is quadratic in bucket size. Buckets above
/// `day_bucket_cap` are sampled down to the cap or skipped, so no bucket
/// yields more than `cap * (cap - 1) / 2` edges.
pub fn same_day_edges(
    user_id: i64,
    snapshot: &[Transaction],
    config: &BuilderConfig,
) -> Result<Vec<Relation>> {
    let offset = config.day_offset()?;

    let mut buckets: BTreeMap<NaiveDate, Vec<&Transaction>> = BTreeMap::new();
    for tx in snapshot {
        let day = tx.occurred_at.with_timezone(&offset).date_naive();
        buckets.entry(day).or_default().push(tx);
    }

    let mut edges = Vec::new();
    for (day, bucket) in buckets {
        let bucket = match cap_bucket(bucket, config) {
            Some(bucket) => bucket,
            None => continue,
        };
        let date = day.to_string();

        for (i, a) in bucket.iter().enumerate() {
            for b in &bucket[i + 1..] {
                let same_category = a.category_id.is_some() && a.category_id == b.category_id;
                let (relation_type, strength) = if same_category {
                    (
                        RelationType::SameDaySameCategory,
                        SAME_DAY_SAME_CATEGORY_STRENGTH,
                    )
                } else {
                    (RelationType::SameDay, SAME_DAY_STRENGTH)
                };

                edges.push(
                    Relation::new(
                        user_id,
                        EntityRef::transaction(a.id),
                        EntityRef::transaction(b.id),
                        relation_type,
                        strength,
                    )
                    .with_metadata(json!({ "date": date })),
                );
            }
        }
    }

    Ok(edges)
}

/// Apply the bucket cap; `None` means emit nothing for this bucket
fn cap_bucket<'a>(
    bucket: Vec<&'a Transaction>,
    config: &BuilderConfig,
) -> Option<Vec<&'a Transaction>> {
    let cap = config.day_bucket_cap;
    let size = bucket.len();
    if size <= cap {
        return Some(bucket);
    }

    match config.bucket_overflow {
        BucketOverflow::Sample => {
            warn!(size, cap, "Day bucket over cap, sampling");
            // Evenly spaced, deterministic: indices strictly increase since size > cap
            Some((0..cap).map(|i| bucket[i * size / cap]).collect())
        }
        BucketOverflow::Skip => {
            warn!(size, cap, "Day bucket over cap, skipping same-day edges");
            None
        }
    }
}
