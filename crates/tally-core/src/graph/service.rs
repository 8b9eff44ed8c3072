//! Graph Service - the public operations of the graph subsystem
//!
//! Holds the injected stores and configuration for one request or job
//! runner. Rebuilds for the same user are serialized (delete-then-insert
//! is not safe under concurrent writers for one owner); rebuilds for
//! different users and all analysis calls run freely in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::config::GraphConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::store::{RelationStore, TransactionStore};

use super::analyzer::PatternAnalyzer;
use super::builder::{lookback_start, GraphBuilder, RebuildSummary};
use super::recommend::{RecommendationEngine, RecommendationInput};
use super::types::{PatternAnalysis, RecommendationReport};

type UserLocks = Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>;

pub struct GraphService {
    transactions: Arc<dyn TransactionStore>,
    relations: Arc<dyn RelationStore>,
    config: GraphConfig,
    user_locks: UserLocks,
}

/// A caller's claim on one user's rebuild lock
///
/// The map entry is removed when the last claim is dropped.
struct UserLockEntry<'a> {
    locks: &'a UserLocks,
    user_id: i64,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for UserLockEntry<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one here
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.user_id);
        }
    }
}

impl GraphService {
    pub fn new(
        transactions: Arc<dyn TransactionStore>,
        relations: Arc<dyn RelationStore>,
        config: GraphConfig,
    ) -> Self {
        Self {
            transactions,
            relations,
            config,
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Service backed by one SQLite database for both stores
    pub fn with_database(db: Database, config: GraphConfig) -> Self {
        let db = Arc::new(db);
        Self::new(db.clone(), db, config)
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn builder(&self) -> GraphBuilder {
        GraphBuilder::new(
            self.transactions.clone(),
            self.relations.clone(),
            self.config.builder.clone(),
        )
    }

    pub fn analyzer(&self) -> PatternAnalyzer {
        PatternAnalyzer::new(self.relations.clone(), self.config.analysis.clone())
    }

    pub fn recommendation_engine(&self) -> RecommendationEngine {
        RecommendationEngine::new(&self.config.recommendations)
    }

    fn user_lock(&self, user_id: i64) -> UserLockEntry<'_> {
        let mut locks = self.user_locks.lock().unwrap_or_else(|e| e.into_inner());
        let lock = locks.entry(user_id).or_default().clone();
        UserLockEntry {
            locks: &self.user_locks,
            user_id,
            lock,
        }
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.user_locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Replace the user's relation graph, returning the relation count written
    pub async fn rebuild_graph(&self, user_id: i64) -> Result<usize> {
        Ok(self.rebuild_graph_detailed(user_id).await?.written)
    }

    /// Like [`Self::rebuild_graph`], with the full run summary
    pub async fn rebuild_graph_detailed(&self, user_id: i64) -> Result<RebuildSummary> {
        let entry = self.user_lock(user_id);
        let _guard = entry.lock.lock().await;

        let since = lookback_start(chrono::Utc::now(), self.config.builder.lookback_months);
        self.builder().rebuild_detailed(user_id, since).await
    }

    /// Rebuild under a deadline
    ///
    /// A timed-out run may leave a partial graph behind; rerunning it
    /// replaces the graph in full.
    pub async fn rebuild_graph_with_deadline(
        &self,
        user_id: i64,
        deadline: Duration,
    ) -> Result<usize> {
        match tokio::time::timeout(deadline, self.rebuild_graph(user_id)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(user_id, ?deadline, "Relation graph rebuild timed out");
                Err(Error::Timeout(deadline))
            }
        }
    }

    /// Rebuild every user that has transactions, in parallel
    ///
    /// Returns one result per user, ordered by user id.
    pub async fn rebuild_all(
        self: &Arc<Self>,
        deadline: Option<Duration>,
    ) -> Result<Vec<(i64, Result<usize>)>> {
        let user_ids = self
            .transactions
            .user_ids()
            .await
            .map_err(|e| Error::Fetch(e.to_string()))?;

        let mut set = JoinSet::new();
        for user_id in user_ids {
            let service = Arc::clone(self);
            set.spawn(async move {
                let result = match deadline {
                    Some(d) => service.rebuild_graph_with_deadline(user_id, d).await,
                    None => service.rebuild_graph(user_id).await,
                };
                (user_id, result)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(entry) => results.push(entry),
                Err(e) => warn!(error = %e, "Rebuild task failed to complete"),
            }
        }
        results.sort_by_key(|(user_id, _)| *user_id);

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(users = results.len(), failed, "Rebuilt relation graphs");
        Ok(results)
    }

    /// Pattern statistics, sequential patterns and insights
    pub async fn analyze_patterns(&self, user_id: i64) -> PatternAnalysis {
        self.analyzer().analyze(user_id).await
    }

    /// Recommendations together with the insights and patterns behind them
    pub async fn get_recommendations(&self, user_id: i64) -> RecommendationReport {
        let analysis = self.analyze_patterns(user_id).await;
        let input = RecommendationInput {
            patterns: &analysis.patterns,
            insights: &analysis.insights,
            sequential_count: analysis.sequential_patterns.len(),
        };
        let recommendations = self.recommendation_engine().recommend(&input);

        RecommendationReport {
            recommendations,
            insights: analysis.insights,
            patterns: analysis.patterns,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RelationRecord;
    use crate::test_utils::{tx_record, MemoryStore, StoreCall};
    use chrono::{Duration as ChronoDuration, Utc};

    fn recent(hours_ago: i64) -> String {
        (Utc::now() - ChronoDuration::hours(hours_ago))
            .format("%Y-%m-%d %H:%M")
            .to_string()
    }

    fn service(store: &Arc<MemoryStore>) -> Arc<GraphService> {
        Arc::new(GraphService::new(
            store.clone(),
            store.clone(),
            GraphConfig::default(),
        ))
    }

    fn seed(store: &MemoryStore, user_id: i64, base_id: i64) {
        store.add_transaction(user_id, tx_record(base_id, &recent(3), Some(1), Some(9)));
        store.add_transaction(user_id, tx_record(base_id + 1, &recent(2), Some(1), None));
        store.add_transaction(user_id, tx_record(base_id + 2, &recent(1), Some(2), None));
    }

    #[tokio::test]
    async fn test_rebuild_then_analyze() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, 1, 1);
        let svc = service(&store);

        let count = svc.rebuild_graph(1).await.unwrap();
        assert!(count >= 6);

        let analysis = svc.analyze_patterns(1).await;
        // 1h gaps in a 24h window: both followed_by edges are high confidence
        assert_eq!(analysis.sequential_patterns.len(), 2);

        let report = svc.get_recommendations(1).await;
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.recommendation_type == crate::graph::RecommendationType::ConsolidatePurchases));
        assert_eq!(report.patterns, analysis.patterns);
        assert_eq!(report.insights, analysis.insights);
    }

    #[tokio::test]
    async fn test_same_user_rebuilds_are_serialized() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, 1, 1);
        store.set_insert_delay(std::time::Duration::from_millis(20));
        let svc = service(&store);
        let config = GraphConfig::default();

        let single = {
            let (snapshot, _) = crate::graph::prepare_snapshot(
                store_snapshot(&store, 1).await,
            );
            crate::graph::build_relations(1, &snapshot, &config.builder)
                .unwrap()
                .len()
        };

        let (a, b) = tokio::join!(svc.rebuild_graph(1), svc.rebuild_graph(1));
        assert_eq!(a.unwrap(), single);
        assert_eq!(b.unwrap(), single);
        assert_eq!(store.relations(1).len(), single);

        // Each run's fetch/delete/insert sequence completes before the next starts
        let calls = store.calls();
        let deletes: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| matches!(c, StoreCall::DeleteAll(_)))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(deletes.len(), 2);
        assert!(calls[deletes[0]..deletes[1]]
            .iter()
            .any(|c| matches!(c, StoreCall::InsertBatch(_))));
        assert_eq!(svc.tracked_locks(), 0);
    }

    async fn store_snapshot(store: &MemoryStore, user_id: i64) -> Vec<crate::models::TransactionRecord> {
        store
            .transactions_for_user(user_id, chrono::DateTime::<Utc>::MIN_UTC)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rebuild_deadline() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, 1, 1);
        store.set_insert_delay(std::time::Duration::from_millis(200));
        let svc = service(&store);

        let err = svc
            .rebuild_graph_with_deadline(1, Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(svc.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_rebuild_deadline_over_sqlite() {
        let db = Database::in_memory().unwrap();
        let day_start = Utc::now() - ChronoDuration::hours(30);
        for i in 0..200 {
            db.insert_transaction(
                1,
                &crate::models::NewTransaction {
                    occurred_at: day_start + ChronoDuration::minutes(i * 5),
                    category_id: Some(i % 4),
                    account_id: Some(i % 3),
                    amount: -10.0,
                    direction: crate::models::Direction::Debit,
                },
            )
            .unwrap();
        }
        let svc = GraphService::with_database(db.clone(), GraphConfig::default());

        let err = svc
            .rebuild_graph_with_deadline(1, Duration::from_millis(1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));

        // A write left running by the abandoned rebuild lands before this one deletes
        let written = svc.rebuild_graph(1).await.unwrap();
        assert!(written > 0);
        assert_eq!(db.count_relations(1, None).unwrap(), written as i64);
        assert_eq!(svc.tracked_locks(), 0);
    }

    #[tokio::test]
    async fn test_rebuild_all_users() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, 1, 1);
        seed(&store, 2, 100);
        let svc = service(&store);

        let results = svc.rebuild_all(None).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 1);
        assert_eq!(results[1].0, 2);
        assert!(results.iter().all(|(_, r)| r.is_ok()));
        assert_eq!(svc.tracked_locks(), 0);
        assert_eq!(store.relations(1).len(), store.relations(2).len());
        assert!(store
            .relations(2)
            .iter()
            .all(|r: &RelationRecord| r.owner_user_id == 2));
    }

    #[tokio::test]
    async fn test_analysis_without_graph_is_empty() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(&store);

        let report = svc.get_recommendations(42).await;
        assert_eq!(report, RecommendationReport::default());
    }
}
