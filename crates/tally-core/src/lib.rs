//! Tally Core Library
//!
//! Transaction relationship graph for the Tally personal finance tool:
//! - Database access and migrations (encrypted SQLite)
//! - Store traits decoupling the graph from persistence
//! - Graph builder deriving typed, weighted transaction relations
//! - Pattern analyzer and rule-based recommendation engine
//! - File-based configuration and a background rebuild scheduler

pub mod config;
pub mod db;
pub mod error;
pub mod graph;
pub mod models;
pub mod scheduler;
pub mod store;

/// Test utilities including an in-memory store with failure injection
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::{
    AnalysisConfig, BucketOverflow, BuilderConfig, GraphConfig, RecommendationConfig,
};
pub use db::Database;
pub use error::{Error, Result};
pub use graph::{
    GraphBuilder, GraphService, Insight, InsightType, PatternAnalysis, PatternAnalyzer,
    PatternStat, Priority, RebuildSummary, Recommendation, RecommendationEngine,
    RecommendationReport, RecommendationType,
};
pub use models::{
    Direction, EntityRef, EntityType, NewTransaction, Relation, RelationRecord, RelationType,
    Transaction, TransactionRecord,
};
pub use scheduler::{start_graph_scheduler, GraphScheduleConfig};
pub use store::{RelationStore, TransactionStore};
