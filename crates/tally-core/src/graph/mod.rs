//! Transaction relationship graph
//!
//! Three stages over one user's transactions:
//!
//! - **Builder** - derives typed, weighted relations (structural, temporal
//!   adjacency, same-day co-occurrence) and replaces the stored graph
//! - **Analyzer** - aggregates the stored relations into pattern statistics
//!   and rule-based insights
//! - **Recommendation engine** - turns patterns and insights into
//!   prioritized suggestions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_core::{Database, GraphConfig, GraphService};
//!
//! let service = GraphService::with_database(db, GraphConfig::load(None)?);
//! service.rebuild_graph(user_id).await?;
//! let report = service.get_recommendations(user_id).await;
//! ```

pub mod analyzer;
pub mod builder;
pub mod recommend;
pub mod service;
pub mod types;

pub use analyzer::PatternAnalyzer;
pub use builder::{
    adjacency_strength, build_relations, lookback_start, prepare_snapshot, GraphBuilder,
    RebuildSummary,
};
pub use recommend::{RecommendationEngine, RecommendationInput, RecommendationRule};
pub use service::GraphService;
pub use types::{
    Insight, InsightType, PatternAnalysis, PatternStat, Priority, Recommendation,
    RecommendationReport, RecommendationType,
};
