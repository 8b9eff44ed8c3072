//! Pattern Analyzer - statistics and insights over a stored relation set
//!
//! Read-only. Output depends only on the stored relations and the
//! configured thresholds. A relation store that cannot be read yields an
//! empty analysis, since insights are advisory.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::AnalysisConfig;
use crate::models::{Relation, RelationType};
use crate::store::RelationStore;

use super::types::{Insight, InsightType, PatternAnalysis, PatternStat};

pub struct PatternAnalyzer {
    relations: Arc<dyn RelationStore>,
    config: AnalysisConfig,
}

impl PatternAnalyzer {
    pub fn new(relations: Arc<dyn RelationStore>, config: AnalysisConfig) -> Self {
        Self { relations, config }
    }

    /// Per-type counts and mean strengths, above the occurrence threshold
    pub async fn aggregate_patterns(&self, user_id: i64) -> Vec<PatternStat> {
        let relations = self.load(user_id).await;
        aggregate(&relations, self.config.min_occurrences)
    }

    /// High-confidence `followed_by` relations
    pub async fn sequential_patterns(&self, user_id: i64) -> Vec<Relation> {
        let relations = self.load(user_id).await;
        sequential(&relations, self.config.high_confidence)
    }

    /// Patterns, sequential patterns and insights from a single read
    pub async fn analyze(&self, user_id: i64) -> PatternAnalysis {
        let relations = self.load(user_id).await;
        let patterns = aggregate(&relations, self.config.min_occurrences);
        let sequential_patterns = sequential(&relations, self.config.high_confidence);
        let insights = self.derive_insights(&patterns);

        debug!(
            user_id,
            relations = relations.len(),
            patterns = patterns.len(),
            insights = insights.len(),
            "Pattern analysis complete"
        );

        PatternAnalysis {
            patterns,
            sequential_patterns,
            insights,
        }
    }

    /// Rule-based insights from aggregated patterns
    pub fn derive_insights(&self, patterns: &[PatternStat]) -> Vec<Insight> {
        let c = &self.config;
        let rules = [
            (
                RelationType::FollowedBy,
                c.sequential_burst_min,
                InsightType::SequentialBurst,
            ),
            (
                RelationType::SameDay,
                c.same_day_min,
                InsightType::MultipleSameDayPurchases,
            ),
            (
                RelationType::SameDaySameCategory,
                c.category_routine_min,
                InsightType::CategoryRoutine,
            ),
        ];

        rules
            .iter()
            .filter_map(|(relation_type, min, insight_type)| {
                let stat = patterns
                    .iter()
                    .find(|p| p.relation_type == *relation_type)?;
                (stat.occurrence_count >= *min).then(|| describe(*insight_type, stat))
            })
            .collect()
    }

    async fn load(&self, user_id: i64) -> Vec<Relation> {
        match self.relations.relations_for_user(user_id).await {
            Ok(records) => records.into_iter().map(Relation::from).collect(),
            Err(e) => {
                warn!(user_id, error = %e, "Could not read relations, returning empty analysis");
                Vec::new()
            }
        }
    }
}

/// Group by relation type, dropping types seen fewer than `min_occurrences` times
pub fn aggregate(relations: &[Relation], min_occurrences: usize) -> Vec<PatternStat> {
    let mut groups: BTreeMap<RelationType, (usize, f64)> = BTreeMap::new();
    for r in relations {
        let entry = groups.entry(r.relation_type).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += r.strength;
    }

    groups
        .into_iter()
        .filter(|(_, (count, _))| *count >= min_occurrences)
        .map(|(relation_type, (count, total))| PatternStat {
            relation_type,
            occurrence_count: count,
            average_strength: total / count as f64,
        })
        .collect()
}

/// `followed_by` relations at or above `threshold`
pub fn sequential(relations: &[Relation], threshold: f64) -> Vec<Relation> {
    relations
        .iter()
        .filter(|r| r.relation_type == RelationType::FollowedBy && r.strength >= threshold)
        .cloned()
        .collect()
}

fn describe(insight_type: InsightType, stat: &PatternStat) -> Insight {
    let n = stat.occurrence_count;
    let (title, description) = match insight_type {
        InsightType::SequentialBurst => (
            "Sequential spending bursts",
            format!("{} transactions were followed closely by another transaction", n),
        ),
        InsightType::MultipleSameDayPurchases => (
            "Multiple same-day purchases",
            format!("{} pairs of purchases landed on the same day", n),
        ),
        InsightType::CategoryRoutine => (
            "Category routines",
            format!("{} pairs of same-day purchases shared a category", n),
        ),
    };

    Insight {
        insight_type,
        title: title.to_string(),
        description,
        strength: stat.average_strength,
    }
}
