//! Recommendation Engine - turns patterns and insights into suggestions
//!
//! Each rule looks at the same input on its own and contributes at most one
//! recommendation with a fixed priority. Rules never see each other's
//! output, and results come back in registration order.

use crate::config::RecommendationConfig;
use crate::models::RelationType;

use super::types::{
    Insight, InsightType, PatternStat, Priority, Recommendation, RecommendationType,
};

/// Everything a rule may look at
#[derive(Debug, Clone, Copy)]
pub struct RecommendationInput<'a> {
    pub patterns: &'a [PatternStat],
    pub insights: &'a [Insight],
    /// Number of high-confidence `followed_by` relations
    pub sequential_count: usize,
}

impl RecommendationInput<'_> {
    /// Occurrence count for a relation type (0 when filtered out or absent)
    pub fn count(&self, relation_type: RelationType) -> usize {
        self.patterns
            .iter()
            .find(|p| p.relation_type == relation_type)
            .map(|p| p.occurrence_count)
            .unwrap_or(0)
    }

    pub fn has_insight(&self, insight_type: InsightType) -> bool {
        self.insights.iter().any(|i| i.insight_type == insight_type)
    }
}

/// A single, independent recommendation rule
pub trait RecommendationRule: Send + Sync {
    fn id(&self) -> RecommendationType;

    /// Produce a recommendation if the rule applies
    fn evaluate(&self, input: &RecommendationInput<'_>) -> Option<Recommendation>;
}

/// Suggest planning purchases together when transactions cluster in time
pub struct ConsolidatePurchasesRule;

impl RecommendationRule for ConsolidatePurchasesRule {
    fn id(&self) -> RecommendationType {
        RecommendationType::ConsolidatePurchases
    }

    fn evaluate(&self, input: &RecommendationInput<'_>) -> Option<Recommendation> {
        if input.sequential_count == 0 {
            return None;
        }
        Some(Recommendation {
            recommendation_type: self.id(),
            priority: Priority::Medium,
            title: "Plan purchases together".to_string(),
            description: format!(
                "{} purchases came shortly after another one",
                input.sequential_count
            ),
            action: "Batch related purchases into one planned trip or order".to_string(),
        })
    }
}

/// Suggest a shopping list when same-day purchases pile up
pub struct ShoppingListRule {
    pub volume: usize,
}

impl RecommendationRule for ShoppingListRule {
    fn id(&self) -> RecommendationType {
        RecommendationType::ShoppingList
    }

    fn evaluate(&self, input: &RecommendationInput<'_>) -> Option<Recommendation> {
        let same_day = input.count(RelationType::SameDay);
        if same_day <= self.volume {
            return None;
        }
        Some(Recommendation {
            recommendation_type: self.id(),
            priority: Priority::Low,
            title: "Shop with a list".to_string(),
            description: format!("{} pairs of purchases happened on the same day", same_day),
            action: "Write a shopping list before heading out and stick to it".to_string(),
        })
    }
}

/// Suggest a category budget when same-category days repeat
pub struct CategoryBudgetRule;

impl RecommendationRule for CategoryBudgetRule {
    fn id(&self) -> RecommendationType {
        RecommendationType::CategoryBudget
    }

    fn evaluate(&self, input: &RecommendationInput<'_>) -> Option<Recommendation> {
        if !input.has_insight(InsightType::CategoryRoutine) {
            return None;
        }
        Some(Recommendation {
            recommendation_type: self.id(),
            priority: Priority::Low,
            title: "Set a category budget".to_string(),
            description: "You regularly make several purchases in one category on the same day"
                .to_string(),
            action: "Give your busiest categories a weekly budget".to_string(),
        })
    }
}

/// Suggest a cooling-off period when rapid sequences are frequent
pub struct SpendingPauseRule {
    pub min_sequences: usize,
}

impl RecommendationRule for SpendingPauseRule {
    fn id(&self) -> RecommendationType {
        RecommendationType::SpendingPause
    }

    fn evaluate(&self, input: &RecommendationInput<'_>) -> Option<Recommendation> {
        if input.sequential_count < self.min_sequences {
            return None;
        }
        Some(Recommendation {
            recommendation_type: self.id(),
            priority: Priority::High,
            title: "Pause between purchases".to_string(),
            description: format!(
                "{} rapid follow-up purchases suggest impulse spending",
                input.sequential_count
            ),
            action: "Wait 24 hours before any unplanned purchase".to_string(),
        })
    }
}

/// Runs every registered rule over the same input
pub struct RecommendationEngine {
    rules: Vec<Box<dyn RecommendationRule>>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(&RecommendationConfig::default())
    }
}

impl RecommendationEngine {
    /// Create an engine with the built-in rules
    pub fn new(config: &RecommendationConfig) -> Self {
        let mut engine = Self { rules: vec![] };

        engine.register(Box::new(SpendingPauseRule {
            min_sequences: config.impulse_sequence_min,
        }));
        engine.register(Box::new(ConsolidatePurchasesRule));
        engine.register(Box::new(ShoppingListRule {
            volume: config.same_day_volume,
        }));
        engine.register(Box::new(CategoryBudgetRule));

        engine
    }

    pub fn register(&mut self, rule: Box<dyn RecommendationRule>) {
        self.rules.push(rule);
    }

    pub fn recommend(&self, input: &RecommendationInput<'_>) -> Vec<Recommendation> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(input))
            .collect()
    }

    /// Registered rule types, in evaluation order
    pub fn rule_types(&self) -> Vec<RecommendationType> {
        self.rules.iter().map(|r| r.id()).collect()
    }
}
