//! Result types for pattern analysis and recommendations
//!
//! None of these are persisted; they are pure values of a query over the
//! stored relation set.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::{Relation, RelationType};

/// Aggregate over all relations of one type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternStat {
    pub relation_type: RelationType,
    pub occurrence_count: usize,
    pub average_strength: f64,
}

/// Kinds of insight the analyzer can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightType {
    /// Many transactions closely following each other
    SequentialBurst,
    /// Many purchases landing on the same day
    MultipleSameDayPurchases,
    /// Repeated same-day purchases within one category
    CategoryRoutine,
}

impl InsightType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightType::SequentialBurst => "sequential_burst",
            InsightType::MultipleSameDayPurchases => "multiple_same_day_purchases",
            InsightType::CategoryRoutine => "category_routine",
        }
    }
}

impl fmt::Display for InsightType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InsightType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sequential_burst" => Ok(InsightType::SequentialBurst),
            "multiple_same_day_purchases" => Ok(InsightType::MultipleSameDayPurchases),
            "category_routine" => Ok(InsightType::CategoryRoutine),
            _ => Err(format!("Unknown insight type: {}", s)),
        }
    }
}

/// A derived observation about a pattern
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub insight_type: InsightType,
    pub title: String,
    pub description: String,
    /// Average strength of the underlying relations
    pub strength: f64,
}

/// Recommendation priority (fixed per rule, never computed across rules)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kinds of recommendation, one per rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationType {
    ConsolidatePurchases,
    ShoppingList,
    CategoryBudget,
    SpendingPause,
}

impl RecommendationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationType::ConsolidatePurchases => "consolidate_purchases",
            RecommendationType::ShoppingList => "shopping_list",
            RecommendationType::CategoryBudget => "category_budget",
            RecommendationType::SpendingPause => "spending_pause",
        }
    }
}

impl fmt::Display for RecommendationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A prioritized, actionable suggestion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub recommendation_type: RecommendationType,
    pub priority: Priority,
    pub title: String,
    pub description: String,
    pub action: String,
}

/// Output of `analyze_patterns`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternAnalysis {
    pub patterns: Vec<PatternStat>,
    pub sequential_patterns: Vec<Relation>,
    pub insights: Vec<Insight>,
}

/// Output of `get_recommendations`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationReport {
    pub recommendations: Vec<Recommendation>,
    pub insights: Vec<Insight>,
    pub patterns: Vec<PatternStat>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insight_type_names() {
        assert_eq!(InsightType::SequentialBurst.as_str(), "sequential_burst");
        assert_eq!(
            InsightType::from_str("category_routine").unwrap(),
            InsightType::CategoryRoutine
        );
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(Priority::High.to_string(), "high");
        assert_eq!(Priority::Low.as_str(), "low");
    }

    #[test]
    fn test_recommendation_serializes_type_field() {
        let rec = Recommendation {
            recommendation_type: RecommendationType::ShoppingList,
            priority: Priority::Low,
            title: "t".to_string(),
            description: "d".to_string(),
            action: "a".to_string(),
        };
        let value = serde_json::to_value(&rec).unwrap();
        assert_eq!(value["type"], "shopping_list");
        assert_eq!(value["priority"], "low");
    }
}
