//! Domain models for Tally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of node a relation endpoint points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Transaction,
    Category,
    Account,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Transaction => "transaction",
            Self::Category => "category",
            Self::Account => "account",
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transaction" => Ok(Self::Transaction),
            "category" => Ok(Self::Category),
            "account" => Ok(Self::Account),
            _ => Err(format!("Unknown entity type: {}", s)),
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A `(type, id)` pair identifying a transaction, category or account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: EntityType,
    pub id: i64,
}

impl EntityRef {
    pub fn transaction(id: i64) -> Self {
        Self {
            entity_type: EntityType::Transaction,
            id,
        }
    }

    pub fn category(id: i64) -> Self {
        Self {
            entity_type: EntityType::Category,
            id,
        }
    }

    pub fn account(id: i64) -> Self {
        Self {
            entity_type: EntityType::Account,
            id,
        }
    }
}

impl std::fmt::Display for EntityRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_type, self.id)
    }
}

/// Edge type in the transaction graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// Transaction → its category
    BelongsTo,
    /// Transaction → the account it was paid from/into
    FromAccount,
    /// Transaction → the next transaction, when close in time
    FollowedBy,
    /// Two transactions on the same calendar day
    SameDay,
    /// Two transactions on the same calendar day in the same category
    SameDaySameCategory,
}

impl RelationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BelongsTo => "belongs_to",
            Self::FromAccount => "from_account",
            Self::FollowedBy => "followed_by",
            Self::SameDay => "same_day",
            Self::SameDaySameCategory => "same_day_same_category",
        }
    }

    pub fn all() -> &'static [RelationType] {
        &[
            Self::BelongsTo,
            Self::FromAccount,
            Self::FollowedBy,
            Self::SameDay,
            Self::SameDaySameCategory,
        ]
    }
}

impl std::str::FromStr for RelationType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "belongs_to" => Ok(Self::BelongsTo),
            "from_account" => Ok(Self::FromAccount),
            "followed_by" => Ok(Self::FollowedBy),
            "same_day" => Ok(Self::SameDay),
            "same_day_same_category" => Ok(Self::SameDaySameCategory),
            _ => Err(format!("Unknown relation type: {}", s)),
        }
    }
}

impl std::fmt::Display for RelationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed, typed, weighted edge owned by one user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub owner_user_id: i64,
    pub from: EntityRef,
    pub to: EntityRef,
    pub relation_type: RelationType,
    /// Always within [0, 1]
    pub strength: f64,
    /// Diagnostics only (elapsed time, calendar day); never read by analysis
    pub metadata: Option<serde_json::Value>,
}

impl Relation {
    /// Create a relation, clamping strength into [0, 1]
    pub fn new(
        owner_user_id: i64,
        from: EntityRef,
        to: EntityRef,
        relation_type: RelationType,
        strength: f64,
    ) -> Self {
        Self {
            owner_user_id,
            from,
            to,
            relation_type,
            strength: strength.clamp(0.0, 1.0),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Flat row shape exchanged with a relation store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRecord {
    pub owner_user_id: i64,
    pub entity_type: EntityType,
    pub entity_id: i64,
    pub related_type: EntityType,
    pub related_id: i64,
    pub relation_type: RelationType,
    pub strength: f64,
    pub metadata: Option<serde_json::Value>,
}

impl From<&Relation> for RelationRecord {
    fn from(r: &Relation) -> Self {
        Self {
            owner_user_id: r.owner_user_id,
            entity_type: r.from.entity_type,
            entity_id: r.from.id,
            related_type: r.to.entity_type,
            related_id: r.to.id,
            relation_type: r.relation_type,
            strength: r.strength,
            metadata: r.metadata.clone(),
        }
    }
}

impl From<RelationRecord> for Relation {
    fn from(r: RelationRecord) -> Self {
        Self {
            owner_user_id: r.owner_user_id,
            from: EntityRef {
                entity_type: r.entity_type,
                id: r.entity_id,
            },
            to: EntityRef {
                entity_type: r.related_type,
                id: r.related_id,
            },
            relation_type: r.relation_type,
            strength: r.strength,
            metadata: r.metadata,
        }
    }
}

/// Money flow direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money out
    Debit,
    /// Money in
    Credit,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debit" | "expense" | "out" => Ok(Self::Debit),
            "credit" | "income" | "in" => Ok(Self::Credit),
            _ => Err(format!("Unknown direction: {}", s)),
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A transaction row as handed out by a transaction store (not yet validated)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: i64,
    pub occurred_at: Option<DateTime<Utc>>,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    /// Signed amount, negative = expense
    pub amount: f64,
    pub direction: String,
}

/// A validated transaction, ready for graph construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub occurred_at: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    pub amount: f64,
    pub direction: Direction,
}

impl TryFrom<TransactionRecord> for Transaction {
    type Error = Error;

    fn try_from(record: TransactionRecord) -> Result<Self> {
        let occurred_at = record.occurred_at.ok_or_else(|| {
            Error::InvalidData(format!("transaction {} has no timestamp", record.id))
        })?;
        let direction = record
            .direction
            .parse::<Direction>()
            .map_err(|e| Error::InvalidData(format!("transaction {}: {}", record.id, e)))?;
        if !record.amount.is_finite() {
            return Err(Error::InvalidData(format!(
                "transaction {} has a non-finite amount",
                record.id
            )));
        }

        Ok(Self {
            id: record.id,
            occurred_at,
            category_id: record.category_id,
            account_id: record.account_id,
            amount: record.amount,
            direction,
        })
    }
}

/// A transaction to be written to the bundled SQLite store
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub occurred_at: DateTime<Utc>,
    pub category_id: Option<i64>,
    pub account_id: Option<i64>,
    pub amount: f64,
    pub direction: Direction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i64) -> TransactionRecord {
        TransactionRecord {
            id,
            occurred_at: Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap()),
            category_id: Some(4),
            account_id: None,
            amount: -12.5,
            direction: "debit".to_string(),
        }
    }

    #[test]
    fn test_relation_type_round_trip_names() {
        for rt in RelationType::all() {
            assert_eq!(rt.as_str().parse::<RelationType>().unwrap(), *rt);
        }
        assert!("related_to".parse::<RelationType>().is_err());
    }

    #[test]
    fn test_relation_strength_is_clamped() {
        let from = EntityRef::transaction(1);
        let to = EntityRef::transaction(2);
        assert_eq!(
            Relation::new(1, from, to, RelationType::SameDay, 1.7).strength,
            1.0
        );
        assert_eq!(
            Relation::new(1, from, to, RelationType::SameDay, -0.2).strength,
            0.0
        );
    }

    #[test]
    fn test_relation_record_conversion() {
        let rel = Relation::new(
            7,
            EntityRef::transaction(10),
            EntityRef::category(3),
            RelationType::BelongsTo,
            1.0,
        );
        let record = RelationRecord::from(&rel);
        assert_eq!(record.entity_type, EntityType::Transaction);
        assert_eq!(record.related_type, EntityType::Category);
        assert_eq!(record.related_id, 3);
        assert_eq!(Relation::from(record), rel);
    }

    #[test]
    fn test_transaction_validation() {
        let tx = Transaction::try_from(record(1)).unwrap();
        assert_eq!(tx.direction, Direction::Debit);

        let mut missing_time = record(2);
        missing_time.occurred_at = None;
        assert!(matches!(
            Transaction::try_from(missing_time),
            Err(Error::InvalidData(_))
        ));

        let mut bad_direction = record(3);
        bad_direction.direction = "sideways".to_string();
        assert!(Transaction::try_from(bad_direction).is_err());
    }
}
