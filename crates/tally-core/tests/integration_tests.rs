//! Integration tests for tally-core
//!
//! These tests exercise the full rebuild → analyze → recommend workflow
//! against the bundled SQLite store.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use tally_core::{
    Database, Direction, GraphConfig, GraphService, InsightType, NewTransaction,
    RecommendationType, RelationType,
};

fn at(ts: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M")
        .expect("valid test timestamp")
        .and_utc()
}

fn spend(occurred_at: DateTime<Utc>, category_id: i64) -> NewTransaction {
    NewTransaction {
        occurred_at,
        category_id: Some(category_id),
        account_id: None,
        amount: -20.0,
        direction: Direction::Debit,
    }
}

fn service(db: &Database) -> GraphService {
    GraphService::with_database(db.clone(), GraphConfig::default())
}

// =============================================================================
// Builder Integration Tests
// =============================================================================

#[tokio::test]
async fn test_mixed_day_produces_expected_edges() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let t1 = db.insert_transaction(1, &spend(at("2024-05-01 09:00"), 1)).unwrap();
    let t2 = db.insert_transaction(1, &spend(at("2024-05-01 09:30"), 1)).unwrap();
    let t3 = db.insert_transaction(1, &spend(at("2024-05-01 20:00"), 2)).unwrap();

    let svc = service(&db);
    let written = svc
        .builder()
        .rebuild_since(1, at("2024-01-01 00:00"))
        .await
        .expect("rebuild should succeed");

    // 3 belongs_to + 2 followed_by + 1 same_day_same_category + 2 same_day
    assert_eq!(written, 8);

    let stored = db.list_relations_for_user(1).unwrap();
    let find = |kind: RelationType, from: i64, to: i64| {
        stored
            .iter()
            .find(|r| r.relation_type == kind && r.entity_id == from && r.related_id == to)
            .map(|r| r.strength)
    };

    let s12 = find(RelationType::FollowedBy, t1, t2).expect("t1 -> t2");
    assert!((s12 - (1.0 - 0.5 / 24.0)).abs() < 1e-9);
    let s23 = find(RelationType::FollowedBy, t2, t3).expect("t2 -> t3");
    assert!((s23 - (1.0 - 10.5 / 24.0)).abs() < 1e-9);
    assert_eq!(find(RelationType::SameDaySameCategory, t1, t2), Some(0.8));
    assert_eq!(find(RelationType::SameDay, t1, t3), Some(0.5));
    assert_eq!(find(RelationType::SameDay, t2, t3), Some(0.5));
    assert_eq!(
        db.count_relations(1, Some(RelationType::BelongsTo)).unwrap(),
        3
    );
}

#[tokio::test]
async fn test_rebuild_is_idempotent_on_sqlite() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    for hour in 8..14 {
        let ts = at(&format!("2024-05-01 {:02}:15", hour));
        db.insert_transaction(1, &spend(ts, hour % 2)).unwrap();
    }

    let svc = service(&db);
    let since = at("2024-01-01 00:00");
    let first = svc.builder().rebuild_since(1, since).await.unwrap();
    let snapshot = db.list_relations_for_user(1).unwrap();
    let second = svc.builder().rebuild_since(1, since).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(db.list_relations_for_user(1).unwrap(), snapshot);
    assert_eq!(db.count_relations(1, None).unwrap() as usize, first);
}

#[tokio::test]
async fn test_rebuild_does_not_touch_other_users() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    db.insert_transaction(1, &spend(at("2024-05-01 09:00"), 1)).unwrap();
    db.insert_transaction(2, &spend(at("2024-05-01 09:00"), 1)).unwrap();
    db.insert_transaction(2, &spend(at("2024-05-01 10:00"), 1)).unwrap();

    let svc = service(&db);
    let since = at("2024-01-01 00:00");
    svc.builder().rebuild_since(2, since).await.unwrap();
    let user2 = db.count_relations(2, None).unwrap();

    svc.builder().rebuild_since(1, since).await.unwrap();

    assert_eq!(db.count_relations(2, None).unwrap(), user2);
    assert_eq!(db.count_relations(1, None).unwrap(), 1);
}

// =============================================================================
// Full Workflow
// =============================================================================

#[tokio::test]
async fn test_full_rebuild_analyze_recommend_workflow() {
    let db = Database::in_memory().expect("Failed to create in-memory database");

    // Four recent days, each with three purchases an hour apart in one category
    let start = Utc::now() - Duration::days(10);
    for day in 0..4 {
        for hour in 0..3 {
            let ts = start + Duration::days(day * 2) + Duration::hours(hour);
            db.insert_transaction(1, &spend(ts, 5)).unwrap();
        }
    }

    let svc = Arc::new(service(&db));
    let results = svc.rebuild_all(None).await.unwrap();
    assert_eq!(results.len(), 1);
    let written = results[0].1.as_ref().copied().expect("rebuild succeeded");
    assert!(written > 0);

    let analysis = svc.analyze_patterns(1).await;
    let followed = analysis
        .patterns
        .iter()
        .find(|p| p.relation_type == RelationType::FollowedBy)
        .expect("followed_by pattern");
    // Two 1h gaps per day plus a gap of at least 46h between days
    assert_eq!(followed.occurrence_count, 8);
    assert_eq!(analysis.sequential_patterns.len(), 8);

    let insight_types: Vec<InsightType> =
        analysis.insights.iter().map(|i| i.insight_type).collect();
    assert!(insight_types.contains(&InsightType::SequentialBurst));
    assert!(insight_types.contains(&InsightType::CategoryRoutine));

    let report = svc.get_recommendations(1).await;
    let rec_types: Vec<RecommendationType> = report
        .recommendations
        .iter()
        .map(|r| r.recommendation_type)
        .collect();
    assert!(rec_types.contains(&RecommendationType::ConsolidatePurchases));
    assert!(rec_types.contains(&RecommendationType::CategoryBudget));
    assert!(!rec_types.contains(&RecommendationType::SpendingPause));

    let json = serde_json::to_value(&report).unwrap();
    assert!(json["recommendations"].is_array());
}

#[tokio::test]
async fn test_user_without_transactions() {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let svc = service(&db);

    assert_eq!(svc.rebuild_graph(99).await.unwrap(), 0);
    let report = svc.get_recommendations(99).await;
    assert!(report.recommendations.is_empty());
    assert!(report.patterns.is_empty());
}
