//! Integration tests for the event repository.
//!
//! Exercises idempotent upsert and the analytics read queries against a
//! real database:
//! - Insert / duplicate-collapse behaviour
//! - Stats aggregation (counts, distinct users, top event names)
//! - Recent-event listing and JSONB property round-trip

use chrono::{Duration, Utc};
use serde_json::json;
use sqlx::PgPool;

use smolhog_db::repositories::EventRepo;
use smolhog_events::AnalyticsEvent;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn event(event_id: &str, event_name: &str, user_id: &str) -> AnalyticsEvent {
    AnalyticsEvent::new(event_id, event_name, user_id, Utc::now())
}

// ---------------------------------------------------------------------------
// Idempotent upsert
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn upsert_inserts_a_new_event(pool: PgPool) {
    let inserted = EventRepo::upsert(&pool, &event("evt-1", "page_view", "user-1"))
        .await
        .unwrap();

    assert!(inserted);
    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upsert_with_duplicate_event_id_is_a_noop(pool: PgPool) {
    let e = event("evt-1", "page_view", "user-1");

    let first = EventRepo::upsert(&pool, &e).await.unwrap();
    let second = EventRepo::upsert(&pool, &e).await.unwrap();

    assert!(first);
    assert!(!second, "second upsert must be a no-op, not an error");
    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicates_collapse_across_separate_batches(pool: PgPool) {
    // Batch one: two events, one of which ("evt-b") reappears in batch two.
    for e in [
        event("evt-a", "page_view", "user-1"),
        event("evt-b", "click", "user-2"),
    ] {
        EventRepo::upsert(&pool, &e).await.unwrap();
    }

    for e in [
        event("evt-b", "click", "user-2"),
        event("evt-c", "signup", "user-3"),
    ] {
        EventRepo::upsert(&pool, &e).await.unwrap();
    }

    // Exactly the 3 distinct event ids survive.
    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn upsert_preserves_nested_properties(pool: PgPool) {
    let e = event("evt-props", "purchase", "user-9")
        .with_session("sess-1")
        .with_property("cart", json!({"items": [{"sku": "A1", "qty": 2}], "total": 19.99}));

    EventRepo::upsert(&pool, &e).await.unwrap();

    let rows = EventRepo::list_recent(&pool, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].event_id, "evt-props");
    assert_eq!(rows[0].session_id.as_deref(), Some("sess-1"));
    assert_eq!(
        rows[0].properties,
        json!({"cart": {"items": [{"sku": "A1", "qty": 2}], "total": 19.99}})
    );
}

// ---------------------------------------------------------------------------
// Analytics reads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn stats_queries_aggregate_150_rows_across_4_names(pool: PgPool) {
    // 150 events over 4 event names with deliberately skewed frequencies.
    let names = [
        ("page_view", 80),
        ("click", 40),
        ("signup", 20),
        ("purchase", 10),
    ];

    let mut n = 0;
    for (name, count) in names {
        for i in 0..count {
            let e = event(&format!("evt-{name}-{i}"), name, &format!("user-{}", n % 25));
            EventRepo::upsert(&pool, &e).await.unwrap();
            n += 1;
        }
    }

    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 150);
    assert_eq!(EventRepo::count_unique_users(&pool).await.unwrap(), 25);

    let top = EventRepo::top_event_names(&pool, 10).await.unwrap();
    assert!(top.len() <= 10);
    assert_eq!(top.len(), 4);
    assert_eq!(top[0].event_name, "page_view");
    assert_eq!(top[0].count, 80);

    // Sorted descending by count.
    for pair in top.windows(2) {
        assert!(pair[0].count >= pair[1].count);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_recent_orders_newest_first_and_honours_limit(pool: PgPool) {
    let base = Utc::now();
    for i in 0..5 {
        let mut e = event(&format!("evt-{i}"), "page_view", "user-1");
        e.timestamp = base + Duration::seconds(i);
        EventRepo::upsert(&pool, &e).await.unwrap();
    }

    let rows = EventRepo::list_recent(&pool, 3).await.unwrap();

    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0].event_id, "evt-4");
    assert_eq!(rows[1].event_id, "evt-3");
    assert_eq!(rows[2].event_id, "evt-2");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn reads_are_empty_on_a_fresh_store(pool: PgPool) {
    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 0);
    assert_eq!(EventRepo::count_unique_users(&pool).await.unwrap(), 0);
    assert!(EventRepo::top_event_names(&pool, 10).await.unwrap().is_empty());
    assert!(EventRepo::list_recent(&pool, 100).await.unwrap().is_empty());
}
