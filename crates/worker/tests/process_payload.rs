//! Integration tests for the worker's decode + persist path.
//!
//! These run the exact function the consume session applies to every
//! delivery, against a real database. Redelivery safety is asserted by
//! feeding the same bytes through twice.

use assert_matches::assert_matches;
use chrono::Utc;
use serde_json::json;
use sqlx::PgPool;

use smolhog_db::repositories::EventRepo;
use smolhog_events::AnalyticsEvent;
use smolhog_worker::consumer::{process_payload, ProcessError};

fn payload(event_id: &str) -> Vec<u8> {
    AnalyticsEvent::new(event_id, "page_view", "user-1", Utc::now())
        .with_property("path", json!("/docs"))
        .to_bytes()
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn valid_payload_is_persisted(pool: PgPool) {
    let inserted = process_payload(&pool, &payload("evt-1")).await.unwrap();

    assert!(inserted);
    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn redelivered_payload_converges_to_one_row(pool: PgPool) {
    let bytes = payload("evt-1");

    // First delivery persists; the redelivery of the same bytes is a
    // clean no-op, not an error and not a second row.
    assert!(process_payload(&pool, &bytes).await.unwrap());
    assert!(!process_payload(&pool, &bytes).await.unwrap());

    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn malformed_payload_fails_without_writing(pool: PgPool) {
    let result = process_payload(&pool, b"this is not an event").await;

    assert_matches!(result, Err(ProcessError::Malformed(_)));
    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn payload_with_bad_timestamp_fails_without_writing(pool: PgPool) {
    let bytes = serde_json::to_vec(&json!({
        "event_id": "evt-1",
        "event_name": "page_view",
        "user_id": "user-1",
        "timestamp": "the day after tomorrow"
    }))
    .unwrap();

    let result = process_payload(&pool, &bytes).await;

    assert_matches!(result, Err(ProcessError::Malformed(_)));
    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failure_on_one_payload_does_not_poison_the_next(pool: PgPool) {
    // A malformed message is skipped; the following valid one lands.
    assert!(process_payload(&pool, b"garbage").await.is_err());
    assert!(process_payload(&pool, &payload("evt-2")).await.unwrap());

    assert_eq!(EventRepo::count_events(&pool).await.unwrap(), 1);
}
