//! Repository for the `events` table.

use sqlx::PgPool;

use smolhog_events::AnalyticsEvent;

use crate::models::event::{EventNameCount, EventRow};

/// Column list for `events` queries.
const EVENT_COLUMNS: &str =
    "id, event_id, event_name, user_id, properties, timestamp, session_id, created_at";

/// Provides read/write operations for analytics events.
pub struct EventRepo;

impl EventRepo {
    /// Idempotently insert an event, keyed by `event_id`.
    ///
    /// Returns `true` if a row was inserted, `false` if a row with the
    /// same `event_id` already existed (a no-op, not an error). This is
    /// what makes queue redelivery safe.
    pub async fn upsert(pool: &PgPool, event: &AnalyticsEvent) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO events \
                (event_id, event_name, user_id, properties, timestamp, session_id) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (event_id) DO NOTHING",
        )
        .bind(&event.event_id)
        .bind(&event.event_name)
        .bind(&event.user_id)
        .bind(serde_json::Value::Object(event.properties.clone()))
        .bind(event.timestamp)
        .bind(&event.session_id)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Total number of stored events.
    pub async fn count_events(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM events")
            .fetch_one(pool)
            .await
    }

    /// Number of distinct users that produced at least one event.
    pub async fn count_unique_users(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM events")
            .fetch_one(pool)
            .await
    }

    /// Event names ranked by frequency, descending.
    pub async fn top_event_names(
        pool: &PgPool,
        limit: i64,
    ) -> Result<Vec<EventNameCount>, sqlx::Error> {
        sqlx::query_as::<_, EventNameCount>(
            "SELECT event_name, COUNT(*) AS count \
             FROM events \
             GROUP BY event_name \
             ORDER BY count DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// List recent events ordered newest-first by occurrence time.
    pub async fn list_recent(pool: &PgPool, limit: i64) -> Result<Vec<EventRow>, sqlx::Error> {
        let query =
            format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY timestamp DESC LIMIT $1");
        sqlx::query_as::<_, EventRow>(&query)
            .bind(limit)
            .fetch_all(pool)
            .await
    }
}
