//! Persisted event row models.

use serde::Serialize;
use sqlx::FromRow;

use crate::{DbId, Timestamp};

/// A row from the `events` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventRow {
    pub id: DbId,
    pub event_id: String,
    pub event_name: String,
    pub user_id: String,
    pub properties: serde_json::Value,
    pub timestamp: Timestamp,
    pub session_id: Option<String>,
    pub created_at: Timestamp,
}

/// One entry of the top-events-by-frequency aggregation.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventNameCount {
    pub event_name: String,
    pub count: i64,
}
