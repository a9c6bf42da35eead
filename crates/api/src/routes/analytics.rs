//! Read-only analytics endpoints.
//!
//! These are external-collaborator reads against the store: best-effort
//! aggregations with no causal-consistency guarantee relative to events
//! still in flight through the queue.

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use smolhog_db::models::event::EventRow;
use smolhog_db::repositories::EventRepo;

use crate::error::AppResult;
use crate::state::AppState;

/// How many event names the stats endpoint ranks.
const TOP_EVENTS_LIMIT: i64 = 10;

/// Default number of rows returned by the recent-events endpoint.
const DEFAULT_RECENT_LIMIT: i64 = 100;

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_events: i64,
    pub unique_users: i64,
    pub top_events: Vec<TopEventEntry>,
}

#[derive(Debug, Serialize)]
pub struct TopEventEntry {
    pub event: String,
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct RecentEventsParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RecentEventsResponse {
    pub events: Vec<ApiEvent>,
}

/// A stored event as exposed on the read API, `properties` decoded to
/// structured JSON.
#[derive(Debug, Serialize)]
pub struct ApiEvent {
    pub event_id: String,
    pub event_name: String,
    pub user_id: String,
    pub properties: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub session_id: Option<String>,
}

impl From<EventRow> for ApiEvent {
    fn from(row: EventRow) -> Self {
        Self {
            event_id: row.event_id,
            event_name: row.event_name,
            user_id: row.user_id,
            properties: row.properties,
            timestamp: row.timestamp,
            session_id: row.session_id,
        }
    }
}

/// GET /analytics/stats -- aggregate counts over all stored events.
async fn get_stats(State(state): State<AppState>) -> AppResult<Json<StatsResponse>> {
    let total_events = EventRepo::count_events(&state.pool).await?;
    let unique_users = EventRepo::count_unique_users(&state.pool).await?;
    let top_events = EventRepo::top_event_names(&state.pool, TOP_EVENTS_LIMIT)
        .await?
        .into_iter()
        .map(|row| TopEventEntry {
            event: row.event_name,
            count: row.count,
        })
        .collect();

    Ok(Json(StatsResponse {
        total_events,
        unique_users,
        top_events,
    }))
}

/// GET /analytics/events?limit=N -- most recent events, newest first.
async fn get_recent_events(
    State(state): State<AppState>,
    Query(params): Query<RecentEventsParams>,
) -> AppResult<Json<RecentEventsResponse>> {
    let limit = params.limit.unwrap_or(DEFAULT_RECENT_LIMIT).max(0);
    tracing::debug!(limit, "Fetching recent events");

    let events = EventRepo::list_recent(&state.pool, limit)
        .await?
        .into_iter()
        .map(ApiEvent::from)
        .collect();

    Ok(Json(RecentEventsResponse { events }))
}

/// Mount analytics read routes.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/analytics/stats", get(get_stats))
        .route("/analytics/events", get(get_recent_events))
}
