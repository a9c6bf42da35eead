//! Event ingestion endpoint.
//!
//! `POST /events` accepts a batch, validates its shape, hands every event
//! to the background publisher, and responds immediately. The response
//! never waits on broker I/O. Shape validation is the typed extraction
//! itself: a missing required field or an unparseable timestamp rejects
//! the request before anything is queued.

use axum::extract::State;
use axum::{routing::post, Json, Router};
use serde::{Deserialize, Serialize};

use smolhog_events::AnalyticsEvent;

use crate::state::AppState;

/// An ordered batch of events submitted together by one caller.
///
/// No cross-event invariant: each event is independently publishable and
/// independently idempotent.
#[derive(Debug, Deserialize)]
pub struct EventBatch {
    pub events: Vec<AnalyticsEvent>,
}

/// Acceptance response. "Received" means accepted for queuing, not
/// persisted.
#[derive(Debug, Serialize)]
pub struct EventsReceivedResponse {
    pub status: &'static str,
    pub events_received: usize,
}

/// POST /events -- accept a batch and schedule it for publication.
async fn receive_events(
    State(state): State<AppState>,
    Json(batch): Json<EventBatch>,
) -> Json<EventsReceivedResponse> {
    let count = batch.events.len();
    tracing::info!(count, "Received event batch");

    for event in batch.events {
        state.dispatch.dispatch(event);
    }

    Json(EventsReceivedResponse {
        status: "success",
        events_received: count,
    })
}

/// Mount ingestion routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/events", post(receive_events))
}
