//! The [`AnalyticsEvent`] envelope and its wire encoding.
//!
//! One JSON document per event, identical on the HTTP ingest boundary and
//! on the queue. `event_id` is the idempotency key for persistence: the
//! same id may arrive any number of times and must collapse to one row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Error raised when a byte payload cannot be decoded into an event.
///
/// Covers both missing required fields and an unparseable `timestamp`.
/// Non-retryable: redelivering the same bytes will fail the same way.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A single analytics occurrence.
///
/// `properties` carries the event-specific payload as an unordered string
/// keyed map; arbitrary nesting round-trips without loss. `timestamp` is
/// ISO-8601 on the wire (a trailing `Z` is accepted) and UTC in process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    /// Globally unique id, the idempotency key for persistence.
    pub event_id: String,

    /// Type/category of the occurrence, e.g. `"page_view"`.
    pub event_name: String,

    /// Subject the event is attributed to.
    pub user_id: String,

    /// Event-specific payload, defaults to an empty map.
    #[serde(default)]
    pub properties: Map<String, Value>,

    /// When the event occurred (UTC).
    pub timestamp: DateTime<Utc>,

    /// Optional client session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
}

impl AnalyticsEvent {
    /// Create an event with only the required fields.
    pub fn new(
        event_id: impl Into<String>,
        event_name: impl Into<String>,
        user_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_name: event_name.into(),
            user_id: user_id.into(),
            properties: Map::new(),
            timestamp,
            session_id: None,
        }
    }

    /// Attach a single property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Attach the client session id.
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Encode the event as its JSON wire/queue representation.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EventError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode an event from its JSON representation.
    ///
    /// Fails with [`EventError::Malformed`] when a required field is
    /// missing or `timestamp` is not a valid instant.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, EventError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
