//! Canonical analytics event model.
//!
//! This crate defines [`AnalyticsEvent`], the one representation of an
//! event shared by the ingestion API, the queue wire format, and the
//! processing worker, together with its JSON encode/decode contract.

pub mod event;

pub use event::{AnalyticsEvent, EventError};
