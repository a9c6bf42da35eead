//! Durable AMQP transport between the ingestion API and the worker.
//!
//! [`QueueClient`] wraps one broker connection + channel pair. Connections
//! are owned by whoever opened them for the duration of one connect cycle
//! and are never shared across reconnects; a caller that loses the broker
//! drops the client and constructs a fresh one.
//!
//! Delivery semantics are at-least-once: messages are published in
//! persistent mode to a durable queue and are only removed after an
//! explicit ack. Consumers must therefore tolerate redelivery.

pub mod client;

pub use client::{ack, reject, requeue, QueueClient, QueueError, EVENTS_QUEUE};
