//! SmolHog processing worker.
//!
//! Drains the durable `events` queue into PostgreSQL, forever. One
//! message is decoded and persisted at a time per worker instance;
//! throughput scales by running more instances against the same queue.
//!
//! - [`supervisor`]: the outer restart loop. Connections to broker and
//!   store are owned by one cycle and rebuilt together after any fatal
//!   failure.
//! - [`consumer`]: a single consume session and the per-delivery
//!   ack/requeue/reject decision.

pub mod config;
pub mod consumer;
pub mod supervisor;
