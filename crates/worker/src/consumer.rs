//! A single consume session and the per-delivery decision.
//!
//! Each delivery is decoded, upserted idempotently, then acked. A
//! failure in either step leaves the message unacknowledged so the
//! broker redelivers it; the store's unique constraint makes redelivery
//! converge to exactly one row. Per-message failures never end the
//! session; only transport failures (consume stream, ack/nack) do,
//! which hands control back to the supervisor's restart loop.

use futures::StreamExt;
use lapin::message::Delivery;
use sqlx::PgPool;

use smolhog_db::repositories::EventRepo;
use smolhog_db::DbPool;
use smolhog_events::{AnalyticsEvent, EventError};
use smolhog_queue::{QueueClient, QueueError, EVENTS_QUEUE};

use crate::config::WorkerConfig;

/// Failure while processing one message. Decides the message's fate,
/// never the session's.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// Undecodable payload. Non-retryable by nature.
    #[error(transparent)]
    Malformed(#[from] EventError),

    /// The store rejected or failed the write. Transient by taxonomy.
    #[error("persistence failed: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Fatal session failure: connection setup or the ack/consume transport.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("store unavailable: {0}")]
    Store(#[from] sqlx::Error),

    #[error("broker channel failed: {0}")]
    Broker(#[from] lapin::Error),
}

/// What to do with a delivery once processing has been attempted.
#[derive(Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Persisted (or already present): remove from the queue.
    Ack,
    /// Transient failure or first malformed sighting: redeliver.
    Requeue,
    /// Confirmed poison: drop without redelivery.
    Reject,
}

/// Decide a delivery's fate from the processing outcome.
///
/// A malformed payload gets exactly one redelivery: the same bytes will
/// fail decoding again, and when they come back flagged `redelivered`
/// they are rejected instead of cycling forever. Persistence failures
/// always requeue, since the store may be back for the next attempt.
pub fn disposition(result: &Result<bool, ProcessError>, redelivered: bool) -> Disposition {
    match result {
        Ok(_) => Disposition::Ack,
        Err(ProcessError::Malformed(_)) if redelivered => Disposition::Reject,
        Err(ProcessError::Malformed(_)) => Disposition::Requeue,
        Err(ProcessError::Persistence(_)) => Disposition::Requeue,
    }
}

/// Decode one queue payload and persist it.
///
/// Returns whether a new row was inserted (`false` means the event id
/// was already present and the write collapsed into a no-op).
pub async fn process_payload(pool: &PgPool, payload: &[u8]) -> Result<bool, ProcessError> {
    let event = AnalyticsEvent::from_bytes(payload)?;
    let inserted = EventRepo::upsert(pool, &event).await?;

    if inserted {
        tracing::info!(
            event_id = %event.event_id,
            event_name = %event.event_name,
            "Processed event"
        );
    } else {
        tracing::debug!(event_id = %event.event_id, "Duplicate event skipped");
    }

    Ok(inserted)
}

/// One connect-and-consume cycle's worth of connections.
///
/// Owns a fresh broker connection and store pool; both are dropped
/// together when the session ends, and the next cycle builds new ones.
pub struct Session {
    pool: DbPool,
    consumer: lapin::Consumer,
    // Keeps the AMQP connection and channel alive for the consumer.
    _client: QueueClient,
}

impl Session {
    /// Open broker and store connections and register the consumer.
    pub async fn connect(config: &WorkerConfig) -> Result<Self, SessionError> {
        let client = QueueClient::connect(&config.amqp_url).await?;
        client.declare_queue(EVENTS_QUEUE).await?;
        let consumer = client.consumer(EVENTS_QUEUE, &config.consumer_tag).await?;

        let pool = smolhog_db::create_pool(&config.database_url).await?;
        smolhog_db::health_check(&pool).await?;

        Ok(Self {
            pool,
            consumer,
            _client: client,
        })
    }

    /// Consume until the broker channel fails or closes.
    ///
    /// One full decode + persist + acknowledge cycle completes before
    /// the next delivery is awaited; no pipelining within an instance.
    pub async fn run(mut self) -> Result<(), SessionError> {
        while let Some(delivery) = self.consumer.next().await {
            let delivery = delivery?;
            self.handle_delivery(delivery).await?;
        }

        // Stream exhausted: the broker closed the channel.
        Ok(())
    }

    /// Process one delivery and resolve it with the broker.
    async fn handle_delivery(&self, delivery: Delivery) -> Result<(), SessionError> {
        let result = process_payload(&self.pool, &delivery.data).await;

        match disposition(&result, delivery.redelivered) {
            Disposition::Ack => smolhog_queue::ack(&delivery).await?,
            Disposition::Requeue => {
                match &result {
                    Err(ProcessError::Malformed(e)) => {
                        tracing::warn!(error = %e, "Malformed message, requeueing once");
                    }
                    Err(ProcessError::Persistence(e)) => {
                        tracing::error!(error = %e, "Persistence failed, requeueing");
                    }
                    Ok(_) => unreachable!("success never requeues"),
                }
                smolhog_queue::requeue(&delivery).await?;
            }
            Disposition::Reject => {
                tracing::error!(
                    size = delivery.data.len(),
                    "Dropping poison message after redelivery"
                );
                smolhog_queue::reject(&delivery).await?;
            }
        }

        Ok(())
    }
}
