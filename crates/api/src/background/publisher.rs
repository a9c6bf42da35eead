//! Background queue publisher.
//!
//! The ingest handler never talks to the broker directly: it pushes
//! accepted events into a bounded [`EventDispatch`] channel and responds.
//! A single publisher task owns the broker connection, drains the channel,
//! and publishes each event in persistent mode.
//!
//! Accepted is accepted: a publish failure after the HTTP response has
//! been sent is logged with the event id but never surfaced to the
//! caller. The structured log lines here are the reporting hook for loss.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use smolhog_events::AnalyticsEvent;
use smolhog_queue::{QueueClient, QueueError, EVENTS_QUEUE};

/// Reconnection delay after a broker failure.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Sending half of the dispatch channel, held in `AppState`.
#[derive(Clone)]
pub struct EventDispatch {
    tx: mpsc::Sender<AnalyticsEvent>,
}

impl EventDispatch {
    /// Create a bounded dispatch channel.
    ///
    /// The receiver goes to [`spawn`]; tests can keep it instead to
    /// observe exactly what the handler dispatched.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AnalyticsEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Hand an accepted event to the publisher without blocking.
    ///
    /// If the channel is full the event is dropped and logged; the
    /// caller has already been answered, so backpressure here must not
    /// stall the response path.
    pub fn dispatch(&self, event: AnalyticsEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    event_id = %event.event_id,
                    "Dispatch channel full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::error!(
                    event_id = %event.event_id,
                    "Publisher task is gone, dropping event"
                );
            }
        }
    }
}

/// Spawn the publisher task.
pub fn spawn(amqp_url: String, rx: mpsc::Receiver<AnalyticsEvent>) -> JoinHandle<()> {
    tokio::spawn(run(amqp_url, rx))
}

/// Run the publish loop indefinitely.
///
/// Reconnects with a fixed delay whenever the broker connection fails;
/// returns only when the dispatch channel closes (process shutdown).
async fn run(amqp_url: String, mut rx: mpsc::Receiver<AnalyticsEvent>) {
    loop {
        let client = match connect(&amqp_url).await {
            Ok(client) => client,
            Err(e) => {
                tracing::error!(error = %e, "Publisher failed to reach broker");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };

        tracing::info!(queue = EVENTS_QUEUE, "Publisher connected to broker");

        if !drain(&client, &mut rx).await {
            tracing::info!("Dispatch channel closed, publisher shutting down");
            return;
        }

        tracing::warn!("Publisher session ended, reconnecting");
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Open a connection and make sure the durable queue exists.
async fn connect(amqp_url: &str) -> Result<QueueClient, QueueError> {
    let client = QueueClient::connect(amqp_url).await?;
    client.declare_queue(EVENTS_QUEUE).await?;
    Ok(client)
}

/// Publish events from the channel until the broker fails or the channel
/// closes. Returns `false` when the channel is closed.
async fn drain(client: &QueueClient, rx: &mut mpsc::Receiver<AnalyticsEvent>) -> bool {
    while let Some(event) = rx.recv().await {
        let payload = match event.to_bytes() {
            Ok(payload) => payload,
            Err(e) => {
                // Unreachable for a value that deserialized on ingest,
                // but never worth crashing the publisher over.
                tracing::error!(error = %e, event_id = %event.event_id, "Failed to encode event");
                continue;
            }
        };

        match client.publish(EVENTS_QUEUE, &payload).await {
            Ok(()) => {
                tracing::debug!(event_id = %event.event_id, "Event queued");
            }
            Err(e) => {
                // The event is lost; the caller was already answered.
                tracing::error!(
                    error = %e,
                    event_id = %event.event_id,
                    "Failed to publish event, reconnecting"
                );
                return true;
            }
        }
    }
    false
}
