//! The worker's outer restart loop.
//!
//! The worker process is the supervised unit: any fatal failure
//! (broker unreachable, store unreachable, channel death mid-consume)
//! tears down the whole session and rebuilds it from scratch after a
//! fixed backoff. There is no terminal state for normal operation; the
//! loop runs until the process receives an external shutdown signal.

use crate::config::WorkerConfig;
use crate::consumer::Session;

/// Run connect/consume cycles indefinitely.
///
/// This function never returns under normal operation.
pub async fn run(config: &WorkerConfig) {
    loop {
        tracing::info!(queue = smolhog_queue::EVENTS_QUEUE, "Worker starting");

        match Session::connect(config).await {
            Ok(session) => {
                tracing::info!("Worker connected, waiting for events");
                match session.run().await {
                    Ok(()) => tracing::warn!("Broker closed the channel"),
                    Err(e) => tracing::error!(error = %e, "Consume session failed"),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Worker failed to connect");
            }
        }

        tracing::info!(
            delay_secs = config.restart_delay.as_secs(),
            "Restarting after backoff"
        );
        tokio::time::sleep(config.restart_delay).await;
    }
}
