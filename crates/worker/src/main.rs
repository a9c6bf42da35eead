//! `smolhog-worker` -- queue-to-store processing daemon.
//!
//! Consumes analytics events from the durable `events` queue and
//! persists them idempotently into PostgreSQL. Runs one message at a
//! time; scale out by starting more worker processes.
//!
//! # Environment variables
//!
//! | Variable             | Required | Default | Description                         |
//! |----------------------|----------|---------|-------------------------------------|
//! | `DATABASE_URL`       | yes      | --      | PostgreSQL connection URL           |
//! | `AMQP_URL`           | no       | local   | AMQP broker URL                     |
//! | `CONSUMER_TAG`       | no       | `smolhog-worker` | Consumer tag on the broker |
//! | `RESTART_DELAY_SECS` | no       | `5`     | Backoff between restart cycles      |

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use smolhog_worker::config::WorkerConfig;
use smolhog_worker::supervisor;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "smolhog_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();

    tracing::info!(
        consumer_tag = %config.consumer_tag,
        restart_delay_secs = config.restart_delay.as_secs(),
        "Starting smolhog-worker",
    );

    supervisor::run(&config).await;
}
