//! AMQP connection, publish, and consume primitives.

use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicPublishOptions,
    BasicQosOptions, BasicRejectOptions, ConfirmSelectOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, Consumer};

/// The single named queue all analytics events flow through.
pub const EVENTS_QUEUE: &str = "events";

/// AMQP delivery mode 2: the broker writes the message to disk.
const PERSISTENT: u8 = 2;

/// One unacked delivery per consumer channel. Keeps each worker
/// single-flight on the broker side so a slow instance cannot buffer
/// the queue; added instances share deliveries evenly.
const PREFETCH_COUNT: u16 = 1;

/// Errors from the queue transport.
///
/// Both variants are transient infrastructure failures. The client does
/// not retry internally; retry policy belongs to its callers (the API's
/// publisher task and the worker's restart loop).
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The broker connection could not be established or was lost.
    #[error("broker unavailable: {0}")]
    BrokerUnavailable(#[source] lapin::Error),

    /// The broker rejected or failed a publish. The caller must not
    /// assume the message was delivered.
    #[error("publish failed: {0}")]
    Publish(#[source] lapin::Error),
}

/// One broker connection + channel, valid for a single connect cycle.
pub struct QueueClient {
    channel: Channel,
    // Held so the connection outlives the channel.
    _connection: Connection,
}

impl QueueClient {
    /// Open a connection and channel, with publisher confirms enabled.
    pub async fn connect(url: &str) -> Result<Self, QueueError> {
        let connection = Connection::connect(url, ConnectionProperties::default())
            .await
            .map_err(QueueError::BrokerUnavailable)?;

        let channel = connection
            .create_channel()
            .await
            .map_err(QueueError::BrokerUnavailable)?;

        // Confirms let publish() observe that the broker accepted the write.
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await
            .map_err(QueueError::BrokerUnavailable)?;

        tracing::debug!(url = %url, "Broker connection established");

        Ok(Self {
            channel,
            _connection: connection,
        })
    }

    /// Declare a durable queue so its contents survive broker restart.
    ///
    /// Idempotent on the broker side; both the publisher and the consumer
    /// declare before use so either can start first.
    pub async fn declare_queue(&self, queue: &str) -> Result<(), QueueError> {
        self.channel
            .queue_declare(
                queue,
                QueueDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(QueueError::BrokerUnavailable)?;
        Ok(())
    }

    /// Publish one message in persistent mode and wait for the broker
    /// confirm.
    pub async fn publish(&self, queue: &str, payload: &[u8]) -> Result<(), QueueError> {
        let confirm = self
            .channel
            .basic_publish(
                "",
                queue,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await
            .map_err(QueueError::Publish)?;

        confirm.await.map_err(QueueError::Publish)?;
        Ok(())
    }

    /// Create a manual-ack consumer on the given queue.
    ///
    /// The channel is capped at [`PREFETCH_COUNT`] unacked deliveries, so
    /// the broker holds back further messages until the current one is
    /// resolved. The returned stream yields one [`Delivery`] per message;
    /// each must be resolved with [`ack`], [`requeue`], or [`reject`].
    pub async fn consumer(&self, queue: &str, tag: &str) -> Result<Consumer, QueueError> {
        self.channel
            .basic_qos(PREFETCH_COUNT, BasicQosOptions::default())
            .await
            .map_err(QueueError::BrokerUnavailable)?;

        self.channel
            .basic_consume(
                queue,
                tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(QueueError::BrokerUnavailable)
    }
}

/// Acknowledge a delivery, removing it from the queue.
///
/// Only called after the message has been durably persisted.
pub async fn ack(delivery: &Delivery) -> Result<(), lapin::Error> {
    delivery.acker.ack(BasicAckOptions::default()).await
}

/// Negatively acknowledge a delivery and put it back on the queue for
/// redelivery.
pub async fn requeue(delivery: &Delivery) -> Result<(), lapin::Error> {
    delivery
        .acker
        .nack(BasicNackOptions {
            requeue: true,
            ..Default::default()
        })
        .await
}

/// Drop a delivery without redelivery. Terminal for poison messages.
pub async fn reject(delivery: &Delivery) -> Result<(), lapin::Error> {
    delivery
        .acker
        .reject(BasicRejectOptions { requeue: false })
        .await
}
