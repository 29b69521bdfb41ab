//! Queue abstraction trait
//!
//! This module defines the QueueService trait that all queue backends must
//! implement. Delivery is at-least-once: a message sent once may be received
//! more than once, and consumers must treat redelivery as routine.

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;
use thiserror::Error;

/// Queue operation errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Acknowledge failed: {0}")]
    AckFailed(String),

    #[error("Unknown receipt: {0}")]
    UnknownReceipt(String),

    #[error("Queue backend error: {0}")]
    BackendError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<QueueError> for graymill_core::AppError {
    fn from(err: QueueError) -> Self {
        graymill_core::AppError::Queue(err.to_string())
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// One received message.
///
/// `receipt` identifies this particular delivery for acknowledge/release;
/// `delivery_count` is how many times the message has been delivered
/// including this one, used by the retry-then-dead-letter policy.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub payload: Bytes,
    pub receipt: String,
    pub delivery_count: u32,
}

/// Queue-service abstraction
///
/// Semantics all backends must provide:
/// - at-least-once delivery with redelivery after a visibility timeout,
/// - `acknowledge` removes the message permanently,
/// - `release` makes it immediately available for redelivery,
/// - `dead_letter` moves it out of the work queue into a dead-letter store.
#[async_trait]
pub trait QueueService: Send + Sync {
    /// Enqueue a message.
    async fn send(&self, payload: Bytes) -> QueueResult<()>;

    /// Receive up to `max_messages` deliveries, waiting up to `wait` for at
    /// least one to become available. May return fewer (or none).
    async fn receive(&self, max_messages: usize, wait: Duration) -> QueueResult<Vec<Delivery>>;

    /// Terminal: the delivery is complete and must not be redelivered.
    async fn acknowledge(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Return the message to the queue for immediate redelivery.
    async fn release(&self, delivery: &Delivery) -> QueueResult<()>;

    /// Terminal: move the message to the dead-letter store.
    async fn dead_letter(&self, delivery: &Delivery) -> QueueResult<()>;
}
