//! Processing worker: per-delivery state machine and run loop.
//!
//! Every delivery reaches exactly one terminal queue resolution. Malformed
//! messages and duplicates are always acknowledged; job failures (missing
//! raw object, transform or publish errors) are resolved according to the
//! configured [`FailurePolicy`]. Under `DropOnFailure` the queue is always
//! drained and a failed job is lost; under `RetryThenDeadLetter` the message
//! is released for redelivery a bounded number of times and then
//! dead-lettered.

use std::sync::Arc;
use std::time::Duration;

use graymill_core::keys::extension_from_url;
use graymill_core::{object_key, AppError, FailurePolicy, Namespace, ProcessImageMessage};
use graymill_processing::GrayscaleTransformer;
use graymill_queue::{Delivery, QueueService};
use graymill_storage::{BlobStore, StorageError};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Messages requested per receive call (SQS caps this at 10).
    pub batch_size: usize,
    /// Long-poll wait per receive call.
    pub poll_wait: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            poll_wait: Duration::from_secs(5),
            failure_policy: FailurePolicy::DropOnFailure,
        }
    }
}

/// Terminal outcome of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Transform ran and the processed object was published.
    Processed,
    /// Processed object already existed; redelivery of a completed job.
    AlreadyProcessed,
    /// Payload could not be parsed or failed validation; dropped terminally.
    Malformed,
    /// Job failed and was dropped under `DropOnFailure`.
    Dropped,
    /// Job failed and was released for redelivery.
    Released,
    /// Job failed and exhausted its deliveries; moved to the dead-letter
    /// store.
    DeadLettered,
}

enum ProcessStatus {
    Completed,
    Duplicate,
}

pub struct ImageWorker {
    storage: Arc<dyn BlobStore>,
    queue: Arc<dyn QueueService>,
    config: WorkerConfig,
}

impl ImageWorker {
    pub fn new(
        storage: Arc<dyn BlobStore>,
        queue: Arc<dyn QueueService>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            storage,
            queue,
            config,
        }
    }

    /// Handle one delivery to a terminal outcome. Internal failures never
    /// propagate past this call; they are logged and resolved per policy.
    #[tracing::instrument(skip(self, delivery), fields(delivery_count = delivery.delivery_count))]
    pub async fn handle_delivery(&self, delivery: &Delivery) -> Outcome {
        let message = match ProcessImageMessage::parse(&delivery.payload) {
            Ok(message) => message,
            Err(e) => {
                // A malformed message can never become valid on redelivery.
                tracing::warn!(error = %e, "Invalid message format received, dropping");
                self.resolve_ack(delivery).await;
                return Outcome::Malformed;
            }
        };

        match self.process(&message).await {
            Ok(ProcessStatus::Completed) => {
                tracing::info!(image_guid = %message.image_guid, "Successfully processed image");
                self.resolve_ack(delivery).await;
                Outcome::Processed
            }
            Ok(ProcessStatus::Duplicate) => {
                tracing::info!(
                    image_guid = %message.image_guid,
                    "Processed image already exists, skipping duplicate delivery"
                );
                self.resolve_ack(delivery).await;
                Outcome::AlreadyProcessed
            }
            Err(error) => self.resolve_failure(delivery, &message, error).await,
        }
    }

    /// The transform-and-publish core: idempotence check, fetch, transform,
    /// publish. Side effects: at most one raw read, one existence check, one
    /// processed write.
    async fn process(&self, message: &ProcessImageMessage) -> Result<ProcessStatus, AppError> {
        let extension = extension_from_url(&message.raw_image_url);
        let key = object_key(&message.image_guid, extension);

        // Existence of the processed object is proof the job completed; the
        // check is the idempotence barrier for at-least-once delivery.
        if self.storage.exists(Namespace::Processed, &key).await? {
            return Ok(ProcessStatus::Duplicate);
        }

        let raw = match self.storage.get(Namespace::Raw, &key).await {
            Ok(raw) => raw,
            Err(StorageError::NotFound(_)) => {
                return Err(AppError::NotFound(format!(
                    "Raw image {} does not exist",
                    key
                )))
            }
            Err(e) => return Err(e.into()),
        };

        let (processed, format) = GrayscaleTransformer::apply(&raw)?;

        self.storage
            .put(
                Namespace::Processed,
                &key,
                processed.to_vec(),
                GrayscaleTransformer::content_type(format),
            )
            .await?;

        Ok(ProcessStatus::Completed)
    }

    /// Apply the failure policy to a failed job.
    async fn resolve_failure(
        &self,
        delivery: &Delivery,
        message: &ProcessImageMessage,
        error: AppError,
    ) -> Outcome {
        match self.config.failure_policy {
            FailurePolicy::DropOnFailure => {
                tracing::error!(
                    image_guid = %message.image_guid,
                    error = %error,
                    "Error processing image, dropping message"
                );
                self.resolve_ack(delivery).await;
                Outcome::Dropped
            }
            FailurePolicy::RetryThenDeadLetter { max_deliveries } => {
                if delivery.delivery_count >= max_deliveries {
                    tracing::error!(
                        image_guid = %message.image_guid,
                        error = %error,
                        delivery_count = delivery.delivery_count,
                        max_deliveries,
                        "Error processing image, deliveries exhausted, dead-lettering"
                    );
                    if let Err(e) = self.queue.dead_letter(delivery).await {
                        // The message stays in flight and redelivers after
                        // the visibility timeout.
                        tracing::error!(error = %e, "Failed to dead-letter message");
                    }
                    Outcome::DeadLettered
                } else {
                    tracing::warn!(
                        image_guid = %message.image_guid,
                        error = %error,
                        delivery_count = delivery.delivery_count,
                        max_deliveries,
                        "Error processing image, releasing for redelivery"
                    );
                    if let Err(e) = self.queue.release(delivery).await {
                        tracing::error!(error = %e, "Failed to release message");
                    }
                    Outcome::Released
                }
            }
        }
    }

    /// Acknowledge, logging rather than propagating failure: the worst case
    /// is one extra redelivery, which the idempotence check absorbs.
    async fn resolve_ack(&self, delivery: &Delivery) {
        if let Err(e) = self.queue.acknowledge(delivery).await {
            tracing::error!(error = %e, receipt = %delivery.receipt, "Failed to acknowledge message");
        }
    }

    /// Poll the queue until a shutdown signal arrives. Deliveries within a
    /// batch are handled sequentially; the queue service controls fan-out
    /// across worker processes.
    pub async fn run(&self, mut shutdown_rx: mpsc::Receiver<()>) {
        tracing::info!(
            batch_size = self.config.batch_size,
            poll_wait_secs = self.config.poll_wait.as_secs(),
            failure_policy = ?self.config.failure_policy,
            "Processing worker started"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Processing worker shutting down");
                    break;
                }
                result = self.queue.receive(self.config.batch_size, self.config.poll_wait) => {
                    match result {
                        Ok(deliveries) => {
                            for delivery in &deliveries {
                                self.handle_delivery(delivery).await;
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to receive from queue");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }

        tracing::info!("Processing worker stopped");
    }
}
