#[cfg(feature = "queue-memory")]
use crate::InMemoryQueue;
#[cfg(feature = "queue-sqs")]
use crate::SqsQueue;
use crate::{QueueError, QueueResult, QueueService};
use graymill_core::{Config, QueueBackend};
use std::sync::Arc;

/// Create a queue backend based on configuration
pub async fn create_queue(config: &Config) -> QueueResult<Arc<dyn QueueService>> {
    match config.queue_backend {
        #[cfg(feature = "queue-sqs")]
        QueueBackend::Sqs => {
            let queue_url = config.sqs_queue_url.clone().ok_or_else(|| {
                QueueError::ConfigError("SQS_QUEUE_URL not configured".to_string())
            })?;

            let queue = SqsQueue::new(queue_url, config.sqs_dead_letter_queue_url.clone()).await;
            Ok(Arc::new(queue))
        }

        #[cfg(not(feature = "queue-sqs"))]
        QueueBackend::Sqs => Err(QueueError::ConfigError(
            "SQS queue backend not available (queue-sqs feature not enabled)".to_string(),
        )),

        #[cfg(feature = "queue-memory")]
        QueueBackend::Memory => Ok(Arc::new(InMemoryQueue::new())),

        #[cfg(not(feature = "queue-memory"))]
        QueueBackend::Memory => Err(QueueError::ConfigError(
            "In-memory queue backend not available (queue-memory feature not enabled)".to_string(),
        )),
    }
}
