use crate::traits::{Delivery, QueueError, QueueResult, QueueService};
use async_trait::async_trait;
use aws_sdk_sqs::types::MessageSystemAttributeName;
use aws_sdk_sqs::Client;
use bytes::Bytes;
use std::time::Duration;

/// SQS-backed queue.
///
/// Standard-queue at-least-once semantics map directly onto the trait:
/// acknowledge = DeleteMessage, release = ChangeMessageVisibility(0),
/// delivery count = ApproximateReceiveCount. Dead-lettering forwards to a
/// separate dead-letter queue URL and deletes the original, so the policy
/// works even when the queue has no redrive policy configured server-side.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    dead_letter_queue_url: Option<String>,
}

impl SqsQueue {
    /// Create an SQS queue client from the ambient AWS configuration
    /// (credentials and region resolved the standard SDK way).
    pub async fn new(queue_url: String, dead_letter_queue_url: Option<String>) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::with_client(Client::new(&aws_config), queue_url, dead_letter_queue_url)
    }

    pub fn with_client(
        client: Client,
        queue_url: String,
        dead_letter_queue_url: Option<String>,
    ) -> Self {
        SqsQueue {
            client,
            queue_url,
            dead_letter_queue_url,
        }
    }
}

#[async_trait]
impl QueueService for SqsQueue {
    async fn send(&self, payload: Bytes) -> QueueResult<()> {
        let body = String::from_utf8(payload.to_vec())
            .map_err(|e| QueueError::SendFailed(format!("Payload is not UTF-8: {}", e)))?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, queue_url = %self.queue_url, "SQS send failed");
                QueueError::SendFailed(e.to_string())
            })?;

        tracing::debug!(queue_url = %self.queue_url, "SQS message sent");
        Ok(())
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> QueueResult<Vec<Delivery>> {
        // SQS caps both parameters; clamp instead of erroring.
        let max = (max_messages.clamp(1, 10)) as i32;
        let wait_secs = wait.as_secs().min(20) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max)
            .wait_time_seconds(wait_secs)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, queue_url = %self.queue_url, "SQS receive failed");
                QueueError::ReceiveFailed(e.to_string())
            })?;

        let deliveries = output
            .messages()
            .iter()
            .filter_map(|message| {
                let receipt = message.receipt_handle()?.to_string();
                let payload = Bytes::from(message.body().unwrap_or_default().to_string());
                let delivery_count = message
                    .attributes()
                    .and_then(|a| a.get(&MessageSystemAttributeName::ApproximateReceiveCount))
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1);
                Some(Delivery {
                    payload,
                    receipt,
                    delivery_count,
                })
            })
            .collect();

        Ok(deliveries)
    }

    async fn acknowledge(&self, delivery: &Delivery) -> QueueResult<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&delivery.receipt)
            .send()
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;
        Ok(())
    }

    async fn release(&self, delivery: &Delivery) -> QueueResult<()> {
        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(&delivery.receipt)
            .visibility_timeout(0)
            .send()
            .await
            .map_err(|e| QueueError::BackendError(e.to_string()))?;
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery) -> QueueResult<()> {
        let dlq_url = self.dead_letter_queue_url.as_ref().ok_or_else(|| {
            QueueError::ConfigError("SQS_DEAD_LETTER_QUEUE_URL not configured".to_string())
        })?;

        let body = String::from_utf8(delivery.payload.to_vec())
            .map_err(|e| QueueError::BackendError(format!("Payload is not UTF-8: {}", e)))?;

        self.client
            .send_message()
            .queue_url(dlq_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::BackendError(e.to_string()))?;

        // Only delete from the work queue once the DLQ copy is durable.
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(&delivery.receipt)
            .send()
            .await
            .map_err(|e| QueueError::AckFailed(e.to_string()))?;

        tracing::warn!(queue_url = %self.queue_url, dlq_url = %dlq_url, "Message dead-lettered");
        Ok(())
    }
}
