use crate::traits::{Delivery, QueueError, QueueResult, QueueService};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(25);
const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct StoredMessage {
    payload: Bytes,
    delivery_count: u32,
}

#[derive(Debug)]
struct InFlight {
    message: StoredMessage,
    visible_again_at: Instant,
}

#[derive(Debug, Default)]
struct State {
    ready: VecDeque<StoredMessage>,
    in_flight: HashMap<String, InFlight>,
    dead: Vec<Bytes>,
    next_receipt: u64,
}

/// In-memory at-least-once queue.
///
/// Faithful to the semantics the worker relies on: received messages become
/// invisible for a visibility timeout and are redelivered (with an
/// incremented delivery count) if not acknowledged in time. Used by tests
/// and local development; production uses SQS.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    state: Arc<Mutex<State>>,
    visibility_timeout: Duration,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::with_visibility_timeout(DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_visibility_timeout(visibility_timeout: Duration) -> Self {
        InMemoryQueue {
            state: Arc::new(Mutex::new(State::default())),
            visibility_timeout,
        }
    }

    /// Move expired in-flight messages back to the ready queue.
    fn requeue_expired(state: &mut State, now: Instant) {
        let expired: Vec<String> = state
            .in_flight
            .iter()
            .filter(|(_, f)| f.visible_again_at <= now)
            .map(|(receipt, _)| receipt.clone())
            .collect();

        for receipt in expired {
            if let Some(in_flight) = state.in_flight.remove(&receipt) {
                tracing::debug!(receipt = %receipt, "Visibility timeout expired, requeueing message");
                state.ready.push_back(in_flight.message);
            }
        }
    }

    fn try_receive(&self, max_messages: usize) -> Vec<Delivery> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();
        Self::requeue_expired(&mut state, now);

        let mut deliveries = Vec::new();
        while deliveries.len() < max_messages {
            let Some(mut message) = state.ready.pop_front() else {
                break;
            };
            message.delivery_count += 1;

            state.next_receipt += 1;
            let receipt = format!("receipt-{}", state.next_receipt);

            deliveries.push(Delivery {
                payload: message.payload.clone(),
                receipt: receipt.clone(),
                delivery_count: message.delivery_count,
            });

            state.in_flight.insert(
                receipt,
                InFlight {
                    message,
                    visible_again_at: now + self.visibility_timeout,
                },
            );
        }
        deliveries
    }

    fn take_in_flight(&self, receipt: &str) -> QueueResult<StoredMessage> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state
            .in_flight
            .remove(receipt)
            .map(|f| f.message)
            .ok_or_else(|| QueueError::UnknownReceipt(receipt.to_string()))
    }

    /// Messages currently waiting for delivery (test inspection).
    pub fn ready_len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.ready.len()
    }

    /// Messages delivered but not yet resolved (test inspection).
    pub fn in_flight_len(&self) -> usize {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.in_flight.len()
    }

    /// Dead-lettered payloads (test inspection).
    pub fn dead_letters(&self) -> Vec<Bytes> {
        let state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.dead.clone()
    }
}

#[async_trait]
impl QueueService for InMemoryQueue {
    async fn send(&self, payload: Bytes) -> QueueResult<()> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.ready.push_back(StoredMessage {
            payload,
            delivery_count: 0,
        });
        Ok(())
    }

    async fn receive(&self, max_messages: usize, wait: Duration) -> QueueResult<Vec<Delivery>> {
        let deadline = Instant::now() + wait;
        loop {
            let deliveries = self.try_receive(max_messages);
            if !deliveries.is_empty() || Instant::now() >= deadline {
                return Ok(deliveries);
            }
            tokio::time::sleep(POLL_INTERVAL.min(wait)).await;
        }
    }

    async fn acknowledge(&self, delivery: &Delivery) -> QueueResult<()> {
        self.take_in_flight(&delivery.receipt)?;
        Ok(())
    }

    async fn release(&self, delivery: &Delivery) -> QueueResult<()> {
        let message = self.take_in_flight(&delivery.receipt)?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.ready.push_back(message);
        Ok(())
    }

    async fn dead_letter(&self, delivery: &Delivery) -> QueueResult<()> {
        let message = self.take_in_flight(&delivery.receipt)?;
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.dead.push(message.payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_receive_acknowledge() {
        let queue = InMemoryQueue::new();
        queue.send(Bytes::from_static(b"hello")).await.unwrap();

        let deliveries = queue.receive(10, Duration::ZERO).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].payload.as_ref(), b"hello");
        assert_eq!(deliveries[0].delivery_count, 1);

        queue.acknowledge(&deliveries[0]).await.unwrap();
        assert_eq!(queue.ready_len(), 0);
        assert_eq!(queue.in_flight_len(), 0);
    }

    #[tokio::test]
    async fn test_receive_empty_returns_nothing() {
        let queue = InMemoryQueue::new();
        let deliveries = queue.receive(10, Duration::ZERO).await.unwrap();
        assert!(deliveries.is_empty());
    }

    #[tokio::test]
    async fn test_release_makes_message_redeliverable() {
        let queue = InMemoryQueue::new();
        queue.send(Bytes::from_static(b"job")).await.unwrap();

        let first = queue.receive(1, Duration::ZERO).await.unwrap();
        queue.release(&first[0]).await.unwrap();

        let second = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].delivery_count, 2);
        assert_ne!(second[0].receipt, first[0].receipt);
    }

    #[tokio::test]
    async fn test_visibility_timeout_redelivers() {
        let queue = InMemoryQueue::with_visibility_timeout(Duration::from_millis(10));
        queue.send(Bytes::from_static(b"job")).await.unwrap();

        let first = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(first.len(), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;

        let second = queue.receive(1, Duration::ZERO).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].delivery_count, 2);

        // Original receipt is gone after redelivery.
        assert!(matches!(
            queue.acknowledge(&first[0]).await,
            Err(QueueError::UnknownReceipt(_))
        ));
    }

    #[tokio::test]
    async fn test_dead_letter_removes_from_rotation() {
        let queue = InMemoryQueue::new();
        queue.send(Bytes::from_static(b"poison")).await.unwrap();

        let deliveries = queue.receive(1, Duration::ZERO).await.unwrap();
        queue.dead_letter(&deliveries[0]).await.unwrap();

        assert_eq!(queue.ready_len(), 0);
        assert_eq!(queue.in_flight_len(), 0);
        assert_eq!(queue.dead_letters(), vec![Bytes::from_static(b"poison")]);
    }

    #[tokio::test]
    async fn test_receive_waits_for_late_send() {
        let queue = InMemoryQueue::new();
        let sender = queue.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            sender.send(Bytes::from_static(b"late")).await.unwrap();
        });

        let deliveries = queue.receive(1, Duration::from_secs(2)).await.unwrap();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].payload.as_ref(), b"late");
    }

    #[tokio::test]
    async fn test_fifo_order_preserved() {
        let queue = InMemoryQueue::new();
        for i in 0..3u8 {
            queue.send(Bytes::from(vec![i])).await.unwrap();
        }
        let deliveries = queue.receive(3, Duration::ZERO).await.unwrap();
        let order: Vec<u8> = deliveries.iter().map(|d| d.payload[0]).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }
}
