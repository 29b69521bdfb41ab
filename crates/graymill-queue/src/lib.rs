//! Graymill Queue Library
//!
//! Queue-service abstraction for the pipeline: at-least-once, single
//! consumer group, receive-with-acknowledge semantics. The producer sends
//! one message per upload; the worker receives, processes, and resolves each
//! delivery exactly once (acknowledge, release for redelivery, or
//! dead-letter).
//!
//! Backends: SQS for production (`queue-sqs` feature) and an in-memory queue
//! with real visibility-timeout redelivery for tests and local development.

pub mod factory;
#[cfg(feature = "queue-memory")]
pub mod memory;
#[cfg(feature = "queue-sqs")]
pub mod sqs;
pub mod traits;

// Re-export commonly used types
pub use factory::create_queue;
#[cfg(feature = "queue-memory")]
pub use memory::InMemoryQueue;
#[cfg(feature = "queue-sqs")]
pub use sqs::SqsQueue;
pub use traits::{Delivery, QueueError, QueueResult, QueueService};
