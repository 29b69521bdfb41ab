//! Graymill Core Library
//!
//! Shared foundation for the graymill pipeline: the producer/worker message
//! contract, canonical object-key derivation, configuration, and the core
//! error taxonomy. Both halves of the pipeline (upload API and processing
//! worker) depend on this crate so they can never disagree on addressing or
//! wire format.

pub mod config;
pub mod error;
pub mod keys;
pub mod message;

// Re-export commonly used types
pub use config::{Config, FailurePolicy, QueueBackend, StorageBackend};
pub use error::{AppError, LogLevel};
pub use keys::{file_extension, guess_content_type, object_key, Namespace};
pub use message::{MessageError, ProcessImageMessage};
