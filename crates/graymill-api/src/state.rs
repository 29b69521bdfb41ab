//! Application state shared by all handlers.

use graymill_core::Config;
use graymill_queue::QueueService;
use graymill_storage::BlobStore;
use std::sync::Arc;

/// Immutable per-process state: configuration plus the two external
/// collaborators. All coordination between concurrent requests happens
/// through the blob store and queue, never through shared mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn BlobStore>,
    pub queue: Arc<dyn QueueService>,
}

impl AppState {
    pub fn new(config: Config, storage: Arc<dyn BlobStore>, queue: Arc<dyn QueueService>) -> Self {
        Self {
            config,
            storage,
            queue,
        }
    }
}
