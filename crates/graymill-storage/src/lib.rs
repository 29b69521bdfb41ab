//! Graymill Storage Library
//!
//! Blob-store abstraction for the pipeline and its backends (S3, local
//! filesystem). The store exposes two logical namespaces, raw and processed,
//! mapped onto configured container names; callers address objects with a
//! [`Namespace`] plus the canonical `{guid}{extension}` key from
//! `graymill_core::keys`.
//!
//! Object writes are atomic at object granularity on every backend: a reader
//! observes either the whole object or none of it. The upload handler relies
//! on this to guarantee the raw object is fully visible before the queue
//! message is sent.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_blob_store;
pub use graymill_core::Namespace;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use traits::{BlobStore, ObjectListing, StorageError, StorageResult};
