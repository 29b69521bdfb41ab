//! Storage abstraction trait
//!
//! This module defines the BlobStore trait that all storage backends must
//! implement.

use async_trait::async_trait;
use graymill_core::Namespace;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("List failed: {0}")]
    ListFailed(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<StorageError> for graymill_core::AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => graymill_core::AppError::NotFound(key),
            other => graymill_core::AppError::Storage(other.to_string()),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One object in a namespace listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectListing {
    pub key: String,
    pub url: String,
}

/// Blob-store abstraction
///
/// All storage backends (S3, local filesystem) must implement this trait.
/// The pipeline works against it without coupling to a concrete managed
/// store. Keys must not contain `..` or a leading `/`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Upload an object and return its publicly resolvable URL.
    ///
    /// The write is atomic at object granularity; on return the object is
    /// visible to readers (read-after-write).
    async fn put(
        &self,
        namespace: Namespace,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<String>;

    /// Download an object. Returns `StorageError::NotFound` when the key
    /// does not exist in the namespace.
    async fn get(&self, namespace: Namespace, key: &str) -> StorageResult<Vec<u8>>;

    /// Check whether an object exists.
    async fn exists(&self, namespace: Namespace, key: &str) -> StorageResult<bool>;

    /// List all objects in a namespace.
    async fn list(&self, namespace: Namespace) -> StorageResult<Vec<ObjectListing>>;

    /// Delete an object. Deleting a missing object is not an error.
    async fn delete(&self, namespace: Namespace, key: &str) -> StorageResult<()>;

    /// The URL an object would have under this key, whether or not it
    /// exists yet. The upload handler uses this to predict the processed
    /// object's address before the worker has produced it.
    fn url_for(&self, namespace: Namespace, key: &str) -> String;
}
