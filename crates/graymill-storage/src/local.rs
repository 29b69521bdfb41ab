use crate::traits::{BlobStore, ObjectListing, StorageError, StorageResult};
use async_trait::async_trait;
use graymill_core::Namespace;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Local filesystem blob store.
///
/// Namespaces map to subdirectories of the base path. Used for development
/// and tests; the production deployment uses the S3 backend.
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
    base_url: String,
    raw_namespace: String,
    processed_namespace: String,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for object storage
    /// * `base_url` - Base URL for serving objects (e.g. "http://localhost:8080/files")
    /// * `raw_namespace` / `processed_namespace` - Configured container names
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        raw_namespace: String,
        processed_namespace: String,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        for namespace in [&raw_namespace, &processed_namespace] {
            let dir = base_path.join(namespace);
            fs::create_dir_all(&dir).await.map_err(|e| {
                StorageError::ConfigError(format!(
                    "Failed to create storage directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }

        Ok(LocalBlobStore {
            base_path,
            base_url,
            raw_namespace,
            processed_namespace,
        })
    }

    fn namespace_name(&self, namespace: Namespace) -> &str {
        match namespace {
            Namespace::Raw => &self.raw_namespace,
            Namespace::Processed => &self.processed_namespace,
        }
    }

    /// Convert a namespace and key to a filesystem path, rejecting keys that
    /// could escape the base storage directory.
    fn key_to_path(&self, namespace: Namespace, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(self.base_path.join(self.namespace_name(namespace)).join(key))
    }

    fn generate_url(&self, namespace: Namespace, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.namespace_name(namespace),
            key
        )
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(
        &self,
        namespace: Namespace,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        let path = self.key_to_path(namespace, key)?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        // Write to a temp file and rename so a concurrent reader never sees
        // a half-written object.
        let tmp_path = path.with_extension("part");
        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to create file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        file.write_all(&data).await.map_err(|e| {
            StorageError::UploadFailed(format!(
                "Failed to write file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", tmp_path.display(), e))
        })?;

        fs::rename(&tmp_path, &path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to finalize {}: {}", path.display(), e))
        })?;

        let url = self.generate_url(namespace, key);

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(url)
    }

    async fn get(&self, namespace: Namespace, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.key_to_path(namespace, key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.to_string()));
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(data)
    }

    async fn exists(&self, namespace: Namespace, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(namespace, key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn list(&self, namespace: Namespace) -> StorageResult<Vec<ObjectListing>> {
        let dir = self.base_path.join(self.namespace_name(namespace));

        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            StorageError::ListFailed(format!("Failed to read directory {}: {}", dir.display(), e))
        })?;

        let mut listings = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::ListFailed(e.to_string()))?
        {
            if !entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let key = entry.file_name().to_string_lossy().to_string();
            // Skip in-progress writes.
            if key.ends_with(".part") {
                continue;
            }
            let url = self.generate_url(namespace, &key);
            listings.push(ObjectListing { key, url });
        }

        listings.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listings)
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(namespace, key)?;

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(path = %path.display(), key = %key, "Local storage delete successful");

        Ok(())
    }

    fn url_for(&self, namespace: Namespace, key: &str) -> String {
        self.generate_url(namespace, key)
    }
}
