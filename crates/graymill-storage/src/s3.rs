use crate::traits::{BlobStore, ObjectListing, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use graymill_core::Namespace;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, PutPayload, Result as ObjectResult};

/// S3 blob store.
///
/// Both namespaces live in a single bucket as key prefixes:
/// `{namespace}/{key}`. Works against AWS S3 and S3-compatible providers
/// (MinIO, DigitalOcean Spaces) via a custom endpoint.
#[derive(Clone)]
pub struct S3BlobStore {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    raw_namespace: String,
    processed_namespace: String,
}

impl S3BlobStore {
    /// Create a new S3BlobStore instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g. "http://localhost:9000" for MinIO)
    /// * `raw_namespace` / `processed_namespace` - Configured key prefixes
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        raw_namespace: String,
        processed_namespace: String,
    ) -> StorageResult<Self> {
        // Build AmazonS3 object store from environment and explicit settings.
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3BlobStore {
            store,
            bucket,
            region,
            endpoint_url,
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

    fn object_path(&self, namespace: Namespace, key: &str) -> StorageResult<Path> {
        if key.is_empty() || key.contains("..") || key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }
        Ok(Path::from(format!("{}/{}", self.namespace_name(namespace), key)))
    }

    /// Generate public URL for an object
    ///
    /// For AWS S3, uses the standard format: https://{bucket}.s3.{region}.amazonaws.com/{prefix}/{key}
    /// For S3-compatible providers, uses path-style URLs from the endpoint
    fn generate_url(&self, namespace: Namespace, key: &str) -> String {
        let prefixed = format!("{}/{}", self.namespace_name(namespace), key);
        if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, prefixed)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, prefixed
            )
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        namespace: Namespace,
        key: &str,
        data: Vec<u8>,
        _content_type: &str,
    ) -> StorageResult<String> {
        let location = self.object_path(namespace, key)?;
        let size = data.len() as u64;
        let bytes = Bytes::from(data);

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(bytes)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %location,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.generate_url(namespace, key);

        tracing::info!(
            bucket = %self.bucket,
            key = %location,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(url)
    }

    async fn get(&self, namespace: Namespace, key: &str) -> StorageResult<Vec<u8>> {
        let location = self.object_path(namespace, key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %location,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %location,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes.to_vec())
    }

    async fn exists(&self, namespace: Namespace, key: &str) -> StorageResult<bool> {
        let location = self.object_path(namespace, key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn list(&self, namespace: Namespace) -> StorageResult<Vec<ObjectListing>> {
        let prefix = Path::from(self.namespace_name(namespace).to_string());
        let mut stream = self.store.list(Some(&prefix));

        let mut listings = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| StorageError::ListFailed(e.to_string()))?;
            let key = meta
                .location
                .as_ref()
                .strip_prefix(&format!("{}/", self.namespace_name(namespace)))
                .unwrap_or(meta.location.as_ref())
                .to_string();
            let url = self.generate_url(namespace, &key);
            listings.push(ObjectListing { key, url });
        }

        listings.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(listings)
    }

    async fn delete(&self, namespace: Namespace, key: &str) -> StorageResult<()> {
        let location = self.object_path(namespace, key)?;

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(_) | Err(ObjectStoreError::NotFound { .. }) => {
                tracing::info!(bucket = %self.bucket, key = %location, "S3 delete successful");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %location,
                    "S3 delete failed"
                );
                Err(StorageError::DeleteFailed(e.to_string()))
            }
        }
    }

    fn url_for(&self, namespace: Namespace, key: &str) -> String {
        self.generate_url(namespace, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store(endpoint: Option<&str>) -> S3BlobStore {
        S3BlobStore::new(
            "graymill".to_string(),
            "us-east-1".to_string(),
            endpoint.map(String::from),
            "raw-images".to_string(),
            "processed-images".to_string(),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_aws_url_format() {
        let store = test_store(None).await;
        assert_eq!(
            store.url_for(Namespace::Raw, "abc.jpg"),
            "https://graymill.s3.us-east-1.amazonaws.com/raw-images/abc.jpg"
        );
    }

    #[tokio::test]
    async fn test_custom_endpoint_url_format() {
        let store = test_store(Some("http://localhost:9000/")).await;
        assert_eq!(
            store.url_for(Namespace::Processed, "abc.jpg"),
            "http://localhost:9000/graymill/processed-images/abc.jpg"
        );
    }

    #[tokio::test]
    async fn test_invalid_keys_rejected() {
        let store = test_store(None).await;
        assert!(matches!(
            store.get(Namespace::Raw, "../secrets").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.exists(Namespace::Raw, "/abs").await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
