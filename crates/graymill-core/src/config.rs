//! Configuration module
//!
//! Immutable configuration for both binaries, built once from the
//! environment and passed into components at construction. No component
//! reads ambient state after startup.

use std::env;
use std::str::FromStr;

const DEFAULT_SERVER_PORT: u16 = 8080;
const DEFAULT_MAX_FILE_SIZE_MB: usize = 10;
const DEFAULT_RAW_NAMESPACE: &str = "raw-images";
const DEFAULT_PROCESSED_NAMESPACE: &str = "processed-images";
const DEFAULT_QUEUE_POLL_WAIT_SECS: u64 = 5;
const DEFAULT_WORKER_MAX_DELIVERIES: u32 = 5;

/// Blob store backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Local,
    S3,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            other => Err(anyhow::anyhow!("Unknown storage backend: {}", other)),
        }
    }
}

/// Queue backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueBackend {
    Memory,
    Sqs,
}

impl FromStr for QueueBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(QueueBackend::Memory),
            "sqs" => Ok(QueueBackend::Sqs),
            other => Err(anyhow::anyhow!("Unknown queue backend: {}", other)),
        }
    }
}

/// Worker behavior when a job fails (missing raw object, transform or
/// publish error).
///
/// `DropOnFailure` acknowledges and accepts data loss for that job, trading
/// reliability for guaranteed queue drain and no poison-message loops.
/// `RetryThenDeadLetter` releases the message for redelivery until
/// `max_deliveries` is reached, then dead-letters it. Malformed and
/// duplicate messages are always acknowledged regardless of policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    DropOnFailure,
    RetryThenDeadLetter { max_deliveries: u32 },
}

/// Immutable application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub max_file_size_bytes: usize,

    // Blob store
    pub storage_backend: StorageBackend,
    pub raw_namespace: String,
    pub processed_namespace: String,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>,

    // Queue
    pub queue_backend: QueueBackend,
    pub sqs_queue_url: Option<String>,
    pub sqs_dead_letter_queue_url: Option<String>,
    pub queue_poll_wait_secs: u64,

    // Worker
    pub failure_policy: FailurePolicy,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| DEFAULT_SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(DEFAULT_MAX_FILE_SIZE_MB);

        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .parse()?;

        let queue_backend = env::var("QUEUE_BACKEND")
            .unwrap_or_else(|_| "memory".to_string())
            .parse()?;

        let failure_policy = match env::var("WORKER_FAILURE_POLICY")
            .unwrap_or_else(|_| "drop".to_string())
            .to_lowercase()
            .as_str()
        {
            "drop" => FailurePolicy::DropOnFailure,
            "retry" => FailurePolicy::RetryThenDeadLetter {
                max_deliveries: env::var("WORKER_MAX_DELIVERIES")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_WORKER_MAX_DELIVERIES),
            },
            other => {
                return Err(anyhow::anyhow!(
                    "WORKER_FAILURE_POLICY must be 'drop' or 'retry', got '{}'",
                    other
                ))
            }
        };

        Ok(Config {
            server_port,
            environment,
            max_file_size_bytes: max_file_size_mb * 1024 * 1024,
            storage_backend,
            raw_namespace: env::var("RAW_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_RAW_NAMESPACE.to_string()),
            processed_namespace: env::var("PROCESSED_NAMESPACE")
                .unwrap_or_else(|_| DEFAULT_PROCESSED_NAMESPACE.to_string()),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok().or(env::var("AWS_REGION").ok()),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            queue_backend,
            sqs_queue_url: env::var("SQS_QUEUE_URL").ok(),
            sqs_dead_letter_queue_url: env::var("SQS_DEAD_LETTER_QUEUE_URL").ok(),
            queue_poll_wait_secs: env::var("QUEUE_POLL_WAIT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_QUEUE_POLL_WAIT_SECS),
            failure_policy,
        })
    }

    /// Test configuration: local storage under the given path, in-memory
    /// queue, drop-on-failure policy.
    pub fn for_tests(local_storage_path: impl Into<String>) -> Self {
        Config {
            server_port: 0,
            environment: "test".to_string(),
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            storage_backend: StorageBackend::Local,
            raw_namespace: DEFAULT_RAW_NAMESPACE.to_string(),
            processed_namespace: DEFAULT_PROCESSED_NAMESPACE.to_string(),
            local_storage_path: Some(local_storage_path.into()),
            local_storage_base_url: Some("http://localhost:8080/files".to_string()),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            queue_backend: QueueBackend::Memory,
            sqs_queue_url: None,
            sqs_dead_letter_queue_url: None,
            queue_poll_wait_secs: 0,
            failure_policy: FailurePolicy::DropOnFailure,
        }
    }
}
