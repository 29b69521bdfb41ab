//! Worker binary: wires config, blob store, and queue into the processing
//! worker and runs it until SIGINT/SIGTERM.

use std::sync::Arc;
use std::time::Duration;

use graymill_core::Config;
use graymill_queue::create_queue;
use graymill_storage::create_blob_store;
use graymill_worker::{ImageWorker, WorkerConfig};
use tokio::sync::mpsc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing();

    let config = Config::from_env()?;

    let storage = create_blob_store(&config).await?;
    let queue = create_queue(&config).await?;

    let worker_config = WorkerConfig {
        poll_wait: Duration::from_secs(config.queue_poll_wait_secs.max(1)),
        failure_policy: config.failure_policy,
        ..WorkerConfig::default()
    };
    let worker = Arc::new(ImageWorker::new(storage, queue, worker_config));

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(()).await;
    });

    worker.run(shutdown_rx).await;

    Ok(())
}

fn init_tracing() {
    let console_fmt = tracing_subscriber::fmt::layer();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "graymill=debug".into()))
        .with(console_fmt)
        .init();
}

/// Signal handler for graceful shutdown
///
/// # Panics
/// Panics if the Ctrl+C or SIGTERM handler cannot be installed
/// (unrecoverable system error).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            tracing::info!("Received terminate signal");
        },
    }
}
