//! API binary: serves the upload form, upload endpoint, and gallery.
//!
//! With QUEUE_BACKEND=memory this process is a self-contained development
//! setup only if a worker shares the same queue; in production the API and
//! worker binaries run separately against SQS and a shared bucket.

use std::sync::Arc;

use graymill_api::{build_router, AppState};
use graymill_core::Config;
use graymill_queue::create_queue;
use graymill_storage::create_blob_store;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_tracing();

    let config = Config::from_env()?;

    let storage = create_blob_store(&config).await?;
    let queue = create_queue(&config).await?;
    let state = Arc::new(AppState::new(config.clone(), storage, queue));

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(
        addr = %addr,
        raw_namespace = %config.raw_namespace,
        processed_namespace = %config.processed_namespace,
        max_file_size_mb = config.max_file_size_bytes / 1024 / 1024,
        "Server ready and accepting connections"
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing() {
    let console_fmt = tracing_subscriber::fmt::layer();
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "graymill=debug,tower_http=debug".into()),
        )
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

    tracing::info!("Shutting down gracefully...");
}
