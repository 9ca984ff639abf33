//! Libros Server - Main entry point

use anyhow::Result;
use libros_common::logging::{init_logging, LogConfig};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tracing::{info, warn};

use libros_server::{
    api,
    config::Config,
    features::FeatureState,
    ingest::{EventHost, IngestionPipeline},
    storage::S3BlobStore,
    store::PgDocumentStore,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging with configuration from environment
    let log_config = LogConfig::builder()
        .log_file_prefix("libros-server")
        .filter_directives("libros_server=debug,tower_http=debug,axum=info,sqlx=warn")
        .build();

    // Environment variables take precedence
    let log_config = log_config.merge_env()?;

    init_logging(&log_config)?;

    info!("Starting Libros Server");

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    let store = PgDocumentStore::connect(&config.database, config.pipeline.max_batch_ops).await?;
    store.migrate().await?;
    let store = Arc::new(store);

    let blobs = Arc::new(S3BlobStore::connect(config.storage.clone()).await);
    info!("Storage client initialized");

    let pipeline = Arc::new(IngestionPipeline::new(
        blobs,
        store.clone(),
        config.pipeline.clone(),
    ));
    let host = EventHost::new(pipeline, &config.host);

    let state = FeatureState {
        store,
        host: host.clone(),
        artifact_prefix: config.pipeline.artifact_prefix.clone(),
    };

    let app = api::create_router(state, &config.cors);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let timeout = Duration::from_secs(config.server.shutdown_timeout_secs);
    info!("Waiting up to {:?} for background deliveries", timeout);
    if !host.shutdown(timeout).await {
        warn!("Exiting with deliveries still in flight; they will not be redelivered");
    }

    info!("Server shut down gracefully");

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
