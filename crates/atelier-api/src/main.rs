use std::sync::Arc;

use anyhow::Result;

use atelier_api::{routes, state::AppState, telemetry};
use atelier_core::Config;
use atelier_processing::IngestPipeline;
use atelier_worker::{JobConsumer, JobConsumerConfig, JobQueue, MemoryJobQueue};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_telemetry();

    let config = Config::from_env()?;

    let storage = atelier_storage::create_storage(&config).await?;
    let pipeline = Arc::new(IngestPipeline::new(&config, Arc::clone(&storage))?);
    let queue = build_queue(&config).await;

    let consumer = JobConsumer::start(
        Arc::clone(&queue),
        Arc::clone(&pipeline),
        JobConsumerConfig {
            poll_interval_ms: config.job_poll_interval_ms,
            max_retries: config.job_max_retries,
            job_timeout_secs: config.job_timeout_secs,
        },
    );

    let state = AppState::new(config.clone(), storage, pipeline, queue);
    let app = routes::setup_routes(&config, state)?;

    let addr = format!("0.0.0.0:{}", config.server_port);
    tracing::info!(addr = %addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(
        inline_upload_max_bytes = config.inline_upload_max_bytes,
        ffmpeg_path = %config.ffmpeg_path,
        magick_path = %config.magick_path,
        "Server ready and accepting connections"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    consumer.shutdown().await;

    Ok(())
}

#[cfg(feature = "sqs")]
async fn build_queue(config: &Config) -> Arc<dyn JobQueue> {
    match &config.sqs_queue_url {
        Some(url) => {
            tracing::info!(queue_url = %url, "Using SQS job queue");
            Arc::new(atelier_worker::SqsJobQueue::new(url.clone()).await)
        }
        None => {
            tracing::info!("Using in-memory job queue");
            Arc::new(MemoryJobQueue::new())
        }
    }
}

#[cfg(not(feature = "sqs"))]
async fn build_queue(config: &Config) -> Arc<dyn JobQueue> {
    if config.sqs_queue_url.is_some() {
        tracing::warn!("SQS_QUEUE_URL set but the sqs feature is not enabled, using in-memory queue");
    }
    Arc::new(MemoryJobQueue::new())
}

/// Signal handler for graceful shutdown
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
