//! Deferred job consumer.
//!
//! Polls the queue and runs the same classify/probe/derive pipeline as the
//! inline path. A job that fails is re-enqueued with exponential backoff
//! until its retries are exhausted; completion is reported through logging,
//! and the caller's own persistence layer watches storage for the artifacts.
//!
//! Shutdown: [`JobConsumer::shutdown`] signals the loop to stop; it does not
//! wait for the in-flight job.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

use atelier_core::models::DeferredJob;
use atelier_processing::IngestPipeline;

use crate::queue::JobQueue;

/// Maximum delay in seconds before retrying a failed job. Caps exponential
/// backoff so high attempt counts do not produce excessively long delays.
pub const MAX_RETRY_BACKOFF_SECS: u64 = 300;

/// Computes backoff in seconds for a given attempt count (exponential with cap).
#[inline]
pub(crate) fn compute_retry_backoff_seconds(attempts: u32) -> u64 {
    (2_u64.pow(attempts)).min(MAX_RETRY_BACKOFF_SECS)
}

#[derive(Clone)]
pub struct JobConsumerConfig {
    pub poll_interval_ms: u64,
    pub max_retries: u32,
    pub job_timeout_secs: u64,
}

impl Default for JobConsumerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            max_retries: 3,
            job_timeout_secs: 600,
        }
    }
}

pub struct JobConsumer {
    shutdown_tx: mpsc::Sender<()>,
}

impl JobConsumer {
    /// Start the consumer loop in the background.
    pub fn start(
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<IngestPipeline>,
        config: JobConsumerConfig,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::run(queue, pipeline, config, shutdown_rx).await;
        });

        Self { shutdown_tx }
    }

    /// Signal the consumer loop to stop.
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
    }

    async fn run(
        queue: Arc<dyn JobQueue>,
        pipeline: Arc<IngestPipeline>,
        config: JobConsumerConfig,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            poll_interval_ms = config.poll_interval_ms,
            max_retries = config.max_retries,
            "Deferred job consumer started"
        );

        let poll_interval = Duration::from_millis(config.poll_interval_ms);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Deferred job consumer shutting down");
                    break;
                }
                _ = sleep(poll_interval) => {
                    match queue.dequeue().await {
                        Ok(Some(job)) => {
                            Self::handle_job(&queue, &pipeline, &config, job).await;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to poll job queue");
                        }
                    }
                }
            }
        }

        tracing::info!("Deferred job consumer stopped");
    }

    async fn handle_job(
        queue: &Arc<dyn JobQueue>,
        pipeline: &Arc<IngestPipeline>,
        config: &JobConsumerConfig,
        job: DeferredJob,
    ) {
        let start = std::time::Instant::now();
        let timeout = Duration::from_secs(config.job_timeout_secs);

        let outcome = tokio::time::timeout(
            timeout,
            pipeline.ingest_from_storage(&job.storage_key, &job.filename, &job.content_type),
        )
        .await;

        let result: Result<()> = match outcome {
            Ok(Ok(result)) => {
                tracing::info!(
                    job_id = %job.id,
                    key = %job.storage_key,
                    artifacts = result.artifacts.len(),
                    warnings = result.warnings.len(),
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Deferred job completed"
                );
                Ok(())
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(anyhow::anyhow!(
                "job timed out after {} seconds",
                timeout.as_secs()
            )),
        };

        if let Err(e) = result {
            let mut job = job;
            job.attempts += 1;

            if job.attempts > config.max_retries {
                tracing::error!(
                    job_id = %job.id,
                    key = %job.storage_key,
                    attempts = job.attempts,
                    error = %e,
                    "Deferred job failed permanently, retries exhausted"
                );
                return;
            }

            let backoff = compute_retry_backoff_seconds(job.attempts);
            tracing::warn!(
                job_id = %job.id,
                key = %job.storage_key,
                attempts = job.attempts,
                backoff_secs = backoff,
                error = %e,
                "Deferred job failed, scheduling retry"
            );

            let queue = Arc::clone(queue);
            tokio::spawn(async move {
                sleep(Duration::from_secs(backoff)).await;
                if let Err(e) = queue.enqueue(&job).await {
                    tracing::error!(job_id = %job.id, error = %e, "Failed to re-enqueue job");
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::MemoryJobQueue;
    use atelier_core::{Config, StorageBackend};
    use atelier_storage::LocalStorage;
    use std::io::Cursor;

    #[test]
    fn test_retry_backoff_is_exponential_and_capped() {
        assert_eq!(compute_retry_backoff_seconds(1), 2);
        assert_eq!(compute_retry_backoff_seconds(2), 4);
        assert_eq!(compute_retry_backoff_seconds(8), 256);
        assert_eq!(compute_retry_backoff_seconds(9), MAX_RETRY_BACKOFF_SECS);
        assert_eq!(compute_retry_backoff_seconds(10), MAX_RETRY_BACKOFF_SECS);
    }

    fn test_config(storage_dir: &str) -> Config {
        Config {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            environment: "test".to_string(),
            storage_backend: Some(StorageBackend::Local),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some(storage_dir.to_string()),
            local_storage_base_url: Some("http://localhost:4000/files".to_string()),
            inline_upload_max_bytes: 4_500_000,
            ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
            ffprobe_path: "/nonexistent/ffprobe".to_string(),
            magick_path: "/nonexistent/magick".to_string(),
            tool_timeout_secs: 5,
            watermark_text: "PREVIEW".to_string(),
            watermark_font_path: None,
            thumbnail_max_dimension: 256,
            preview_clip_fallback_secs: 5.0,
            sqs_queue_url: None,
            job_max_retries: 1,
            job_poll_interval_ms: 20,
            job_timeout_secs: 30,
        }
    }

    #[tokio::test]
    async fn test_consumer_processes_direct_upload() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_str().unwrap());

        let storage: Arc<dyn atelier_storage::Storage> = Arc::new(
            LocalStorage::new(dir.path(), "http://localhost:4000/files".to_string())
                .await
                .unwrap(),
        );

        // Simulate a completed direct upload.
        let img = image::RgbImage::from_pixel(64, 64, image::Rgb([9, 9, 9]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
            .unwrap();
        storage
            .upload_with_key("incoming/test.jpg", bytes, "image/jpeg")
            .await
            .unwrap();

        let pipeline = Arc::new(
            atelier_processing::IngestPipeline::new(&config, Arc::clone(&storage)).unwrap(),
        );
        let queue = Arc::new(MemoryJobQueue::new());

        queue
            .enqueue(&DeferredJob::new(
                "incoming/test.jpg".to_string(),
                "test.jpg".to_string(),
                "image/jpeg".to_string(),
            ))
            .await
            .unwrap();

        let consumer = JobConsumer::start(
            Arc::clone(&queue) as Arc<dyn JobQueue>,
            pipeline,
            JobConsumerConfig {
                poll_interval_ms: 20,
                max_retries: 1,
                job_timeout_secs: 30,
            },
        );

        // Wait for the job to drain.
        for _ in 0..100 {
            if queue.is_empty().await {
                break;
            }
            sleep(Duration::from_millis(20)).await;
        }
        // Give the in-flight job time to finish its derivations.
        sleep(Duration::from_millis(300)).await;
        consumer.shutdown().await;

        assert!(queue.is_empty().await);
        assert!(storage.exists("incoming/test.jpg").await.unwrap());
    }
}
