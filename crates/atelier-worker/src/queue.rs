//! Deferred job queue backends.

use anyhow::{Context, Result};
use async_trait::async_trait;
use atelier_core::models::DeferredJob;
use std::collections::VecDeque;
use tokio::sync::Mutex;

/// Queue of deferred derivation jobs. Each job is consumed exactly once.
#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job: &DeferredJob) -> Result<()>;

    /// Take the next job, if any. Non-blocking; the consumer polls.
    async fn dequeue(&self) -> Result<Option<DeferredJob>>;
}

/// SQS-backed queue for production deployments.
#[cfg(feature = "sqs")]
pub struct SqsJobQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

#[cfg(feature = "sqs")]
impl SqsJobQueue {
    pub async fn new(queue_url: String) -> Self {
        let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self {
            client: aws_sdk_sqs::Client::new(&aws_config),
            queue_url,
        }
    }
}

#[cfg(feature = "sqs")]
#[async_trait]
impl JobQueue for SqsJobQueue {
    async fn enqueue(&self, job: &DeferredJob) -> Result<()> {
        let body = serde_json::to_string(job).context("Failed to serialize job")?;

        self.client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .context("Failed to send SQS message")?;

        tracing::info!(job_id = %job.id, key = %job.storage_key, "Deferred job enqueued");
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<DeferredJob>> {
        let response = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(1)
            .send()
            .await
            .context("Failed to receive SQS message")?;

        let Some(message) = response.messages().first().cloned() else {
            return Ok(None);
        };

        let job: DeferredJob = message
            .body()
            .map(serde_json::from_str)
            .transpose()
            .context("Failed to parse job body")?
            .context("SQS message had no body")?;

        // Delete on receipt; retries are re-enqueued by the consumer.
        if let Some(receipt) = message.receipt_handle() {
            self.client
                .delete_message()
                .queue_url(&self.queue_url)
                .receipt_handle(receipt)
                .send()
                .await
                .context("Failed to delete SQS message")?;
        }

        Ok(Some(job))
    }
}

/// In-memory queue for tests and single-process deployments.
#[derive(Default)]
pub struct MemoryJobQueue {
    jobs: Mutex<VecDeque<DeferredJob>>,
}

impl MemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.jobs.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.lock().await.is_empty()
    }
}

#[async_trait]
impl JobQueue for MemoryJobQueue {
    async fn enqueue(&self, job: &DeferredJob) -> Result<()> {
        self.jobs.lock().await.push_back(job.clone());
        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<DeferredJob>> {
        Ok(self.jobs.lock().await.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_queue_fifo_exactly_once() {
        let queue = MemoryJobQueue::new();

        let first = DeferredJob::new(
            "incoming/a.mov".to_string(),
            "a.mov".to_string(),
            "video/quicktime".to_string(),
        );
        let second = DeferredJob::new(
            "incoming/b.jpg".to_string(),
            "b.jpg".to_string(),
            "image/jpeg".to_string(),
        );

        queue.enqueue(&first).await.unwrap();
        queue.enqueue(&second).await.unwrap();

        assert_eq!(queue.dequeue().await.unwrap().unwrap().id, first.id);
        assert_eq!(queue.dequeue().await.unwrap().unwrap().id, second.id);
        assert!(queue.dequeue().await.unwrap().is_none());
    }
}
