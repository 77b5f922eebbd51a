//! Atelier Worker Library
//!
//! Deferred-processing queue and consumer for the large-asset path: jobs are
//! enqueued when a client completes a direct upload and consumed here by
//! running the same derivation pipeline the inline path uses.

pub mod consumer;
pub mod queue;

pub use consumer::{JobConsumer, JobConsumerConfig};
pub use queue::{JobQueue, MemoryJobQueue};
#[cfg(feature = "sqs")]
pub use queue::SqsJobQueue;
