//! Application state shared across handlers.

use std::sync::Arc;

use atelier_core::Config;
use atelier_processing::IngestPipeline;
use atelier_storage::Storage;
use atelier_worker::JobQueue;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub pipeline: Arc<IngestPipeline>,
    pub queue: Arc<dyn JobQueue>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        pipeline: Arc<IngestPipeline>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            config,
            storage,
            pipeline,
            queue,
        }
    }
}
