//! Atelier Processing Library
//!
//! The ingest/derive pipeline: format classification, metadata probing,
//! AI-origin detection, watermarking, video transcoding, design-file
//! rasterization and the fault-isolated derivation orchestrator.

pub mod ai_markers;
pub mod classifier;
pub mod design;
pub mod orchestrator;
pub mod pipeline;
pub mod probe;
pub mod video;
pub mod watermark;

pub use classifier::classify;
pub use design::DesignRasterizer;
pub use pipeline::IngestPipeline;
pub use video::FfmpegService;
pub use watermark::WatermarkTile;
