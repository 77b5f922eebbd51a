pub mod asset;
pub mod job;
pub mod metadata;

pub use asset::{
    ArtifactKind, AssetKind, ClassifiedAsset, DerivedArtifact, IngestRequest, IngestResult,
    ProcessingCategory,
};
pub use job::DeferredJob;
pub use metadata::{AssetMetadata, AudioMetadata, ImageMetadata, VideoMetadata};
