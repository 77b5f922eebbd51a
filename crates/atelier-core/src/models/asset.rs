//! Asset domain types
//!
//! Types flowing through the ingest pipeline: the immutable request, the
//! classification derived from it, and the artifacts produced by derivation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::metadata::AssetMetadata;

/// Processing category driving which derivation sub-tasks run.
///
/// PNG is kept distinct from generic images because it carries a
/// transparency-preservation obligation end to end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingCategory {
    Image,
    Png,
    Video,
    Audio,
    Design,
    Archive,
    Font,
    Other,
}

impl ProcessingCategory {
    /// Categories that run the image watermark/thumbnail derivations.
    pub fn is_raster(&self) -> bool {
        matches!(self, ProcessingCategory::Image | ProcessingCategory::Png)
    }
}

impl std::fmt::Display for ProcessingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProcessingCategory::Image => "image",
            ProcessingCategory::Png => "png",
            ProcessingCategory::Video => "video",
            ProcessingCategory::Audio => "audio",
            ProcessingCategory::Design => "design",
            ProcessingCategory::Archive => "archive",
            ProcessingCategory::Font => "font",
            ProcessingCategory::Other => "other",
        };
        write!(f, "{}", s)
    }
}

/// Whether the submitted file is a primary resource or a standalone thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Resource,
    Thumbnail,
}

/// Canonical identity of an asset, derived once from the request and never
/// mutated afterward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ClassifiedAsset {
    pub content_type: String,
    pub extension: String,
    pub category: ProcessingCategory,
}

/// Kind of derived output stored independently of the source asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Original,
    Preview,
    Thumbnail,
    VideoPreviewClip,
}

/// A single derived output written to storage.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DerivedArtifact {
    pub kind: ArtifactKind,
    pub storage_key: String,
    pub url: String,
    pub content_type: String,
    pub byte_size: u64,
}

/// An ingest request. Immutable once accepted.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub data: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub kind: AssetKind,
    pub no_watermark: bool,
    /// Raster thumbnail submitted alongside a non-previewable asset
    /// (e.g. a PSD). Preferred over rasterizing the asset itself.
    pub companion_thumbnail: Option<Vec<u8>>,
}

/// Outcome of one ingest: the classification, every artifact produced, and
/// best-effort metadata. Derivation failures surface as warnings, not errors.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct IngestResult {
    pub asset: ClassifiedAsset,
    pub artifacts: Vec<DerivedArtifact>,
    pub metadata: AssetMetadata,
    pub ai_generated: bool,
    pub warnings: Vec<String>,
}

impl IngestResult {
    /// First artifact of the given kind, if one was produced.
    pub fn artifact(&self, kind: ArtifactKind) -> Option<&DerivedArtifact> {
        self.artifacts.iter().find(|a| a.kind == kind)
    }

    /// True iff a preview or thumbnail artifact exists. A clip on its own
    /// does not count; the flag mirrors whether a preview or thumbnail URL
    /// is reported.
    pub fn was_processed(&self) -> bool {
        self.artifacts
            .iter()
            .any(|a| matches!(a.kind, ArtifactKind::Preview | ArtifactKind::Thumbnail))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(kind: ArtifactKind) -> DerivedArtifact {
        DerivedArtifact {
            kind,
            storage_key: "assets/test".to_string(),
            url: "http://localhost/assets/test".to_string(),
            content_type: "image/jpeg".to_string(),
            byte_size: 42,
        }
    }

    fn result_with(artifacts: Vec<DerivedArtifact>) -> IngestResult {
        IngestResult {
            asset: ClassifiedAsset {
                content_type: "image/jpeg".to_string(),
                extension: "jpg".to_string(),
                category: ProcessingCategory::Image,
            },
            artifacts,
            metadata: AssetMetadata::None,
            ai_generated: false,
            warnings: vec![],
        }
    }

    #[test]
    fn test_was_processed_requires_derived_artifact() {
        let original_only = result_with(vec![artifact(ArtifactKind::Original)]);
        assert!(!original_only.was_processed());

        let with_preview = result_with(vec![
            artifact(ArtifactKind::Original),
            artifact(ArtifactKind::Preview),
        ]);
        assert!(with_preview.was_processed());
    }

    #[test]
    fn test_clip_alone_is_not_processed() {
        let clip_only = result_with(vec![
            artifact(ArtifactKind::Original),
            artifact(ArtifactKind::VideoPreviewClip),
        ]);
        assert!(!clip_only.was_processed());
    }

    #[test]
    fn test_artifact_lookup_by_kind() {
        let result = result_with(vec![
            artifact(ArtifactKind::Original),
            artifact(ArtifactKind::Thumbnail),
        ]);
        assert!(result.artifact(ArtifactKind::Thumbnail).is_some());
        assert!(result.artifact(ArtifactKind::Preview).is_none());
    }
}
