//! Ingest pipeline
//!
//! classify -> probe -> category-specific derivation (settled in parallel)
//! -> persist artifacts. Derivation failures degrade to warnings; storage
//! writes are the only fatal step.

use anyhow::{anyhow, Context};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use atelier_core::models::{
    ArtifactKind, AssetKind, AssetMetadata, AudioMetadata, ClassifiedAsset, DerivedArtifact,
    IngestRequest, IngestResult, ProcessingCategory, VideoMetadata,
};
use atelier_core::{AppError, Config};
use atelier_storage::{keys, Storage, StorageError};

use crate::ai_markers;
use crate::classifier::classify;
use crate::design::DesignRasterizer;
use crate::orchestrator::{settle_all, PendingArtifact, Subtask};
use crate::probe;
use crate::video::FfmpegService;
use crate::watermark::WatermarkTile;

/// Bounding box for the rasterized base of design-file previews.
const DESIGN_RASTER_DIMENSION: u32 = 2048;

/// Everything derivation produced for one asset, before any storage write.
struct DerivationOutcome {
    original: PendingArtifact,
    artifacts: Vec<PendingArtifact>,
    metadata: AssetMetadata,
    ai_generated: bool,
    warnings: Vec<String>,
}

pub struct IngestPipeline {
    storage: Arc<dyn Storage>,
    ffmpeg: FfmpegService,
    rasterizer: DesignRasterizer,
    tile: Arc<WatermarkTile>,
    thumbnail_max_dimension: u32,
    preview_clip_fallback_secs: f64,
}

impl IngestPipeline {
    pub fn new(config: &Config, storage: Arc<dyn Storage>) -> Result<Self, AppError> {
        let timeout = Duration::from_secs(config.tool_timeout_secs);
        let ffmpeg = FfmpegService::new(
            config.ffmpeg_path.clone(),
            config.ffprobe_path.clone(),
            timeout,
        )
        .map_err(AppError::from)?;
        let rasterizer = DesignRasterizer::new(config.magick_path.clone(), timeout);
        let tile = Arc::new(WatermarkTile::new(
            &config.watermark_text,
            config.watermark_font_path.as_deref(),
        ));

        Ok(Self {
            storage,
            ffmpeg,
            rasterizer,
            tile,
            thumbnail_max_dimension: config.thumbnail_max_dimension,
            preview_clip_fallback_secs: config.preview_clip_fallback_secs,
        })
    }

    /// Run the full inline pipeline: classify, derive, persist, respond.
    #[tracing::instrument(skip(self, request), fields(filename = %request.filename, size_bytes = request.data.len()))]
    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestResult, AppError> {
        let asset = classify(&request.filename, &request.content_type);

        tracing::info!(
            category = %asset.category,
            content_type = %asset.content_type,
            "Asset classified"
        );

        let outcome = self.derive(&asset, request).await;

        self.persist(asset, outcome).await
    }

    /// Deferred path: re-read bytes from storage and run the identical
    /// pipeline. The pending upload stays at its incoming key; derived
    /// artifacts get fresh asset-scoped keys.
    #[tracing::instrument(skip(self), fields(key = %storage_key))]
    pub async fn ingest_from_storage(
        &self,
        storage_key: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<IngestResult, AppError> {
        let data = self.storage.download(storage_key).await.map_err(|e| match e {
            StorageError::NotFound(key) => {
                AppError::NotFound(format!("No uploaded object at {}", key))
            }
            other => AppError::Storage(other.to_string()),
        })?;

        self.ingest(IngestRequest {
            data,
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            kind: AssetKind::Resource,
            no_watermark: false,
            companion_thumbnail: None,
        })
        .await
    }

    /// Write the original and every derived artifact; any write failure is
    /// fatal because the caller cannot catalog a resource it cannot address.
    async fn persist(
        &self,
        asset: ClassifiedAsset,
        outcome: DerivationOutcome,
    ) -> Result<IngestResult, AppError> {
        let original_key = keys::original_key(&outcome.original.extension);
        let stem = keys::key_stem(&original_key).to_string();

        let mut records = Vec::with_capacity(outcome.artifacts.len() + 1);

        let url = self
            .storage
            .upload_with_key(
                &original_key,
                outcome.original.bytes.clone(),
                &outcome.original.content_type,
            )
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        records.push(DerivedArtifact {
            kind: ArtifactKind::Original,
            storage_key: original_key,
            url,
            content_type: outcome.original.content_type,
            byte_size: outcome.original.bytes.len() as u64,
        });

        for artifact in outcome.artifacts {
            let key = match artifact.kind {
                ArtifactKind::Original => keys::original_key(&artifact.extension),
                ArtifactKind::Preview => keys::preview_key(&stem, &artifact.extension),
                ArtifactKind::Thumbnail => keys::thumbnail_key(&stem, &artifact.extension),
                ArtifactKind::VideoPreviewClip => keys::clip_key(&stem, &artifact.extension),
            };

            let url = self
                .storage
                .upload_with_key(&key, artifact.bytes.clone(), &artifact.content_type)
                .await
                .map_err(|e| AppError::Storage(e.to_string()))?;

            records.push(DerivedArtifact {
                kind: artifact.kind,
                storage_key: key,
                url,
                content_type: artifact.content_type,
                byte_size: artifact.bytes.len() as u64,
            });
        }

        Ok(IngestResult {
            asset,
            artifacts: records,
            metadata: outcome.metadata,
            ai_generated: outcome.ai_generated,
            warnings: outcome.warnings,
        })
    }

    async fn derive(&self, asset: &ClassifiedAsset, request: IngestRequest) -> DerivationOutcome {
        match asset.category {
            ProcessingCategory::Image | ProcessingCategory::Png => {
                self.derive_image(asset, request).await
            }
            ProcessingCategory::Video => self.derive_video(asset, request).await,
            ProcessingCategory::Audio => self.derive_audio(asset, request).await,
            ProcessingCategory::Design => self.derive_design(asset, request).await,
            ProcessingCategory::Archive | ProcessingCategory::Font | ProcessingCategory::Other => {
                // Opaque blobs: store the original, derive nothing.
                DerivationOutcome {
                    original: store_as_is(asset, request.data),
                    artifacts: Vec::new(),
                    metadata: AssetMetadata::None,
                    ai_generated: false,
                    warnings: Vec::new(),
                }
            }
        }
    }

    async fn derive_image(
        &self,
        asset: &ClassifiedAsset,
        request: IngestRequest,
    ) -> DerivationOutcome {
        let mut warnings = Vec::new();

        let metadata = match probe::probe_image(&request.data) {
            Ok(meta) => AssetMetadata::Image(meta),
            Err(e) => {
                warnings.push(format!("metadata: {}", e));
                AssetMetadata::None
            }
        };

        // Advisory only, and only for primary resources.
        let ai_generated =
            request.kind == AssetKind::Resource && ai_markers::detect(&request.data);

        let tile = Arc::clone(&self.tile);
        let preview_data = request.data.clone();
        let preview = Subtask::new(
            "preview",
            Box::pin(async move {
                let result = tokio::task::spawn_blocking(move || tile.apply(&preview_data))
                    .await
                    .map_err(|e| anyhow!("watermark task aborted: {}", e))??;
                Ok(Some(PendingArtifact {
                    kind: ArtifactKind::Preview,
                    bytes: result.bytes,
                    content_type: result.content_type.to_string(),
                    extension: result.extension.to_string(),
                }))
            }),
        );

        let tile = Arc::clone(&self.tile);
        let thumb_data = request.data.clone();
        let max_dim = self.thumbnail_max_dimension;
        let thumbnail = Subtask::new(
            "thumbnail",
            Box::pin(async move {
                let result =
                    tokio::task::spawn_blocking(move || tile.apply_resized(&thumb_data, max_dim))
                        .await
                        .map_err(|e| anyhow!("watermark task aborted: {}", e))??;
                Ok(Some(PendingArtifact {
                    kind: ArtifactKind::Thumbnail,
                    bytes: result.bytes,
                    content_type: result.content_type.to_string(),
                    extension: result.extension.to_string(),
                }))
            }),
        );

        let (artifacts, mut task_warnings) = settle_all(vec![preview, thumbnail]).await;
        warnings.append(&mut task_warnings);

        DerivationOutcome {
            original: store_as_is(asset, request.data),
            artifacts,
            metadata,
            ai_generated,
            warnings,
        }
    }

    async fn derive_video(
        &self,
        asset: &ClassifiedAsset,
        request: IngestRequest,
    ) -> DerivationOutcome {
        let mut warnings = Vec::new();

        // Availability is checked per ingest; the binary may come and go.
        if !self.ffmpeg.is_available() {
            warnings.push(
                "video: transcoding tool unavailable, stored original without derivation"
                    .to_string(),
            );
            return DerivationOutcome {
                original: store_as_is(asset, request.data),
                artifacts: Vec::new(),
                metadata: AssetMetadata::Video(VideoMetadata::default()),
                ai_generated: false,
                warnings,
            };
        }

        let workspace = match tempfile::tempdir().context("Failed to create temp dir") {
            Ok(dir) => dir,
            Err(e) => {
                warnings.push(format!("video: {}", e));
                return DerivationOutcome {
                    original: store_as_is(asset, request.data),
                    artifacts: Vec::new(),
                    metadata: AssetMetadata::Video(VideoMetadata::default()),
                    ai_generated: false,
                    warnings,
                };
            }
        };

        let input_path = workspace.path().join(format!("input.{}", asset.extension));
        if let Err(e) = tokio::fs::write(&input_path, &request.data).await {
            warnings.push(format!("video: failed to stage input: {}", e));
            return DerivationOutcome {
                original: store_as_is(asset, request.data),
                artifacts: Vec::new(),
                metadata: AssetMetadata::Video(VideoMetadata::default()),
                ai_generated: false,
                warnings,
            };
        }

        let mut metadata = match self.ffmpeg.probe_video(&input_path).await {
            Ok(meta) => meta,
            Err(e) => {
                warnings.push(format!("metadata: {}", e));
                VideoMetadata::default()
            }
        };

        // Normalize to mp4. A conversion failure stores the original
        // untouched and skips derivation entirely; previews cut from the
        // unconverted bytes would misrepresent what the served asset is.
        let converted_path = workspace.path().join("converted.mp4");
        let converted = match self
            .ffmpeg
            .convert_to_mp4(&input_path, &converted_path)
            .await
        {
            Ok(()) => match tokio::fs::read(&converted_path).await {
                Ok(bytes) if !bytes.is_empty() => Ok(bytes),
                _ => Err("conversion: produced no output, kept original".to_string()),
            },
            Err(e) => Err(format!("conversion: {}", e)),
        };

        let (source_path, original) = match converted {
            Ok(bytes) => {
                // The converted probe is authoritative for what is served.
                match self.ffmpeg.probe_video(&converted_path).await {
                    Ok(meta) => metadata = meta,
                    Err(e) => warnings.push(format!("metadata: {}", e)),
                }
                (
                    converted_path.clone(),
                    PendingArtifact {
                        kind: ArtifactKind::Original,
                        bytes,
                        content_type: "video/mp4".to_string(),
                        extension: "mp4".to_string(),
                    },
                )
            }
            Err(warning) => {
                warnings.push(warning);
                return DerivationOutcome {
                    original: store_as_is(asset, request.data),
                    artifacts: Vec::new(),
                    metadata: AssetMetadata::Video(metadata),
                    ai_generated: false,
                    warnings,
                };
            }
        };

        // Stage the tile once for the overlay-based subtasks. Opt-out is
        // tracked apart from a staging failure: opted-out outputs are served
        // clean, failed-staging outputs are omitted.
        let staging = if request.no_watermark {
            TileStaging::OptedOut
        } else {
            match self.tile.png_bytes() {
                Ok(bytes) => {
                    let path = workspace.path().join("tile.png");
                    match tokio::fs::write(&path, bytes).await {
                        Ok(()) => TileStaging::Staged(path),
                        Err(e) => {
                            warnings.push(format!("watermark: {}", e));
                            TileStaging::Failed
                        }
                    }
                }
                Err(e) => {
                    warnings.push(format!("watermark: {}", e));
                    TileStaging::Failed
                }
            }
        };

        let clip_duration = metadata
            .duration_seconds
            .map(|d| (d / 2.0).max(0.5))
            .unwrap_or(self.preview_clip_fallback_secs);

        let mut subtasks = Vec::new();

        if !staging.omits_watermarked_outputs() {
            // Preview: watermarked re-encode, or the served bytes untouched
            // when the caller opted out (watermarking may alter framing).
            {
                let ffmpeg = self.ffmpeg.clone();
                let source = source_path.clone();
                let tile = staging.tile_path().map(Path::to_path_buf);
                let out = workspace.path().join("preview.mp4");
                subtasks.push(Subtask::new(
                    "preview",
                    Box::pin(async move {
                        match tile {
                            Some(tile) => {
                                ffmpeg.watermark_video(&source, &tile, &out).await?;
                                let bytes = tokio::fs::read(&out).await?;
                                Ok(Some(video_artifact(ArtifactKind::Preview, bytes)))
                            }
                            None => {
                                let bytes = tokio::fs::read(&source).await?;
                                Ok(Some(video_artifact(ArtifactKind::Preview, bytes)))
                            }
                        }
                    }),
                ));
            }

            // Short clip from the start of the video, animated-thumbnail
            // style.
            {
                let ffmpeg = self.ffmpeg.clone();
                let source = source_path.clone();
                let tile = staging.tile_path().map(Path::to_path_buf);
                let out = workspace.path().join("clip.mp4");
                subtasks.push(Subtask::new(
                    "clip",
                    Box::pin(async move {
                        ffmpeg
                            .extract_clip(&source, clip_duration, tile.as_deref(), &out)
                            .await?;
                        let bytes = tokio::fs::read(&out).await?;
                        Ok(Some(video_artifact(ArtifactKind::VideoPreviewClip, bytes)))
                    }),
                ));
            }
        }

        // Static first-frame thumbnail, the fallback when the clip fails.
        {
            let ffmpeg = self.ffmpeg.clone();
            let source = source_path.clone();
            let out = workspace.path().join("thumbnail.jpg");
            subtasks.push(Subtask::new(
                "thumbnail",
                Box::pin(async move {
                    ffmpeg.first_frame(&source, &out).await?;
                    let bytes = tokio::fs::read(&out).await?;
                    Ok(Some(PendingArtifact {
                        kind: ArtifactKind::Thumbnail,
                        bytes,
                        content_type: "image/jpeg".to_string(),
                        extension: "jpg".to_string(),
                    }))
                }),
            ));
        }

        let (artifacts, mut task_warnings) = settle_all(subtasks).await;
        warnings.append(&mut task_warnings);

        // Temp files live until every subtask has settled.
        drop(workspace);

        DerivationOutcome {
            original,
            artifacts,
            metadata: AssetMetadata::Video(metadata),
            ai_generated: false,
            warnings,
        }
    }

    async fn derive_audio(
        &self,
        asset: &ClassifiedAsset,
        request: IngestRequest,
    ) -> DerivationOutcome {
        let mut warnings = Vec::new();

        let metadata = if self.ffmpeg.is_available() {
            match self.stage_and_probe_audio(&asset.extension, &request.data).await {
                Ok(meta) => meta,
                Err(e) => {
                    warnings.push(format!("metadata: {}", e));
                    AudioMetadata::default()
                }
            }
        } else {
            warnings.push("audio: probing tool unavailable".to_string());
            AudioMetadata::default()
        };

        DerivationOutcome {
            original: store_as_is(asset, request.data),
            artifacts: Vec::new(),
            metadata: AssetMetadata::Audio(metadata),
            ai_generated: false,
            warnings,
        }
    }

    async fn stage_and_probe_audio(
        &self,
        extension: &str,
        data: &[u8],
    ) -> anyhow::Result<AudioMetadata> {
        let workspace = tempfile::tempdir().context("Failed to create temp dir")?;
        let input_path = workspace.path().join(format!("input.{}", extension));
        tokio::fs::write(&input_path, data)
            .await
            .context("Failed to stage input")?;
        self.ffmpeg.probe_audio(&input_path).await
    }

    async fn derive_design(
        &self,
        asset: &ClassifiedAsset,
        request: IngestRequest,
    ) -> DerivationOutcome {
        let mut warnings = Vec::new();

        // Prefer a caller-supplied raster thumbnail over rasterizing the
        // design file ourselves.
        let raster = match &request.companion_thumbnail {
            Some(bytes) => Ok(bytes.clone()),
            None => {
                self.rasterizer
                    .rasterize(&request.data, &asset.extension, DESIGN_RASTER_DIMENSION)
                    .await
            }
        };

        let artifacts = match raster {
            Ok(raster) => {
                let tile = Arc::clone(&self.tile);
                let preview_data = raster.clone();
                let preview = Subtask::new(
                    "preview",
                    Box::pin(async move {
                        let result =
                            tokio::task::spawn_blocking(move || tile.apply(&preview_data))
                                .await
                                .map_err(|e| anyhow!("watermark task aborted: {}", e))??;
                        Ok(Some(PendingArtifact {
                            kind: ArtifactKind::Preview,
                            bytes: result.bytes,
                            content_type: result.content_type.to_string(),
                            extension: result.extension.to_string(),
                        }))
                    }),
                );

                let tile = Arc::clone(&self.tile);
                let max_dim = self.thumbnail_max_dimension;
                let thumbnail = Subtask::new(
                    "thumbnail",
                    Box::pin(async move {
                        let result = tokio::task::spawn_blocking(move || {
                            tile.apply_resized(&raster, max_dim)
                        })
                        .await
                        .map_err(|e| anyhow!("watermark task aborted: {}", e))??;
                        Ok(Some(PendingArtifact {
                            kind: ArtifactKind::Thumbnail,
                            bytes: result.bytes,
                            content_type: result.content_type.to_string(),
                            extension: result.extension.to_string(),
                        }))
                    }),
                );

                let (artifacts, mut task_warnings) = settle_all(vec![preview, thumbnail]).await;
                warnings.append(&mut task_warnings);
                artifacts
            }
            Err(e) => {
                warnings.push(format!("rasterize: {}", e));
                Vec::new()
            }
        };

        DerivationOutcome {
            original: store_as_is(asset, request.data),
            artifacts,
            metadata: AssetMetadata::None,
            ai_generated: false,
            warnings,
        }
    }
}

/// Outcome of staging the watermark tile for the ffmpeg overlay inputs.
///
/// Opt-out and failure both leave no tile on disk but mean different things:
/// an opt-out serves clean outputs, a failure omits the outputs that would
/// have carried the watermark.
#[derive(Debug)]
enum TileStaging {
    OptedOut,
    Staged(PathBuf),
    Failed,
}

impl TileStaging {
    fn tile_path(&self) -> Option<&Path> {
        match self {
            TileStaging::Staged(path) => Some(path),
            _ => None,
        }
    }

    fn omits_watermarked_outputs(&self) -> bool {
        matches!(self, TileStaging::Failed)
    }
}

fn store_as_is(asset: &ClassifiedAsset, data: Vec<u8>) -> PendingArtifact {
    PendingArtifact {
        kind: ArtifactKind::Original,
        bytes: data,
        content_type: asset.content_type.clone(),
        extension: asset.extension.clone(),
    }
}

fn video_artifact(kind: ArtifactKind, bytes: Vec<u8>) -> PendingArtifact {
    PendingArtifact {
        kind,
        bytes,
        content_type: "video/mp4".to_string(),
        extension: "mp4".to_string(),
    }
}
