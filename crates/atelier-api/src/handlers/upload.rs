use axum::{
    extract::{Multipart, State},
    http::{header, HeaderMap},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use atelier_core::models::{
    ArtifactKind, AssetKind, AudioMetadata, ImageMetadata, IngestRequest, VideoMetadata,
};
use atelier_core::AppError;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub url: String,
    pub key: String,
    pub content_type: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clip_url: Option<String>,
    pub is_ai_generated: bool,
    pub was_processed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_metadata: Option<ImageMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_metadata: Option<VideoMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_metadata: Option<AudioMetadata>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

/// Inline multipart upload.
///
/// Accepts the asset in the `file` field, runs classification and derivation,
/// and returns URLs for the original plus any previews. Files whose declared
/// size exceeds the inline limit are rejected with 413 before the body is
/// parsed; the response body tells the client to use the direct-upload flow.
///
/// Optional fields:
/// * `type` - "resource" (default) or "thumbnail"
/// * `noWatermark` - "true" to skip the watermark overlay
/// * `thumbnail` - companion raster used for non-previewable formats (e.g. PSD)
#[utoipa::path(
    post,
    path = "/upload",
    tag = "uploads",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Asset ingested", body = UploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 413, description = "File exceeds inline upload limit", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, headers, multipart), fields(operation = "upload"))]
pub async fn upload(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let limit = state.config.inline_upload_max_bytes;

    // Reject oversize uploads from the declared length before reading the body.
    // Strictly greater: a file of exactly the limit is accepted.
    if let Some(declared) = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
    {
        if declared > limit {
            return Err(HttpAppError(AppError::PayloadTooLarge {
                size: declared,
                limit,
            }));
        }
    }

    let mut file: Option<(Vec<u8>, String, String)> = None;
    let mut kind = AssetKind::Resource;
    let mut no_watermark = false;
    let mut companion_thumbnail: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::InvalidInput(format!("Invalid multipart body: {}", e)))?
    {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("upload.bin").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Failed to read file: {}", e)))?;
                file = Some((data.to_vec(), filename, content_type));
            }
            "type" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::InvalidInput(format!("Invalid type field: {}", e)))?;
                kind = match value.as_str() {
                    "" | "resource" => AssetKind::Resource,
                    "thumbnail" => AssetKind::Thumbnail,
                    other => {
                        return Err(HttpAppError(AppError::InvalidInput(format!(
                            "Invalid type '{}'. Must be 'resource' or 'thumbnail'",
                            other
                        ))))
                    }
                };
            }
            "noWatermark" => {
                let value = field.text().await.unwrap_or_default();
                no_watermark = value == "true" || value == "1";
            }
            "thumbnail" => {
                let data = field.bytes().await.map_err(|e| {
                    AppError::InvalidInput(format!("Failed to read thumbnail: {}", e))
                })?;
                companion_thumbnail = Some(data.to_vec());
            }
            _ => {}
        }
    }

    let (data, filename, content_type) =
        file.ok_or_else(|| AppError::InvalidInput("Missing 'file' field".to_string()))?;

    if data.is_empty() {
        return Err(HttpAppError(AppError::InvalidInput(
            "File is empty".to_string(),
        )));
    }

    // The header check above covers well-behaved clients; this covers the rest.
    let size = data.len() as u64;
    if size > limit {
        return Err(HttpAppError(AppError::PayloadTooLarge { size, limit }));
    }

    let result = state
        .pipeline
        .ingest(IngestRequest {
            data,
            filename,
            content_type,
            kind,
            no_watermark,
            companion_thumbnail,
        })
        .await?;

    let original = result
        .artifact(ArtifactKind::Original)
        .ok_or_else(|| AppError::Internal("Ingest produced no original artifact".to_string()))?;

    Ok(Json(UploadResponse {
        url: original.url.clone(),
        key: original.storage_key.clone(),
        content_type: original.content_type.clone(),
        size: original.byte_size,
        preview_url: result
            .artifact(ArtifactKind::Preview)
            .map(|a| a.url.clone()),
        thumbnail_url: result
            .artifact(ArtifactKind::Thumbnail)
            .map(|a| a.url.clone()),
        clip_url: result
            .artifact(ArtifactKind::VideoPreviewClip)
            .map(|a| a.url.clone()),
        is_ai_generated: result.ai_generated,
        was_processed: result.was_processed(),
        image_metadata: result.metadata.as_image().cloned(),
        video_metadata: result.metadata.as_video().cloned(),
        audio_metadata: result.metadata.as_audio().cloned(),
        warnings: result.warnings.clone(),
    }))
}
