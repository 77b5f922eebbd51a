use std::time::Duration;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use atelier_core::constants::PRESIGNED_PUT_EXPIRY_SECS;
use atelier_core::models::DeferredJob;
use atelier_core::{AppError, StorageBackend};
use atelier_storage::keys;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectUploadRequest {
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectUploadResponse {
    pub key: String,
    pub upload_url: String,
    pub expires_in_seconds: u64,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDirectUploadRequest {
    pub key: String,
    pub filename: String,
    pub content_type: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteDirectUploadResponse {
    pub job_id: Uuid,
    pub status: &'static str,
}

/// Issue a presigned PUT URL for a large-file direct upload.
///
/// The client PUTs the file to the returned URL, then calls the complete
/// endpoint to queue derivation.
#[utoipa::path(
    post,
    path = "/uploads/direct",
    tag = "uploads",
    request_body = DirectUploadRequest,
    responses(
        (status = 200, description = "Presigned URL issued", body = DirectUploadResponse),
        (status = 400, description = "Invalid input or unsupported backend", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "direct_upload"))]
pub async fn direct_upload(
    State(state): State<AppState>,
    Json(request): Json<DirectUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    if state.storage.backend_type() != StorageBackend::S3 {
        return Err(HttpAppError(AppError::BadRequest(
            "Direct uploads are only available with the S3 storage backend. Use the inline upload endpoint instead.".to_string(),
        )));
    }

    if request.filename.is_empty() {
        return Err(HttpAppError(AppError::InvalidInput(
            "Missing filename".to_string(),
        )));
    }

    let extension = request
        .filename
        .rsplit('.')
        .next()
        .filter(|ext| !ext.is_empty() && *ext != request.filename)
        .unwrap_or("bin")
        .to_lowercase();
    let key = keys::incoming_key(&extension);

    let upload_url = state
        .storage
        .presigned_put_url(
            &key,
            &request.content_type,
            Duration::from_secs(PRESIGNED_PUT_EXPIRY_SECS),
        )
        .await?;

    tracing::info!(key = %key, filename = %request.filename, "Issued direct upload URL");

    Ok(Json(DirectUploadResponse {
        key,
        upload_url,
        expires_in_seconds: PRESIGNED_PUT_EXPIRY_SECS,
    }))
}

/// Complete a direct upload by queueing derivation for the uploaded object.
#[utoipa::path(
    post,
    path = "/uploads/direct/complete",
    tag = "uploads",
    request_body = CompleteDirectUploadRequest,
    responses(
        (status = 202, description = "Derivation queued", body = CompleteDirectUploadResponse),
        (status = 400, description = "Invalid input", body = ErrorResponse),
        (status = 404, description = "Uploaded object not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, request), fields(operation = "complete_direct_upload"))]
pub async fn complete_direct_upload(
    State(state): State<AppState>,
    Json(request): Json<CompleteDirectUploadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    // Only keys we issued are accepted; anything else could point a derivation
    // job at arbitrary stored objects.
    if !request.key.starts_with("incoming/") {
        return Err(HttpAppError(AppError::InvalidInput(format!(
            "Invalid upload key: {}",
            request.key
        ))));
    }

    let exists = state.storage.exists(&request.key).await?;
    if !exists {
        return Err(HttpAppError(AppError::NotFound(format!(
            "No uploaded object at key: {}",
            request.key
        ))));
    }

    let job = DeferredJob::new(
        request.key.clone(),
        request.filename.clone(),
        request.content_type.clone(),
    );
    let job_id = job.id;

    state
        .queue
        .enqueue(&job)
        .await
        .map_err(|e| AppError::Internal(format!("Failed to enqueue job: {}", e)))?;

    tracing::info!(job_id = %job_id, key = %request.key, "Direct upload queued for derivation");

    Ok((
        StatusCode::ACCEPTED,
        Json(CompleteDirectUploadResponse {
            job_id,
            status: "queued",
        }),
    ))
}
