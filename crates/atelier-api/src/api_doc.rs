//! OpenAPI documentation.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use atelier_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Atelier API",
        version = "0.1.0",
        description = "Creative-asset ingest API: inline multipart upload with derivation (previews, thumbnails, clips), and a presigned direct-upload flow for large files."
    ),
    paths(
        handlers::upload::upload,
        handlers::direct_upload::direct_upload,
        handlers::direct_upload::complete_direct_upload,
        handlers::health::health,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::health::HealthResponse,
        handlers::upload::UploadResponse,
        handlers::direct_upload::DirectUploadRequest,
        handlers::direct_upload::DirectUploadResponse,
        handlers::direct_upload::CompleteDirectUploadRequest,
        handlers::direct_upload::CompleteDirectUploadResponse,
        models::ImageMetadata,
        models::VideoMetadata,
        models::AudioMetadata,
    )),
    tags(
        (name = "uploads", description = "Asset upload and ingestion"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
