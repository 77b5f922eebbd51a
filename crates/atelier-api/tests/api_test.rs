//! HTTP surface tests over local storage and an in-memory job queue.

use std::io::Cursor;
use std::sync::Arc;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use http::StatusCode;

use atelier_api::routes;
use atelier_api::state::AppState;
use atelier_core::{Config, StorageBackend};
use atelier_processing::IngestPipeline;
use atelier_storage::{LocalStorage, Storage};
use atelier_worker::{JobQueue, MemoryJobQueue};

fn test_config(storage_dir: &str, inline_limit: u64) -> Config {
    Config {
        server_port: 0,
        cors_origins: vec!["*".to_string()],
        environment: "test".to_string(),
        storage_backend: Some(StorageBackend::Local),
        s3_bucket: None,
        s3_region: None,
        s3_endpoint: None,
        aws_region: None,
        local_storage_path: Some(storage_dir.to_string()),
        local_storage_base_url: Some("http://localhost:4000/files".to_string()),
        inline_upload_max_bytes: inline_limit,
        ffmpeg_path: "/nonexistent/ffmpeg".to_string(),
        ffprobe_path: "/nonexistent/ffprobe".to_string(),
        magick_path: "/nonexistent/magick".to_string(),
        tool_timeout_secs: 5,
        watermark_text: "PREVIEW".to_string(),
        watermark_font_path: None,
        thumbnail_max_dimension: 256,
        preview_clip_fallback_secs: 5.0,
        sqs_queue_url: None,
        job_max_retries: 3,
        job_poll_interval_ms: 100,
        job_timeout_secs: 60,
    }
}

struct TestApp {
    server: TestServer,
    storage: Arc<dyn Storage>,
    queue: Arc<MemoryJobQueue>,
    _dir: tempfile::TempDir,
}

async fn test_app(inline_limit: u64) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path().to_str().unwrap(), inline_limit);

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(dir.path(), "http://localhost:4000/files".to_string())
            .await
            .unwrap(),
    );
    let pipeline = Arc::new(IngestPipeline::new(&config, Arc::clone(&storage)).unwrap());
    let queue = Arc::new(MemoryJobQueue::new());

    let state = AppState::new(
        config.clone(),
        Arc::clone(&storage),
        pipeline,
        Arc::clone(&queue) as Arc<dyn JobQueue>,
    );
    let app = routes::setup_routes(&config, state).unwrap();

    TestApp {
        server: TestServer::new(app).unwrap(),
        storage,
        queue,
        _dir: dir,
    }
}

fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([120, 60, 200]));
    let mut buffer = Vec::new();
    img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Jpeg)
        .unwrap();
    buffer
}

#[tokio::test]
async fn test_health_returns_ok() {
    let app = test_app(4_500_000).await;

    let response = app.server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<serde_json::Value>()["status"], "ok");
}

#[tokio::test]
async fn test_inline_upload_produces_preview_and_metadata() {
    let app = test_app(4_500_000).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(jpeg_bytes(320, 240))
            .file_name("photo.jpg")
            .mime_type("image/jpeg"),
    );

    let response = app.server.post("/upload").multipart(form).await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert!(body["url"].as_str().unwrap().contains("assets/"));
    assert!(body["previewUrl"].is_string());
    assert!(body["thumbnailUrl"].is_string());
    assert_eq!(body["wasProcessed"], true);
    assert_eq!(body["isAiGenerated"], false);
    assert_eq!(body["imageMetadata"]["width"], 320);
    assert_eq!(body["imageMetadata"]["height"], 240);
}

#[tokio::test]
async fn test_oversize_upload_routed_to_presigned_flow() {
    let app = test_app(100).await;

    let form = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0u8; 5_000])
            .file_name("big.bin")
            .mime_type("application/octet-stream"),
    );

    let response = app.server.post("/upload").multipart(form).await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    let body: serde_json::Value = response.json();
    assert_eq!(body["usePresignedUrl"], true);
    assert_eq!(body["limit"], 100);
    assert!(body["size"].as_u64().unwrap() > 100);
}

#[tokio::test]
async fn test_upload_without_file_field_is_rejected() {
    let app = test_app(4_500_000).await;

    let form = MultipartForm::new().add_text("type", "resource");

    let response = app.server.post("/upload").multipart(form).await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_direct_upload_requires_s3_backend() {
    let app = test_app(4_500_000).await;

    let response = app
        .server
        .post("/uploads/direct")
        .json(&serde_json::json!({
            "filename": "huge.mov",
            "contentType": "video/quicktime"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_complete_direct_upload_enqueues_job() {
    let app = test_app(4_500_000).await;

    app.storage
        .upload_with_key("incoming/abc123.jpg", jpeg_bytes(64, 64), "image/jpeg")
        .await
        .unwrap();

    let response = app
        .server
        .post("/uploads/direct/complete")
        .json(&serde_json::json!({
            "key": "incoming/abc123.jpg",
            "filename": "photo.jpg",
            "contentType": "image/jpeg"
        }))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "queued");
    assert!(body["jobId"].is_string());
    assert_eq!(app.queue.len().await, 1);
}

#[tokio::test]
async fn test_complete_direct_upload_missing_object_is_not_found() {
    let app = test_app(4_500_000).await;

    let response = app
        .server
        .post("/uploads/direct/complete")
        .json(&serde_json::json!({
            "key": "incoming/missing.jpg",
            "filename": "photo.jpg",
            "contentType": "image/jpeg"
        }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(app.queue.len().await, 0);
}

#[tokio::test]
async fn test_complete_direct_upload_rejects_foreign_key() {
    let app = test_app(4_500_000).await;

    let response = app
        .server
        .post("/uploads/direct/complete")
        .json(&serde_json::json!({
            "key": "assets/other.jpg",
            "filename": "other.jpg",
            "contentType": "image/jpeg"
        }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(app.queue.len().await, 0);
}
