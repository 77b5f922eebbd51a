//! Configuration module
//!
//! Environment-driven configuration for the API service and the background
//! worker, covering storage, external tools, watermarking and the deferred
//! job queue.

use std::env;

use crate::constants::{
    DEFAULT_INLINE_UPLOAD_MAX_BYTES, DEFAULT_PREVIEW_CLIP_FALLBACK_SECS,
    DEFAULT_THUMBNAIL_MAX_DIMENSION, DEFAULT_TOOL_TIMEOUT_SECS,
};
use crate::storage_types::StorageBackend;

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,

    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,

    // Upload routing
    pub inline_upload_max_bytes: u64,

    // External tools
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub magick_path: String,
    pub tool_timeout_secs: u64,

    // Watermarking
    pub watermark_text: String,
    pub watermark_font_path: Option<String>,

    // Derivation tuning
    pub thumbnail_max_dimension: u32,
    pub preview_clip_fallback_secs: f64,

    // Deferred job queue
    pub sqs_queue_url: Option<String>,
    pub job_max_retries: u32,
    pub job_poll_interval_ms: u64,
    pub job_timeout_secs: u64,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const JOB_MAX_RETRIES: u32 = 3;
        const JOB_POLL_INTERVAL_MS: u64 = 1000;
        const JOB_TIMEOUT_SECS: u64 = 600;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let storage_backend =
            env::var("STORAGE_BACKEND")
                .ok()
                .and_then(|s| match s.to_lowercase().as_str() {
                    "s3" => Some(StorageBackend::S3),
                    "local" => Some(StorageBackend::Local),
                    _ => None,
                });

        let config = Config {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            environment,
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            local_storage_base_url: env::var("LOCAL_STORAGE_BASE_URL").ok(),
            inline_upload_max_bytes: env::var("INLINE_UPLOAD_MAX_BYTES")
                .unwrap_or_else(|_| DEFAULT_INLINE_UPLOAD_MAX_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_INLINE_UPLOAD_MAX_BYTES),
            ffmpeg_path: env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string()),
            ffprobe_path: env::var("FFPROBE_PATH").unwrap_or_else(|_| "ffprobe".to_string()),
            magick_path: env::var("MAGICK_PATH").unwrap_or_else(|_| "magick".to_string()),
            tool_timeout_secs: env::var("TOOL_TIMEOUT_SECS")
                .unwrap_or_else(|_| DEFAULT_TOOL_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_TOOL_TIMEOUT_SECS),
            watermark_text: env::var("WATERMARK_TEXT")
                .unwrap_or_else(|_| "PREVIEW".to_string()),
            watermark_font_path: env::var("WATERMARK_FONT_PATH")
                .ok()
                .filter(|s| !s.is_empty()),
            thumbnail_max_dimension: env::var("THUMBNAIL_MAX_DIMENSION")
                .unwrap_or_else(|_| DEFAULT_THUMBNAIL_MAX_DIMENSION.to_string())
                .parse()
                .unwrap_or(DEFAULT_THUMBNAIL_MAX_DIMENSION),
            preview_clip_fallback_secs: env::var("PREVIEW_CLIP_FALLBACK_SECS")
                .unwrap_or_else(|_| DEFAULT_PREVIEW_CLIP_FALLBACK_SECS.to_string())
                .parse()
                .unwrap_or(DEFAULT_PREVIEW_CLIP_FALLBACK_SECS),
            sqs_queue_url: env::var("SQS_QUEUE_URL").ok().filter(|s| !s.is_empty()),
            job_max_retries: env::var("JOB_MAX_RETRIES")
                .unwrap_or_else(|_| JOB_MAX_RETRIES.to_string())
                .parse()
                .unwrap_or(JOB_MAX_RETRIES),
            job_poll_interval_ms: env::var("JOB_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| JOB_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(JOB_POLL_INTERVAL_MS),
            job_timeout_secs: env::var("JOB_TIMEOUT_SECS")
                .unwrap_or_else(|_| JOB_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(JOB_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.inline_upload_max_bytes == 0 {
            return Err(anyhow::anyhow!(
                "INLINE_UPLOAD_MAX_BYTES must be greater than zero"
            ));
        }

        if self.thumbnail_max_dimension == 0 {
            return Err(anyhow::anyhow!(
                "THUMBNAIL_MAX_DIMENSION must be greater than zero"
            ));
        }

        if self.preview_clip_fallback_secs <= 0.0 {
            return Err(anyhow::anyhow!(
                "PREVIEW_CLIP_FALLBACK_SECS must be greater than zero"
            ));
        }

        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
                if self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_BASE_URL must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
