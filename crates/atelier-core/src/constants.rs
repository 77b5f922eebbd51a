//! Shared constants.

/// Default ceiling for inline (request-body) uploads, in bytes.
///
/// Uploads strictly larger than this must go through the direct-upload path.
/// The value tracks the request-body ceiling of the hosting platform the
/// service runs behind; override with `INLINE_UPLOAD_MAX_BYTES`.
pub const DEFAULT_INLINE_UPLOAD_MAX_BYTES: u64 = 4_500_000;

/// How long a presigned direct-upload PUT URL stays valid.
pub const PRESIGNED_PUT_EXPIRY_SECS: u64 = 15 * 60;

/// Edge length of the square watermark tile, in pixels.
pub const WATERMARK_TILE_SIZE: u32 = 1200;

/// Default bounding-box edge for thumbnail-class outputs, in pixels.
pub const DEFAULT_THUMBNAIL_MAX_DIMENSION: u32 = 1024;

/// Preview-clip window used when the source duration is unknown, in seconds.
pub const DEFAULT_PREVIEW_CLIP_FALLBACK_SECS: f64 = 5.0;

/// Default wall-clock timeout for a single external-tool invocation.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 120;
