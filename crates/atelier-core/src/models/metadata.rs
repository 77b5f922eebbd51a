//! Intrinsic asset metadata extracted by the probe.
//!
//! Fields are populated best-effort; a failed probe reduces to absent fields,
//! never to an ingest error.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub has_alpha: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_space: Option<String>,
    pub has_timecode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_codec: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
}

/// Tagged union of per-category metadata, keyed by processing category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AssetMetadata {
    Image(ImageMetadata),
    Video(VideoMetadata),
    Audio(AudioMetadata),
    None,
}

impl AssetMetadata {
    pub fn as_image(&self) -> Option<&ImageMetadata> {
        match self {
            AssetMetadata::Image(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_video(&self) -> Option<&VideoMetadata> {
        match self {
            AssetMetadata::Video(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_audio(&self) -> Option<&AudioMetadata> {
        match self {
            AssetMetadata::Audio(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_tagged_serialization() {
        let meta = AssetMetadata::Image(ImageMetadata {
            width: 800,
            height: 600,
            has_alpha: true,
        });
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["type"], "image");
        assert_eq!(json["width"], 800);
        assert_eq!(json["hasAlpha"], true);
    }

    #[test]
    fn test_video_metadata_omits_absent_fields() {
        let meta = VideoMetadata::default();
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("codec").is_none());
        assert_eq!(json["hasTimecode"], false);
    }
}
