//! Deferred processing job for the large-asset path.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of deferred derivation work, created when a client finishes a
/// direct upload. Consumed exactly once by the background worker, which
/// re-reads the bytes from storage and runs the same derivation pipeline as
/// the inline path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredJob {
    pub id: Uuid,
    pub storage_key: String,
    pub filename: String,
    pub content_type: String,
    /// Retry count, incremented by the consumer on failure.
    #[serde(default)]
    pub attempts: u32,
}

impl DeferredJob {
    pub fn new(storage_key: String, filename: String, content_type: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            storage_key,
            filename,
            content_type,
            attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_roundtrip_defaults_attempts() {
        let job = DeferredJob::new(
            "incoming/abc.mov".to_string(),
            "clip.mov".to_string(),
            "video/quicktime".to_string(),
        );
        let json = serde_json::to_string(&job).unwrap();
        // Older producers may omit attempts entirely.
        let trimmed = json.replace(",\"attempts\":0", "");
        let parsed: DeferredJob = serde_json::from_str(&trimmed).unwrap();
        assert_eq!(parsed.storage_key, "incoming/abc.mov");
        assert_eq!(parsed.attempts, 0);
    }
}
