//! Shared key generation for storage backends.
//!
//! Each artifact role gets its own prefix so originals, previews, thumbnails
//! and pending direct uploads never collide.

use uuid::Uuid;

/// Key for an original asset: `assets/{uuid}.{ext}`.
pub fn original_key(extension: &str) -> String {
    format!("assets/{}.{}", Uuid::new_v4(), extension)
}

/// Key for a watermarked preview derived from `base`: `previews/{base}.{ext}`.
pub fn preview_key(base: &str, extension: &str) -> String {
    format!("previews/{}.{}", base, extension)
}

/// Key for a thumbnail derived from `base`: `thumbnails/{base}.{ext}`.
pub fn thumbnail_key(base: &str, extension: &str) -> String {
    format!("thumbnails/{}.{}", base, extension)
}

/// Key for a short video preview clip derived from `base`: `clips/{base}.{ext}`.
pub fn clip_key(base: &str, extension: &str) -> String {
    format!("clips/{}.{}", base, extension)
}

/// Key for a direct upload awaiting deferred derivation: `incoming/{uuid}.{ext}`.
pub fn incoming_key(extension: &str) -> String {
    format!("incoming/{}.{}", Uuid::new_v4(), extension)
}

/// File stem of a storage key, used to derive sibling artifact keys.
///
/// `assets/3f2a….jpg` -> `3f2a…`.
pub fn key_stem(storage_key: &str) -> &str {
    let name = storage_key.rsplit('/').next().unwrap_or(storage_key);
    name.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_carry_role_prefix() {
        assert!(original_key("jpg").starts_with("assets/"));
        assert!(preview_key("abc", "png").starts_with("previews/"));
        assert!(thumbnail_key("abc", "jpg").starts_with("thumbnails/"));
        assert!(clip_key("abc", "mp4").starts_with("clips/"));
        assert!(incoming_key("mov").starts_with("incoming/"));
    }

    #[test]
    fn test_key_stem() {
        assert_eq!(key_stem("assets/3f2a.jpg"), "3f2a");
        assert_eq!(key_stem("no-prefix.png"), "no-prefix");
        assert_eq!(key_stem("assets/no-extension"), "no-extension");
    }

    #[test]
    fn test_sibling_keys_share_stem() {
        let key = original_key("png");
        let stem = key_stem(&key);
        assert_eq!(preview_key(stem, "png"), format!("previews/{}.png", stem));
    }
}
