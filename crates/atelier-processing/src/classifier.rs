//! Format classifier
//!
//! Resolves the canonical content-type and processing category from the
//! declared filename and MIME type. Both inputs are untrusted; the extension
//! is authoritative when it maps to a known table, the MIME prefix is a
//! fallback, and anything else degrades to `Other`. Never fails.

use atelier_core::models::{ClassifiedAsset, ProcessingCategory};

/// Canonical (content_type, category) for a known extension.
fn lookup_extension(ext: &str) -> Option<(&'static str, ProcessingCategory)> {
    let entry = match ext {
        // Raster images. PNG is its own category because of the
        // transparency-preservation obligation.
        "jpg" | "jpeg" => ("image/jpeg", ProcessingCategory::Image),
        "png" => ("image/png", ProcessingCategory::Png),
        "webp" => ("image/webp", ProcessingCategory::Image),
        "gif" => ("image/gif", ProcessingCategory::Image),

        // Video containers
        "mp4" => ("video/mp4", ProcessingCategory::Video),
        "m4v" => ("video/mp4", ProcessingCategory::Video),
        "mov" => ("video/quicktime", ProcessingCategory::Video),
        "avi" => ("video/x-msvideo", ProcessingCategory::Video),
        "webm" => ("video/webm", ProcessingCategory::Video),
        "mkv" => ("video/x-matroska", ProcessingCategory::Video),

        // Audio
        "mp3" => ("audio/mpeg", ProcessingCategory::Audio),
        "wav" => ("audio/wav", ProcessingCategory::Audio),
        "ogg" => ("audio/ogg", ProcessingCategory::Audio),
        "m4a" => ("audio/mp4", ProcessingCategory::Audio),
        "aac" => ("audio/aac", ProcessingCategory::Audio),
        "flac" => ("audio/flac", ProcessingCategory::Audio),
        "wma" => ("audio/x-ms-wma", ProcessingCategory::Audio),

        // Archives
        "zip" => ("application/zip", ProcessingCategory::Archive),

        // Vector/layered design formats
        "psd" => ("image/vnd.adobe.photoshop", ProcessingCategory::Design),
        "ai" => ("application/postscript", ProcessingCategory::Design),
        "eps" => ("application/postscript", ProcessingCategory::Design),
        "svg" => ("image/svg+xml", ProcessingCategory::Design),

        // Fonts
        "ttf" => ("font/ttf", ProcessingCategory::Font),
        "otf" => ("font/otf", ProcessingCategory::Font),
        "woff" => ("font/woff", ProcessingCategory::Font),
        "woff2" => ("font/woff2", ProcessingCategory::Font),
        "eot" => ("application/vnd.ms-fontobject", ProcessingCategory::Font),

        _ => return None,
    };
    Some(entry)
}

/// Lowercased extension of a filename, without the dot.
fn extension_of(filename: &str) -> Option<String> {
    let name = filename.rsplit('/').next().unwrap_or(filename);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Classify an asset from its declared filename and MIME type.
pub fn classify(filename: &str, declared_mime: &str) -> ClassifiedAsset {
    let ext = extension_of(filename);

    if let Some(ext) = &ext {
        if let Some((content_type, category)) = lookup_extension(ext) {
            return ClassifiedAsset {
                content_type: content_type.to_string(),
                extension: ext.clone(),
                category,
            };
        }
    }

    // Unknown extension: fall back to the MIME prefix.
    let mime = declared_mime.to_lowercase();
    let category = if mime.starts_with("image/") {
        if mime == "image/png" {
            ProcessingCategory::Png
        } else {
            ProcessingCategory::Image
        }
    } else if mime.starts_with("video/") {
        ProcessingCategory::Video
    } else if mime.starts_with("audio/") {
        ProcessingCategory::Audio
    } else {
        ProcessingCategory::Other
    };

    let content_type = if category == ProcessingCategory::Other {
        "application/octet-stream".to_string()
    } else {
        mime
    };

    ClassifiedAsset {
        content_type,
        extension: ext.unwrap_or_else(|| "bin".to_string()),
        category,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_authoritative() {
        // Wrong declared MIME does not override a known extension.
        let asset = classify("photo.jpg", "application/octet-stream");
        assert_eq!(asset.category, ProcessingCategory::Image);
        assert_eq!(asset.content_type, "image/jpeg");
        assert_eq!(asset.extension, "jpg");
    }

    #[test]
    fn test_png_gets_its_own_category() {
        let asset = classify("logo.PNG", "image/png");
        assert_eq!(asset.category, ProcessingCategory::Png);
        assert_eq!(asset.content_type, "image/png");
    }

    #[test]
    fn test_m4v_canonicalizes_to_mp4() {
        let asset = classify("clip.m4v", "video/x-m4v");
        assert_eq!(asset.category, ProcessingCategory::Video);
        assert_eq!(asset.content_type, "video/mp4");
    }

    #[test]
    fn test_known_tables() {
        for (name, category) in [
            ("a.webp", ProcessingCategory::Image),
            ("a.mov", ProcessingCategory::Video),
            ("a.mkv", ProcessingCategory::Video),
            ("a.flac", ProcessingCategory::Audio),
            ("a.wma", ProcessingCategory::Audio),
            ("a.zip", ProcessingCategory::Archive),
            ("a.psd", ProcessingCategory::Design),
            ("a.svg", ProcessingCategory::Design),
            ("a.woff2", ProcessingCategory::Font),
            ("a.eot", ProcessingCategory::Font),
        ] {
            assert_eq!(classify(name, "").category, category, "{}", name);
        }
    }

    #[test]
    fn test_mime_prefix_fallback() {
        let asset = classify("capture.raw", "image/x-canon-cr2");
        assert_eq!(asset.category, ProcessingCategory::Image);
        assert_eq!(asset.content_type, "image/x-canon-cr2");

        let asset = classify("stream.xyz", "video/x-custom");
        assert_eq!(asset.category, ProcessingCategory::Video);
    }

    #[test]
    fn test_unknown_degrades_to_other() {
        let asset = classify("data.qqq", "application/x-unknown");
        assert_eq!(asset.category, ProcessingCategory::Other);
        assert_eq!(asset.content_type, "application/octet-stream");

        let asset = classify("no-extension", "");
        assert_eq!(asset.category, ProcessingCategory::Other);
        assert_eq!(asset.extension, "bin");
    }
}
