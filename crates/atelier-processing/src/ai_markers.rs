//! AI-origin detector
//!
//! Scans embedded image metadata text for known generative-tool provenance
//! markers. Advisory only: returns false on any extraction error and never
//! blocks or alters derivation. The heuristic is trivially defeated by
//! metadata stripping; it must not become a hard gate.

use img_parts::png::Png;
use img_parts::Bytes;
use std::io::Cursor;

/// Known generator names and generic provenance phrases, matched
/// case-insensitively as substrings.
const AI_MARKERS: &[&str] = &[
    "midjourney",
    "dall-e",
    "dall\u{b7}e",
    "stable diffusion",
    "stablediffusion",
    "stability.ai",
    "adobe firefly",
    "leonardo.ai",
    "novelai",
    "dreamstudio",
    "craiyon",
    "ai generated",
    "ai-generated",
    "generated by ai",
    "made with ai",
];

/// Collect text from EXIF fields, if the container carries any.
fn exif_text(data: &[u8]) -> Option<String> {
    let mut cursor = Cursor::new(data);
    let reader = exif::Reader::new()
        .read_from_container(&mut cursor)
        .ok()?;

    let mut text = String::new();
    for field in reader.fields() {
        text.push_str(&field.display_value().to_string());
        text.push('\n');
    }
    Some(text)
}

/// Collect text from PNG tEXt/iTXt chunks.
fn png_text(data: &[u8]) -> Option<String> {
    let png = Png::from_bytes(Bytes::copy_from_slice(data)).ok()?;

    let mut text = String::new();
    for chunk in png.chunks() {
        if matches!(&chunk.kind(), b"tEXt" | b"iTXt" | b"zTXt") {
            text.push_str(&String::from_utf8_lossy(chunk.contents()));
            text.push('\n');
        }
    }
    Some(text)
}

/// Whether image bytes carry a known generative-AI provenance marker.
pub fn detect(data: &[u8]) -> bool {
    let mut haystack = String::new();
    if let Some(text) = exif_text(data) {
        haystack.push_str(&text);
    }
    if let Some(text) = png_text(data) {
        haystack.push_str(&text);
    }

    if haystack.is_empty() {
        return false;
    }

    let haystack = haystack.to_lowercase();
    AI_MARKERS.iter().any(|marker| haystack.contains(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use img_parts::png::PngChunk;

    fn png_with_text_chunk(keyword: &str, value: &str) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]));
        let mut buffer = Vec::new();
        img.write_to(
            &mut Cursor::new(&mut buffer),
            image::ImageFormat::Png,
        )
        .unwrap();

        let mut png = Png::from_bytes(Bytes::copy_from_slice(&buffer)).unwrap();
        let mut contents = Vec::new();
        contents.extend_from_slice(keyword.as_bytes());
        contents.push(0);
        contents.extend_from_slice(value.as_bytes());
        let chunk = PngChunk::new(*b"tEXt", Bytes::from(contents));
        // Insert before IEND
        let iend = png.chunks().len() - 1;
        png.chunks_mut().insert(iend, chunk);

        let mut out = Vec::new();
        png.encoder().write_to(&mut out).unwrap();
        out
    }

    #[test]
    fn test_detects_generator_marker_in_png_text() {
        let data = png_with_text_chunk("Software", "Stable Diffusion v1.5");
        assert!(detect(&data));
    }

    #[test]
    fn test_detection_is_case_insensitive() {
        let data = png_with_text_chunk("Comment", "MIDJOURNEY render, upscaled");
        assert!(detect(&data));
    }

    #[test]
    fn test_clean_image_is_negative() {
        let data = png_with_text_chunk("Author", "A human with a camera");
        assert!(!detect(&data));
    }

    #[test]
    fn test_garbage_bytes_are_negative() {
        assert!(!detect(b"not an image"));
    }
}
