//! Image metadata probe
//!
//! Reads container headers only; never decodes full pixel data, so probing
//! stays cheap even for very large images. Video and audio probing lives in
//! the `video` module because it requires the external tool.

use anyhow::{anyhow, Context, Result};
use atelier_core::models::ImageMetadata;
use image::ImageReader;
use std::io::Cursor;

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];

/// Whether PNG bytes declare an alpha channel in their IHDR chunk.
///
/// Color types 4 (gray+alpha) and 6 (rgba) carry alpha. Non-PNG bytes
/// return false.
pub fn png_has_alpha(data: &[u8]) -> bool {
    // IHDR is always the first chunk; its color type byte sits at offset 25.
    if data.len() < 26 || data[..8] != PNG_SIGNATURE {
        return false;
    }
    matches!(data[25], 4 | 6)
}

/// Extract width/height/alpha from image bytes without a full decode.
pub fn probe_image(data: &[u8]) -> Result<ImageMetadata> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .context("Failed to sniff image format")?;

    if reader.format().is_none() {
        return Err(anyhow!("Unrecognized image format"));
    }

    let (width, height) = reader
        .into_dimensions()
        .context("Failed to read image dimensions")?;

    Ok(ImageMetadata {
        width,
        height,
        has_alpha: png_has_alpha(data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};

    fn png_bytes_rgba(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([10, 20, 30, 200]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn png_bytes_rgb(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn test_probe_dimensions() {
        let meta = probe_image(&png_bytes_rgba(320, 240)).unwrap();
        assert_eq!(meta.width, 320);
        assert_eq!(meta.height, 240);
    }

    #[test]
    fn test_png_alpha_detection() {
        assert!(png_has_alpha(&png_bytes_rgba(8, 8)));
        assert!(!png_has_alpha(&png_bytes_rgb(8, 8)));
        assert!(!png_has_alpha(b"not a png at all, definitely"));
    }

    #[test]
    fn test_probe_jpeg_has_no_alpha() {
        let img = RgbImage::from_pixel(16, 16, Rgb([100, 100, 100]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Jpeg)
            .unwrap();

        let meta = probe_image(&buffer).unwrap();
        assert_eq!((meta.width, meta.height), (16, 16));
        assert!(!meta.has_alpha);
    }

    #[test]
    fn test_probe_rejects_garbage() {
        assert!(probe_image(b"garbage bytes").is_err());
    }
}
