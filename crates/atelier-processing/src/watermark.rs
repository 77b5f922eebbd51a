//! Watermark engine
//!
//! Builds a deterministic repeating tile (faint guide-line grid plus a
//! rotated low-opacity wordmark) and composites it over raster images with
//! standard alpha-over blending at the image's native resolution.
//!
//! Transparency rule: PNG sources with an alpha channel keep that channel
//! through the composite and are re-encoded as PNG. Everything else is
//! re-encoded as JPEG for size.

use ab_glyph::{FontVec, PxScale};
use anyhow::{anyhow, Context, Result};
use image::{imageops, DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use imageproc::geometric_transformations::{rotate_about_center, Interpolation};
use std::io::Cursor;

use crate::probe::png_has_alpha;
use atelier_core::constants::WATERMARK_TILE_SIZE;

const GRID_SPACING: u32 = 120;
const GRID_ALPHA: u8 = 26;
const WORDMARK_ALPHA: u8 = 56;
const WORDMARK_SCALE: f32 = 72.0;
const WORDMARK_ANGLE_RAD: f32 = -0.5236; // 30 degrees counter-clockwise
const WORDMARK_ROW_SPACING: u32 = 240;

/// Output of one watermark composite.
pub struct WatermarkedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub extension: &'static str,
}

/// The fixed repeating overlay tile.
///
/// Construction is deterministic for a given wordmark text and font, so the
/// same tile bytes are produced on every run. The wordmark layer degrades to
/// grid-only when no font file is configured.
pub struct WatermarkTile {
    tile: RgbaImage,
}

impl WatermarkTile {
    pub fn new(text: &str, font_path: Option<&str>) -> Self {
        let font = font_path.and_then(|path| match std::fs::read(path) {
            Ok(bytes) => match FontVec::try_from_vec(bytes) {
                Ok(font) => Some(font),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Watermark font unusable, tile degrades to grid only");
                    None
                }
            },
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Watermark font unreadable, tile degrades to grid only");
                None
            }
        });

        Self {
            tile: build_tile(text, font.as_ref()),
        }
    }

    pub fn tile(&self) -> &RgbaImage {
        &self.tile
    }

    /// Tile encoded as PNG, used as the overlay input for video watermarking.
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.tile
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .context("Failed to encode watermark tile")?;
        Ok(buffer)
    }

    /// Composite the tile over image bytes at native resolution.
    pub fn apply(&self, data: &[u8]) -> Result<WatermarkedImage> {
        self.apply_inner(data, None)
    }

    /// Resize to fit a bounding box, then composite the tile. Used for
    /// thumbnail-class outputs.
    pub fn apply_resized(&self, data: &[u8], max_dimension: u32) -> Result<WatermarkedImage> {
        self.apply_inner(data, Some(max_dimension))
    }

    fn apply_inner(&self, data: &[u8], max_dimension: Option<u32>) -> Result<WatermarkedImage> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .context("Failed to sniff image format")?;
        let format = reader.format();
        let mut img = reader.decode().context("Failed to decode image")?;

        let keep_alpha = format == Some(ImageFormat::Png) && png_has_alpha(data);

        if let Some(max) = max_dimension {
            if img.width() > max || img.height() > max {
                img = img.resize(max, max, imageops::FilterType::Lanczos3);
            }
        }

        let mut canvas = img.to_rgba8();
        overlay_tiled(&mut canvas, &self.tile);

        let mut buffer = Vec::new();
        if keep_alpha {
            canvas
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
                .context("Failed to encode watermarked PNG")?;
            Ok(WatermarkedImage {
                bytes: buffer,
                content_type: "image/png",
                extension: "png",
            })
        } else {
            DynamicImage::ImageRgba8(canvas)
                .to_rgb8()
                .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
                .context("Failed to encode watermarked JPEG")?;
            Ok(WatermarkedImage {
                bytes: buffer,
                content_type: "image/jpeg",
                extension: "jpg",
            })
        }
    }
}

/// Repeat the tile across the full canvas with alpha-over blending.
fn overlay_tiled(canvas: &mut RgbaImage, tile: &RgbaImage) {
    let (width, height) = canvas.dimensions();
    let mut y = 0i64;
    while y < height as i64 {
        let mut x = 0i64;
        while x < width as i64 {
            imageops::overlay(canvas, tile, x, y);
            x += tile.width() as i64;
        }
        y += tile.height() as i64;
    }
}

fn build_tile(text: &str, font: Option<&FontVec>) -> RgbaImage {
    let size = WATERMARK_TILE_SIZE;
    let mut tile = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));

    // Faint guide-line grid.
    let line = Rgba([255, 255, 255, GRID_ALPHA]);
    let mut offset = 0;
    while offset < size {
        for i in 0..size {
            tile.put_pixel(offset, i, line);
            tile.put_pixel(i, offset, line);
        }
        offset += GRID_SPACING;
    }

    // Rotated low-opacity wordmark, staggered so the rotation leaves no
    // obvious empty bands.
    if let Some(font) = font {
        if !text.is_empty() {
            let mut layer = RgbaImage::from_pixel(size, size, Rgba([0, 0, 0, 0]));
            let color = Rgba([255, 255, 255, WORDMARK_ALPHA]);
            let scale = PxScale::from(WORDMARK_SCALE);

            let mut row = 0u32;
            let mut y = 0i32;
            while y < size as i32 {
                let x = if row % 2 == 0 { 40 } else { 360 };
                draw_text_mut(&mut layer, color, x, y, scale, font, text);
                draw_text_mut(&mut layer, color, x + 600, y, scale, font, text);
                y += WORDMARK_ROW_SPACING as i32;
                row += 1;
            }

            let rotated = rotate_about_center(
                &layer,
                WORDMARK_ANGLE_RAD,
                Interpolation::Bilinear,
                Rgba([0, 0, 0, 0]),
            );
            imageops::overlay(&mut tile, &rotated, 0, 0);
        }
    }

    tile
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage};

    fn png_rgba(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([120, 10, 10, 180]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    fn jpeg_rgb(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 200, 200]));
        let mut buffer = Vec::new();
        img.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)
            .unwrap();
        buffer
    }

    #[test]
    fn test_tile_is_deterministic() {
        let a = WatermarkTile::new("PREVIEW", None);
        let b = WatermarkTile::new("PREVIEW", None);
        assert_eq!(a.tile().as_raw(), b.tile().as_raw());
    }

    #[test]
    fn test_png_alpha_preserved() {
        let tile = WatermarkTile::new("PREVIEW", None);
        let result = tile.apply(&png_rgba(300, 200)).unwrap();

        assert_eq!(result.content_type, "image/png");
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert!(decoded.color().has_alpha());
        assert_eq!(decoded.dimensions(), (300, 200));
    }

    #[test]
    fn test_opaque_source_becomes_jpeg() {
        let tile = WatermarkTile::new("PREVIEW", None);
        let result = tile.apply(&jpeg_rgb(300, 200)).unwrap();
        assert_eq!(result.content_type, "image/jpeg");
    }

    #[test]
    fn test_watermarking_compounds_on_rewatermark() {
        // Re-watermarking a watermarked image must visibly compound, never
        // no-op.
        let tile = WatermarkTile::new("PREVIEW", None);
        let once = tile.apply(&jpeg_rgb(400, 400)).unwrap();
        let twice = tile.apply(&once.bytes).unwrap();

        let img_once = image::load_from_memory(&once.bytes).unwrap().to_rgb8();
        let img_twice = image::load_from_memory(&twice.bytes).unwrap().to_rgb8();
        assert_ne!(img_once.as_raw(), img_twice.as_raw());
    }

    #[test]
    fn test_resize_bounds_thumbnail() {
        let tile = WatermarkTile::new("PREVIEW", None);
        let result = tile.apply_resized(&jpeg_rgb(2400, 1200), 600).unwrap();
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert!(decoded.width() <= 600 && decoded.height() <= 600);
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let tile = WatermarkTile::new("PREVIEW", None);
        let result = tile.apply_resized(&jpeg_rgb(100, 80), 600).unwrap();
        let decoded = image::load_from_memory(&result.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 80));
    }

    #[test]
    fn test_missing_font_degrades_to_grid() {
        let tile = WatermarkTile::new("PREVIEW", Some("/nonexistent/font.ttf"));
        // Grid lines are still present at the tile origin.
        assert_eq!(tile.tile().get_pixel(0, 0)[3], GRID_ALPHA);
    }
}
