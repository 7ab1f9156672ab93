// THEORY:
// Decode is the only place that touches image formats. Everything downstream sees a
// `PixelBuffer` of RGBA8 bytes and nothing else.
//
// Large photos are scaled down before scoring so that the circle scan and texture
// passes stay bounded. The scale factor is `min(max / width, max / height)`, applied
// to both sides and truncated toward zero, so 1000x3000 becomes 266x800. The limiting
// side is pinned to `max_dimension` itself rather than `side * ratio`, which would
// truncate to 799 for widths like 1078. No side drops below one pixel.
// Images already within bounds are passed through untouched.

use crate::core_modules::pixel::pixel::PixelBuffer;
use crate::error::Result;
use image::imageops::FilterType;
use image::{ImageEncoder, RgbaImage};
use log::debug;
use std::path::Path;

/// Read an image file and return it as an RGBA buffer no larger than `max_dimension`.
pub fn load_image(path: &Path, max_dimension: u32) -> Result<PixelBuffer> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    debug!("decoded {} ({}x{})", path.display(), width, height);
    to_pixel_buffer(rgba, max_dimension)
}

/// Same as `load_image`, from encoded bytes in memory.
pub fn from_bytes(bytes: &[u8], max_dimension: u32) -> Result<PixelBuffer> {
    let decoded = image::load_from_memory(bytes)?;
    to_pixel_buffer(decoded.to_rgba8(), max_dimension)
}

/// Target size after the downscale rule, or `None` when the image already fits.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    if width <= max_dimension && height <= max_dimension {
        return None;
    }
    let width_ratio = max_dimension as f64 / width as f64;
    let height_ratio = max_dimension as f64 / height as f64;
    let scale = |side: u32, ratio: f64| ((side as f64 * ratio).trunc() as u32).max(1);
    if width_ratio <= height_ratio {
        Some((max_dimension, scale(height, width_ratio)))
    } else {
        Some((scale(width, height_ratio), max_dimension))
    }
}

fn to_pixel_buffer(rgba: RgbaImage, max_dimension: u32) -> Result<PixelBuffer> {
    let (width, height) = rgba.dimensions();
    let rgba = match scaled_dimensions(width, height, max_dimension) {
        Some((scaled_width, scaled_height)) => {
            debug!(
                "resizing {}x{} to {}x{}",
                width, height, scaled_width, scaled_height
            );
            image::imageops::resize(&rgba, scaled_width, scaled_height, FilterType::Triangle)
        }
        None => rgba,
    };
    let (width, height) = rgba.dimensions();
    PixelBuffer::new(width, height, rgba.into_raw())
}

/// Write a buffer out as PNG.
pub fn save_png(path: &Path, buffer: &PixelBuffer) -> Result<()> {
    let output = std::fs::File::create(path)?;
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(
        buffer.as_bytes(),
        buffer.width(),
        buffer.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;
    use crate::error::AnalysisError;

    #[test]
    fn small_images_are_not_resized() {
        assert_eq!(scaled_dimensions(800, 600, 800), None);
        assert_eq!(scaled_dimensions(1, 1, 800), None);
    }

    #[test]
    fn longer_side_lands_on_the_limit() {
        assert_eq!(scaled_dimensions(1600, 1200, 800), Some((800, 600)));
        assert_eq!(scaled_dimensions(10_000, 1, 800), Some((800, 1)));
    }

    #[test]
    fn short_side_is_truncated_not_rounded() {
        assert_eq!(scaled_dimensions(1000, 3000, 800), Some((266, 800)));
        assert_eq!(scaled_dimensions(3000, 1000, 800), Some((800, 266)));
        assert_eq!(scaled_dimensions(1001, 7, 800), Some((800, 5)));
    }

    #[test]
    fn limiting_side_is_exact_despite_float_error() {
        // 1078 * (800 / 1078) evaluates to 799.9999999999999.
        assert_eq!(scaled_dimensions(1078, 500, 800), Some((800, 371)));
    }

    #[test]
    fn png_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gradient.png");
        let buffer = PixelBuffer::from_fn(12, 7, |x, y| {
            Pixel::rgb((x * 20) as u8, (y * 30) as u8, 99)
        })
        .unwrap();
        save_png(&path, &buffer).unwrap();

        let loaded = load_image(&path, 800).unwrap();
        assert_eq!(loaded, buffer);
    }

    #[test]
    fn oversized_png_is_scaled_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.png");
        let buffer = PixelBuffer::uniform(40, 10, Pixel::rgb(10, 200, 30)).unwrap();
        save_png(&path, &buffer).unwrap();

        let loaded = load_image(&path, 20).unwrap();
        assert_eq!((loaded.width(), loaded.height()), (20, 5));
        assert_eq!(loaded.pixel(3, 3), Pixel::rgb(10, 200, 30));
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let result = from_bytes(b"definitely not an image", 800);
        assert!(matches!(result, Err(AnalysisError::Decode(_))));
    }
}
