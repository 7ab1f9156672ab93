// THEORY:
// Texture metrics over the shared `LumaPlane`. Every metric is a single O(pixels)
// pass with no failure mode on a non-empty plane. Degenerate geometry (no interior,
// no neighbor pairs) yields the value a flat image would have instead of dividing
// by zero.

use crate::core_modules::edge_map::{EdgeMap, LumaPlane};
use serde::{Deserialize, Serialize};

const LAPLACIAN: [i32; 9] = [0, -1, 0, -1, 4, -1, 0, -1, 0];
const BLADE_DEFINITION_SCALE: f64 = 25.5;
const MAX_BLADE_DEFINITION: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextureAnalysis {
    /// Mean squared Laplacian response over the interior.
    pub sharpness: f64,
    /// Sum of squared histogram probabilities, in (0, 1].
    pub uniformity: f64,
    /// Mean absolute difference to the right and lower neighbors.
    pub roughness: f64,
    /// Max minus min gray level, 0-255.
    pub contrast: f64,
    /// Mean of `1 / (1 + |diff|)` over the same neighbor pairs.
    pub homogeneity: f64,
    /// Shannon entropy of the gray histogram in bits, 0-8.
    pub entropy: f64,
    /// Mean Sobel magnitude rescaled to 0-10.
    pub grass_blade_definition: f64,
}

pub fn analyze_texture(plane: &LumaPlane, edges: &EdgeMap) -> TextureAnalysis {
    let histogram = histogram(plane);
    let (roughness, homogeneity) = neighbor_differences(plane);

    TextureAnalysis {
        sharpness: sharpness(plane),
        uniformity: uniformity(&histogram, plane.levels.len()),
        roughness,
        contrast: contrast(plane),
        homogeneity,
        entropy: entropy(&histogram, plane.levels.len()),
        grass_blade_definition: grass_blade_definition(edges),
    }
}

pub fn histogram(plane: &LumaPlane) -> [usize; 256] {
    let mut bins = [0usize; 256];
    for &level in &plane.levels {
        bins[level as usize] += 1;
    }
    bins
}

pub fn sharpness(plane: &LumaPlane) -> f64 {
    let interior = plane.width.saturating_sub(2) as f64 * plane.height.saturating_sub(2) as f64;
    if interior == 0.0 {
        return 0.0;
    }
    let sum_of_squares: f64 = plane
        .interior()
        .map(|(x, y)| {
            let response = plane.convolve3(x, y, &LAPLACIAN) as f64;
            response * response
        })
        .sum();
    sum_of_squares / interior
}

pub fn uniformity(histogram: &[usize; 256], total: usize) -> f64 {
    histogram
        .iter()
        .map(|&count| {
            let probability = count as f64 / total as f64;
            probability * probability
        })
        .sum()
}

pub fn entropy(histogram: &[usize; 256], total: usize) -> f64 {
    histogram
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let probability = count as f64 / total as f64;
            -probability * probability.log2()
        })
        .sum()
}

pub fn contrast(plane: &LumaPlane) -> f64 {
    let min = plane.levels.iter().copied().min().unwrap_or(0);
    let max = plane.levels.iter().copied().max().unwrap_or(0);
    (max - min) as f64
}

/// Roughness and homogeneity share one walk over right/below neighbor pairs. Only
/// pixels with both neighbors present contribute, so the last row and column are
/// read as neighbors but never as the current pixel.
pub fn neighbor_differences(plane: &LumaPlane) -> (f64, f64) {
    let mut roughness = 0.0;
    let mut homogeneity = 0.0;
    let mut pairs = 0usize;

    for y in 0..plane.height.saturating_sub(1) {
        for x in 0..plane.width.saturating_sub(1) {
            let current = plane.at(x, y) as f64;
            for neighbor in [plane.at(x + 1, y), plane.at(x, y + 1)] {
                let difference = (current - neighbor as f64).abs();
                roughness += difference;
                homogeneity += 1.0 / (1.0 + difference);
                pairs += 1;
            }
        }
    }

    if pairs == 0 {
        return (0.0, 1.0);
    }
    (roughness / pairs as f64, homogeneity / pairs as f64)
}

pub fn grass_blade_definition(edges: &EdgeMap) -> f64 {
    (edges.mean_strength() / BLADE_DEFINITION_SCALE).min(MAX_BLADE_DEFINITION)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::{Pixel, PixelBuffer};

    fn texture_of(buffer: &PixelBuffer) -> TextureAnalysis {
        let plane = LumaPlane::from_buffer(buffer);
        let edges = plane.sobel();
        analyze_texture(&plane, &edges)
    }

    #[test]
    fn flat_images_are_featureless() {
        for level in [0u8, 255] {
            let buffer = PixelBuffer::uniform(16, 16, Pixel::rgb(level, level, level)).unwrap();
            let texture = texture_of(&buffer);
            assert_eq!(texture.sharpness, 0.0);
            assert_eq!(texture.roughness, 0.0);
            assert_eq!(texture.contrast, 0.0);
            assert_eq!(texture.entropy, 0.0);
            assert_eq!(texture.uniformity, 1.0);
            assert_eq!(texture.homogeneity, 1.0);
            assert_eq!(texture.grass_blade_definition, 0.0);
        }
    }

    #[test]
    fn uniform_histogram_has_eight_bits_of_entropy() {
        // Every gray level exactly once.
        let buffer = PixelBuffer::from_fn(16, 16, |x, y| {
            let level = (y * 16 + x) as u8;
            Pixel::rgb(level, level, level)
        })
        .unwrap();
        let texture = texture_of(&buffer);
        assert!((texture.entropy - 8.0).abs() < 1e-9);
        assert!((texture.uniformity - 1.0 / 256.0).abs() < 1e-12);
        assert_eq!(texture.contrast, 255.0);
    }

    #[test]
    fn two_level_checker_has_known_neighbor_stats() {
        let buffer = PixelBuffer::from_fn(4, 4, |x, y| {
            if (x + y) % 2 == 0 { Pixel::rgb(0, 0, 0) } else { Pixel::rgb(100, 100, 100) }
        })
        .unwrap();
        let texture = texture_of(&buffer);
        // Every neighbor pair differs by the full 100 levels.
        assert_eq!(texture.roughness, 100.0);
        assert!((texture.homogeneity - 1.0 / 101.0).abs() < 1e-12);
        assert!((texture.entropy - 1.0).abs() < 1e-12);
        assert_eq!(texture.uniformity, 0.5);
        // Laplacian at an interior 0 is -400, at an interior 100 is +400.
        assert_eq!(texture.sharpness, 160_000.0);
    }

    #[test]
    fn single_pixel_does_not_divide_by_zero() {
        let buffer = PixelBuffer::uniform(1, 1, Pixel::rgb(12, 200, 40)).unwrap();
        let texture = texture_of(&buffer);
        assert_eq!(texture.sharpness, 0.0);
        assert_eq!(texture.roughness, 0.0);
        assert_eq!(texture.homogeneity, 1.0);
        assert!(texture.entropy.is_finite());
    }

    #[test]
    fn blade_definition_is_capped_at_ten() {
        // Two-pixel blocks; a one-pixel checker cancels out under Sobel.
        let buffer = PixelBuffer::from_fn(20, 20, |x, y| {
            if (x / 2 + y / 2) % 2 == 0 { Pixel::rgb(0, 0, 0) } else { Pixel::rgb(255, 255, 255) }
        })
        .unwrap();
        let texture = texture_of(&buffer);
        assert!(texture.grass_blade_definition <= 10.0);
        assert!(texture.grass_blade_definition > 0.0);
    }
}
