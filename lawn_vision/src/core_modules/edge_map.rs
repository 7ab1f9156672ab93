// THEORY:
// The `edge_map` module is the shared spatial layer between pattern detection and
// texture measurement. It produces two planes from a `PixelBuffer`:
//
// 1.  **LumaPlane**: one rounded Rec. 601 gray level per pixel. Both the pattern
//     detector and the texture metrics read the same plane, so it is computed once.
// 2.  **EdgeMap**: a 3x3 Sobel gradient magnitude per pixel, truncated into a byte
//     and clamped at 255. The one-pixel border is never convolved and stays 0, which
//     matters for `mean_strength`: the border zeros count toward the average.
//
// "Strong" edges are those above `STRONG_EDGE_THRESHOLD`. Circle voting, edge density
// and the contour placeholder all use that same cut.

use crate::core_modules::pixel::pixel::PixelBuffer;

pub const STRONG_EDGE_THRESHOLD: u8 = 128;

const SOBEL_X: [i32; 9] = [-1, 0, 1, -2, 0, 2, -1, 0, 1];
const SOBEL_Y: [i32; 9] = [-1, -2, -1, 0, 0, 0, 1, 2, 1];

/// Grayscale view of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LumaPlane {
    pub width: u32,
    pub height: u32,
    /// Row-major gray levels (0-255).
    pub levels: Vec<u8>,
}

impl LumaPlane {
    pub fn from_buffer(buffer: &PixelBuffer) -> Self {
        Self {
            width: buffer.width(),
            height: buffer.height(),
            levels: buffer.pixels().map(|pixel| pixel.gray_level()).collect(),
        }
    }

    #[inline]
    pub fn at(&self, x: u32, y: u32) -> u8 {
        self.levels[(y * self.width + x) as usize]
    }

    /// Applies a 3x3 kernel centered on an interior pixel.
    pub fn convolve3(&self, x: u32, y: u32, kernel: &[i32; 9]) -> i32 {
        let mut sum = 0;
        for (i, weight) in kernel.iter().enumerate() {
            let px = x + (i as u32 % 3) - 1;
            let py = y + (i as u32 / 3) - 1;
            sum += self.at(px, py) as i32 * weight;
        }
        sum
    }

    /// Interior pixel coordinates, excluding the one-pixel border.
    pub fn interior(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let (width, height) = (self.width, self.height);
        (1..height.saturating_sub(1))
            .flat_map(move |y| (1..width.saturating_sub(1)).map(move |x| (x, y)))
    }

    /// Sobel gradient magnitude over the interior.
    pub fn sobel(&self) -> EdgeMap {
        let mut magnitudes = vec![0u8; self.levels.len()];
        for (x, y) in self.interior() {
            let gx = self.convolve3(x, y, &SOBEL_X) as f64;
            let gy = self.convolve3(x, y, &SOBEL_Y) as f64;
            let magnitude = (gx * gx + gy * gy).sqrt().min(255.0);
            magnitudes[(y * self.width + x) as usize] = magnitude as u8;
        }
        EdgeMap {
            width: self.width,
            height: self.height,
            magnitudes,
        }
    }
}

/// Gradient magnitude per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeMap {
    pub width: u32,
    pub height: u32,
    pub magnitudes: Vec<u8>,
}

impl EdgeMap {
    #[inline]
    pub fn at(&self, x: u32, y: u32) -> u8 {
        self.magnitudes[(y * self.width + x) as usize]
    }

    /// Whether a rounded sample point falls inside the map.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as f64 && y < self.height as f64
    }

    #[inline]
    pub fn is_strong(&self, x: u32, y: u32) -> bool {
        self.at(x, y) > STRONG_EDGE_THRESHOLD
    }

    pub fn strong_edge_count(&self) -> usize {
        self.magnitudes
            .iter()
            .filter(|&&magnitude| magnitude > STRONG_EDGE_THRESHOLD)
            .count()
    }

    /// Fraction of pixels that are strong edges, in [0, 1].
    pub fn edge_density(&self) -> f64 {
        self.strong_edge_count() as f64 / self.magnitudes.len() as f64
    }

    /// Mean magnitude over every pixel, border included.
    pub fn mean_strength(&self) -> f64 {
        let total: u64 = self.magnitudes.iter().map(|&magnitude| magnitude as u64).sum();
        total as f64 / self.magnitudes.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    fn vertical_split(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::from_fn(width, height, |x, _| {
            if x < width / 2 { Pixel::rgb(0, 0, 0) } else { Pixel::rgb(255, 255, 255) }
        })
        .unwrap()
    }

    #[test]
    fn flat_image_has_no_edges() {
        let white = PixelBuffer::uniform(10, 10, Pixel::rgb(255, 255, 255)).unwrap();
        let plane = LumaPlane::from_buffer(&white);
        let edges = plane.sobel();
        assert_eq!(edges.strong_edge_count(), 0);
        assert_eq!(edges.edge_density(), 0.0);
        assert_eq!(edges.mean_strength(), 0.0);
    }

    #[test]
    fn step_edge_saturates_along_the_boundary() {
        let plane = LumaPlane::from_buffer(&vertical_split(10, 10));
        let edges = plane.sobel();
        // Columns 4 and 5 straddle the step: |gx| = 4 * 255, clamped.
        for y in 1..9 {
            assert_eq!(edges.at(4, y), 255);
            assert_eq!(edges.at(5, y), 255);
            assert_eq!(edges.at(2, y), 0);
        }
        // Border rows are never convolved.
        assert_eq!(edges.at(4, 0), 0);
        assert_eq!(edges.strong_edge_count(), 16);
        assert!((edges.edge_density() - 0.16).abs() < 1e-12);
    }

    #[test]
    fn tiny_images_have_empty_interior() {
        let plane = LumaPlane::from_buffer(&vertical_split(2, 2));
        assert_eq!(plane.interior().count(), 0);
        assert_eq!(plane.sobel().strong_edge_count(), 0);
    }
}
