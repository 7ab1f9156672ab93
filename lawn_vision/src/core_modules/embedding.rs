// THEORY:
// The `embedding` module turns an image into a fixed-length feature vector for
// image-to-image comparison. It is independent of the scoring stages: nothing here
// feeds a health or problem score. The vector is four blocks, concatenated in order
// and then L2-normalized:
//
// 1.  **Color** (102): 16-bin histograms of R, G, B, then H, S, V, each as a share of
//     all pixels; then the channel means and standard deviations scaled to [0, 1].
// 2.  **Texture** (259): a 256-bin local binary pattern histogram over the interior,
//     then three horizontal co-occurrence (GLCM) statistics: contrast, energy and
//     homogeneity.
// 3.  **Shape** (10): voted circle count and radius stats, line count, and stats of
//     the connected strong-edge components ("contours") larger than 50 pixels.
// 4.  **Spatial** (27): mean RGB of each cell of a 3x3 grid.
//
// The circle vote here is denser than the scorer's (radius step 3, center step 5,
// 24 samples) and ranks candidates by votes before suppressing near-duplicates, so
// the two detectors intentionally disagree.
//
// Every block is finite for any non-empty image. A block whose denominator would be
// zero (no interior, no neighbor pairs, cells narrower than a pixel) is filled with
// zeros, and an all-zero vector stays all zeros through `normalize`.

use crate::core_modules::edge_map::{EdgeMap, LumaPlane};
use crate::core_modules::pattern_detector::detect_lines;
use crate::core_modules::pixel::pixel::PixelBuffer;
use std::f64::consts::PI;

pub const HISTOGRAM_BINS: usize = 16;
pub const COLOR_FEATURES: usize = HISTOGRAM_BINS * 6 + 6;
pub const TEXTURE_FEATURES: usize = 256 + 3;
pub const SHAPE_FEATURES: usize = 10;
pub const SPATIAL_FEATURES: usize = GRID_SIZE * GRID_SIZE * 3;
pub const EMBEDDING_LEN: usize =
    COLOR_FEATURES + TEXTURE_FEATURES + SHAPE_FEATURES + SPATIAL_FEATURES;

const GRID_SIZE: usize = 3;
const EDGE_VOTE_THRESHOLD: u8 = 100;
const CONTOUR_EDGE_THRESHOLD: u8 = 128;
const MIN_CONTOUR_AREA: usize = 50;
const MIN_VOTED_RADIUS: u32 = 5;
const VOTED_RADIUS_STEP: u32 = 3;
const VOTED_CENTER_STEP: u32 = 5;
const VOTED_SAMPLE_ANGLE_STEP: usize = 15;
const VOTED_MIN_VOTES: u32 = 9;
const MAX_VOTED_CIRCLES: usize = 20;

/// A circle candidate with its vote count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotedCircle {
    pub x: u32,
    pub y: u32,
    pub radius: u32,
    pub votes: u32,
}

/// One 8-connected component of strong edge pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contour {
    /// Pixel count.
    pub area: usize,
    /// Closed path length through the pixels in visiting order.
    pub perimeter: f64,
    pub centroid: (f64, f64),
}

impl Contour {
    /// `4 pi A / P^2`: 1 for a perfect disk, lower for anything else.
    pub fn circularity(&self) -> f64 {
        if self.perimeter == 0.0 {
            return 0.0;
        }
        4.0 * PI * self.area as f64 / (self.perimeter * self.perimeter)
    }
}

/// The normalized feature vector of an image, `EMBEDDING_LEN` long.
pub fn image_embedding(buffer: &PixelBuffer) -> Vec<f64> {
    let plane = LumaPlane::from_buffer(buffer);
    let edges = plane.sobel();

    let mut features = Vec::with_capacity(EMBEDDING_LEN);
    features.extend(color_features(buffer));
    features.extend(texture_features(&plane));
    features.extend(shape_features(&edges));
    features.extend(spatial_features(buffer));
    normalize(&mut features);
    features
}

pub fn color_features(buffer: &PixelBuffer) -> Vec<f64> {
    let mut histograms = [[0usize; HISTOGRAM_BINS]; 6];
    let mut sums = [0.0f64; 3];

    for pixel in buffer.pixels() {
        let channels = [pixel.red, pixel.green, pixel.blue];
        for (channel, value) in channels.iter().enumerate() {
            histograms[channel][(*value >> 4) as usize] += 1;
            sums[channel] += *value as f64;
        }
        let hsv = pixel.hsv();
        histograms[3][bin(hsv.hue, 22.5)] += 1;
        histograms[4][bin(hsv.saturation, 6.25)] += 1;
        histograms[5][bin(hsv.value, 6.25)] += 1;
    }

    let total = buffer.pixel_count() as f64;
    let means = sums.map(|sum| sum / total);
    let mut squared_deviations = [0.0f64; 3];
    for pixel in buffer.pixels() {
        let channels = [pixel.red, pixel.green, pixel.blue];
        for (channel, value) in channels.iter().enumerate() {
            squared_deviations[channel] += (*value as f64 - means[channel]).powi(2);
        }
    }

    let mut features = Vec::with_capacity(COLOR_FEATURES);
    for histogram in &histograms {
        features.extend(histogram.iter().map(|&count| count as f64 / total));
    }
    features.extend(means.iter().map(|mean| mean / 255.0));
    features.extend(
        squared_deviations
            .iter()
            .map(|squared| (squared / total).sqrt() / 255.0),
    );
    features
}

// Saturation and value reach exactly 100, which would be a seventeenth bin.
fn bin(value: f64, width: f64) -> usize {
    ((value / width).floor().max(0.0) as usize).min(HISTOGRAM_BINS - 1)
}

pub fn texture_features(plane: &LumaPlane) -> Vec<f64> {
    let mut features = Vec::with_capacity(TEXTURE_FEATURES);
    features.extend(local_binary_patterns(plane));
    features.extend(glcm_features(plane));
    features
}

/// Share of interior pixels per 8-neighbor pattern. Bit `i` is set when neighbor `i`
/// (clockwise from the top-left) is at least as bright as the center.
pub fn local_binary_patterns(plane: &LumaPlane) -> [f64; 256] {
    const NEIGHBORS: [(i32, i32); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
        (-1, 0),
    ];

    let mut histogram = [0usize; 256];
    let mut total = 0usize;
    for (x, y) in plane.interior() {
        let center = plane.at(x, y);
        let mut pattern = 0usize;
        for (i, (dx, dy)) in NEIGHBORS.iter().enumerate() {
            let neighbor = plane.at((x as i32 + dx) as u32, (y as i32 + dy) as u32);
            if neighbor >= center {
                pattern |= 1 << i;
            }
        }
        histogram[pattern] += 1;
        total += 1;
    }

    let mut shares = [0.0; 256];
    if total > 0 {
        for (share, count) in shares.iter_mut().zip(histogram) {
            *share = count as f64 / total as f64;
        }
    }
    shares
}

/// Contrast, energy and homogeneity of the horizontal gray-level co-occurrence matrix.
pub fn glcm_features(plane: &LumaPlane) -> [f64; 3] {
    let (width, height) = (plane.width as usize, plane.height as usize);
    if width < 2 {
        return [0.0; 3];
    }

    let mut matrix = vec![0u32; 256 * 256];
    for row in plane.levels.chunks_exact(width) {
        for pair in row.windows(2) {
            matrix[pair[0] as usize * 256 + pair[1] as usize] += 1;
        }
    }

    let total = ((width - 1) * height) as f64;
    let (mut contrast, mut energy, mut homogeneity) = (0.0, 0.0, 0.0);
    for (index, &count) in matrix.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let p = count as f64 / total;
        let difference = (index / 256) as f64 - (index % 256) as f64;
        contrast += p * difference * difference;
        energy += p * p;
        homogeneity += p / (1.0 + difference.abs());
    }
    [contrast, energy, homogeneity]
}

pub fn shape_features(edges: &EdgeMap) -> Vec<f64> {
    let circles = detect_voted_circles(edges);
    let lines = detect_lines(edges);
    let contours = find_contours(edges);
    let longest_side = edges.width.max(edges.height) as f64;
    let area = (edges.width as usize * edges.height as usize) as f64;

    let mut features = Vec::with_capacity(SHAPE_FEATURES);
    features.push(circles.len() as f64 / 100.0);
    features.push(lines.count() as f64 / 100.0);

    let radii: Vec<f64> = circles.iter().map(|circle| circle.radius as f64).collect();
    features.extend(min_max_mean(&radii).map(|stat| stat / longest_side));

    features.push(contours.len() as f64 / 100.0);
    let areas: Vec<f64> = contours.iter().map(|contour| contour.area as f64).collect();
    features.extend(min_max_mean(&areas).map(|stat| stat / area));
    let circularities: Vec<f64> = contours.iter().map(Contour::circularity).collect();
    features.push(min_max_mean(&circularities)[2]);

    features
}

fn min_max_mean(values: &[f64]) -> [f64; 3] {
    if values.is_empty() {
        return [0.0; 3];
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    [min, max, mean]
}

/// Circle votes on a dense grid, strongest first, near-duplicates suppressed.
pub fn detect_voted_circles(edges: &EdgeMap) -> Vec<VotedCircle> {
    let (width, height) = (edges.width, edges.height);
    let max_radius = width.min(height) as f64 / 4.0;
    let mut candidates = Vec::new();

    let mut radius = MIN_VOTED_RADIUS;
    while (radius as f64) < max_radius {
        let mut y = radius;
        while y + radius < height {
            let mut x = radius;
            while x + radius < width {
                let votes = count_votes(edges, x, y, radius);
                if votes >= VOTED_MIN_VOTES {
                    candidates.push(VotedCircle { x, y, radius, votes });
                }
                x += VOTED_CENTER_STEP;
            }
            y += VOTED_CENTER_STEP;
        }
        radius += VOTED_RADIUS_STEP;
    }

    suppress_overlapping(candidates)
}

fn count_votes(edges: &EdgeMap, center_x: u32, center_y: u32, radius: u32) -> u32 {
    let mut votes = 0;
    for angle in (0..360).step_by(VOTED_SAMPLE_ANGLE_STEP) {
        let radians = angle as f64 * PI / 180.0;
        let px = (center_x as f64 + radius as f64 * radians.cos()).round();
        let py = (center_y as f64 + radius as f64 * radians.sin()).round();
        if edges.contains(px, py) && edges.at(px as u32, py as u32) > EDGE_VOTE_THRESHOLD {
            votes += 1;
        }
    }
    votes
}

fn suppress_overlapping(mut candidates: Vec<VotedCircle>) -> Vec<VotedCircle> {
    // Stable, so equal votes keep scan order.
    candidates.sort_by(|a, b| b.votes.cmp(&a.votes));

    let mut kept: Vec<VotedCircle> = Vec::new();
    for circle in candidates {
        let overlaps = kept.iter().any(|existing| {
            let dx = circle.x as f64 - existing.x as f64;
            let dy = circle.y as f64 - existing.y as f64;
            let distance = (dx * dx + dy * dy).sqrt();
            let larger = circle.radius.max(existing.radius) as f64;
            distance < larger * 0.5 && circle.radius.abs_diff(existing.radius) < 10
        });
        if !overlaps {
            kept.push(circle);
        }
    }
    kept.truncate(MAX_VOTED_CIRCLES);
    kept
}

/// Connected strong-edge components larger than `MIN_CONTOUR_AREA`, in scan order of
/// their first pixel.
pub fn find_contours(edges: &EdgeMap) -> Vec<Contour> {
    let (width, height) = (edges.width as i64, edges.height as i64);
    let mut visited = vec![false; edges.magnitudes.len()];
    let mut contours = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let index = (y * width + x) as usize;
            if visited[index] || edges.magnitudes[index] <= CONTOUR_EDGE_THRESHOLD {
                continue;
            }
            let points = trace_component(edges, &mut visited, x, y);
            if points.len() > MIN_CONTOUR_AREA {
                contours.push(contour_of(&points));
            }
        }
    }

    contours
}

// Depth-first flood fill. Neighbors are pushed row by row, so the visiting order
// (and with it the perimeter) is deterministic.
fn trace_component(
    edges: &EdgeMap,
    visited: &mut [bool],
    start_x: i64,
    start_y: i64,
) -> Vec<(i64, i64)> {
    let (width, height) = (edges.width as i64, edges.height as i64);
    let mut stack = vec![(start_x, start_y)];
    let mut points = Vec::new();

    while let Some((x, y)) = stack.pop() {
        if x < 0 || y < 0 || x >= width || y >= height {
            continue;
        }
        let index = (y * width + x) as usize;
        if visited[index] || edges.magnitudes[index] <= CONTOUR_EDGE_THRESHOLD {
            continue;
        }
        visited[index] = true;
        points.push((x, y));

        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx != 0 || dy != 0 {
                    stack.push((x + dx, y + dy));
                }
            }
        }
    }

    points
}

fn contour_of(points: &[(i64, i64)]) -> Contour {
    let count = points.len() as f64;
    let centroid = (
        points.iter().map(|&(x, _)| x as f64).sum::<f64>() / count,
        points.iter().map(|&(_, y)| y as f64).sum::<f64>() / count,
    );
    Contour {
        area: points.len(),
        perimeter: closed_path_length(points),
        centroid,
    }
}

fn closed_path_length(points: &[(i64, i64)]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }
    let next = points.iter().cycle().skip(1);
    points
        .iter()
        .zip(next)
        .map(|(&(x1, y1), &(x2, y2))| (((x2 - x1).pow(2) + (y2 - y1).pow(2)) as f64).sqrt())
        .sum()
}

/// Mean RGB of each cell of a 3x3 grid, row by row. Leftover pixels past the last
/// full cell are ignored.
pub fn spatial_features(buffer: &PixelBuffer) -> Vec<f64> {
    let cell_width = buffer.width() as usize / GRID_SIZE;
    let cell_height = buffer.height() as usize / GRID_SIZE;
    let mut features = Vec::with_capacity(SPATIAL_FEATURES);

    for grid_y in 0..GRID_SIZE {
        for grid_x in 0..GRID_SIZE {
            let mut sums = [0.0f64; 3];
            let mut count = 0usize;
            for y in grid_y * cell_height..(grid_y + 1) * cell_height {
                for x in grid_x * cell_width..(grid_x + 1) * cell_width {
                    let pixel = buffer.pixel(x as u32, y as u32);
                    sums[0] += pixel.red as f64;
                    sums[1] += pixel.green as f64;
                    sums[2] += pixel.blue as f64;
                    count += 1;
                }
            }
            if count == 0 {
                features.extend([0.0; 3]);
            } else {
                features.extend(sums.map(|sum| sum / count as f64 / 255.0));
            }
        }
    }

    features
}

/// Scales to unit length in place. A zero vector is left as is.
pub fn normalize(features: &mut [f64]) {
    let magnitude = features.iter().map(|value| value * value).sum::<f64>().sqrt();
    if magnitude > 0.0 {
        for value in features.iter_mut() {
            *value /= magnitude;
        }
    }
}

/// Cosine of the angle between two vectors. 0 when the lengths differ or either
/// vector has zero magnitude.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let (mut dot, mut norm_a, mut norm_b) = (0.0, 0.0, 0.0);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denominator = norm_a.sqrt() * norm_b.sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    dot / denominator
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    // hue ~78, sat ~76, val ~67.
    const HEALTHY: Pixel = Pixel { red: 130, green: 170, blue: 40, alpha: 255 };

    fn white_square(size: u32, from: u32, to: u32) -> PixelBuffer {
        PixelBuffer::from_fn(size, size, |x, y| {
            if (from..to).contains(&x) && (from..to).contains(&y) {
                Pixel::rgb(255, 255, 255)
            } else {
                Pixel::rgb(0, 0, 0)
            }
        })
        .unwrap()
    }

    #[test]
    fn embedding_has_fixed_length_and_unit_norm() {
        for buffer in [
            PixelBuffer::uniform(12, 9, HEALTHY).unwrap(),
            white_square(40, 10, 30),
            PixelBuffer::uniform(1, 1, Pixel::rgb(0, 0, 0)).unwrap(),
        ] {
            let embedding = image_embedding(&buffer);
            assert_eq!(embedding.len(), EMBEDDING_LEN);
            assert!(embedding.iter().all(|value| value.is_finite()));
            let norm = embedding.iter().map(|v| v * v).sum::<f64>().sqrt();
            assert!((norm - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn uniform_color_fills_one_bin_per_histogram() {
        let features = color_features(&PixelBuffer::uniform(12, 9, HEALTHY).unwrap());
        assert_eq!(features.len(), COLOR_FEATURES);
        // 130 >> 4, 170 >> 4, 40 >> 4, hue 78.5 / 22.5, sat 76.5 / 6.25, val 66.7 / 6.25.
        let expected_bins = [8, 10, 2, 3, 12, 10];
        for (histogram, bin) in expected_bins.iter().enumerate() {
            assert_eq!(features[histogram * HISTOGRAM_BINS + bin], 1.0);
        }
        assert_eq!(features.iter().take(96).sum::<f64>(), 6.0);
        assert!((features[96] - 130.0 / 255.0).abs() < 1e-12);
        assert_eq!(&features[99..], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn full_saturation_lands_in_the_last_bin() {
        let features = color_features(&PixelBuffer::uniform(2, 2, Pixel::rgb(255, 0, 0)).unwrap());
        // Saturation and value are both exactly 100.
        assert_eq!(features[4 * HISTOGRAM_BINS + 15], 1.0);
        assert_eq!(features[5 * HISTOGRAM_BINS + 15], 1.0);
    }

    #[test]
    fn flat_plane_is_one_pattern_and_one_cooccurrence() {
        let plane = LumaPlane::from_buffer(&PixelBuffer::uniform(6, 5, HEALTHY).unwrap());
        let patterns = local_binary_patterns(&plane);
        // Every neighbor ties the center, so all eight bits are set.
        assert_eq!(patterns[255], 1.0);
        assert_eq!(glcm_features(&plane), [0.0, 1.0, 1.0]);
    }

    #[test]
    fn alternating_columns_maximize_glcm_contrast() {
        let stripes = PixelBuffer::from_fn(3, 4, |x, _| {
            if x == 1 { Pixel::rgb(255, 255, 255) } else { Pixel::rgb(0, 0, 0) }
        })
        .unwrap();
        let [contrast, energy, homogeneity] = glcm_features(&LumaPlane::from_buffer(&stripes));
        assert_eq!(contrast, 65025.0);
        assert_eq!(energy, 0.5);
        assert_eq!(homogeneity, 1.0 / 256.0);
    }

    #[test]
    fn tiny_images_leave_texture_and_spatial_blocks_empty() {
        let buffer = PixelBuffer::uniform(2, 2, HEALTHY).unwrap();
        let plane = LumaPlane::from_buffer(&buffer);
        assert!(local_binary_patterns(&plane).iter().all(|&share| share == 0.0));
        assert!(spatial_features(&buffer).iter().all(|&mean| mean == 0.0));
        let single = LumaPlane::from_buffer(&PixelBuffer::uniform(1, 3, HEALTHY).unwrap());
        assert_eq!(glcm_features(&single), [0.0; 3]);
    }

    #[test]
    fn square_outline_is_one_contour() {
        let edges = LumaPlane::from_buffer(&white_square(40, 10, 30)).sobel();
        let contours = find_contours(&edges);
        assert_eq!(contours.len(), 1);
        // Two-pixel ring: 22x22 outer box minus the 18x18 flat interior.
        assert_eq!(contours[0].area, 160);
        assert!(contours[0].perimeter > 0.0);
        assert!(contours[0].circularity() > 0.0 && contours[0].circularity() < 1.0);
        assert!((contours[0].centroid.0 - 19.5).abs() < 1e-9);

        let shape = shape_features(&edges);
        assert_eq!(shape.len(), SHAPE_FEATURES);
        assert_eq!(shape[1], 0.0);
        assert_eq!(shape[5], 0.01);
        assert_eq!(shape[6], 160.0 / 1600.0);
    }

    #[test]
    fn flat_image_has_no_shapes() {
        let edges = LumaPlane::from_buffer(&PixelBuffer::uniform(30, 30, HEALTHY).unwrap()).sobel();
        assert!(detect_voted_circles(&edges).is_empty());
        assert!(find_contours(&edges).is_empty());
        assert!(shape_features(&edges).iter().all(|&value| value == 0.0));
    }

    #[test]
    fn disk_collects_circle_votes() {
        let disk = PixelBuffer::from_fn(60, 60, |x, y| {
            let (dx, dy) = (x as i32 - 30, y as i32 - 30);
            if dx * dx + dy * dy <= 100 {
                Pixel::rgb(255, 255, 255)
            } else {
                Pixel::rgb(0, 0, 0)
            }
        })
        .unwrap();
        let circles = detect_voted_circles(&LumaPlane::from_buffer(&disk).sobel());
        assert!(!circles.is_empty());
        assert!(circles.windows(2).all(|pair| pair[0].votes >= pair[1].votes));
    }

    #[test]
    fn spatial_grid_reports_cell_means() {
        // Left column of cells red, everything else blue.
        let buffer = PixelBuffer::from_fn(9, 6, |x, _| {
            if x < 3 { Pixel::rgb(255, 0, 0) } else { Pixel::rgb(0, 0, 255) }
        })
        .unwrap();
        let features = spatial_features(&buffer);
        assert_eq!(features.len(), SPATIAL_FEATURES);
        assert_eq!(&features[0..3], &[1.0, 0.0, 0.0]);
        assert_eq!(&features[3..6], &[0.0, 0.0, 1.0]);
        assert_eq!(&features[24..27], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn normalize_leaves_zero_vector_alone() {
        let mut zeros = vec![0.0; 4];
        normalize(&mut zeros);
        assert_eq!(zeros, vec![0.0; 4]);

        let mut values = vec![3.0, 4.0];
        normalize(&mut values);
        assert_eq!(values, vec![0.6, 0.8]);
    }

    #[test]
    fn cosine_similarity_edge_cases() {
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 1.0], &[-1.0, -1.0]) + 1.0).abs() < 1e-12);
    }
}
