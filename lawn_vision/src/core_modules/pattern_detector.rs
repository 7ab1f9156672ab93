// THEORY:
// The `PatternDetector` is the spatial-shape stage. It reads the shared `LumaPlane`
// and `EdgeMap` and reports a `PatternAnalysis`.
//
// What is real and what is not:
// 1.  **Circles** (real, coarse): a brute-force accumulator. Radii step by 5 from 10
//     up to a quarter of the short side; centers sit on a 10-pixel grid; each
//     candidate samples 12 points on its circumference (every 30 degrees) and is
//     accepted when at least 9 land on a strong edge. The first 20 accepted, in scan
//     order, are kept. Not the best 20.
// 2.  **Lines**: not implemented. `detect_lines` says so in its return type rather
//     than pretending to have looked and found nothing.
// 3.  **Contours**: placeholder. The count is strong-edge-pixels / 100 and the areas
//     are random, supplied by `SyntheticEstimator`.
// 4.  **Symmetry** (real): mirror about the vertical center line, average
//     `(255 - |left - right|) / 255` over mirrored pairs.
// 5.  **Edge density** (real): share of strong edge pixels.

use crate::core_modules::edge_map::{EdgeMap, LumaPlane};
use crate::core_modules::synthetic::{SyntheticContour, SyntheticEstimator};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const MIN_CIRCLE_RADIUS: u32 = 10;
const CIRCLE_RADIUS_STEP: u32 = 5;
const CIRCLE_CENTER_STEP: u32 = 10;
const CIRCLE_SAMPLE_ANGLE_STEP: u32 = 30;
const CIRCLE_MIN_VOTES: u32 = 9;
const MAX_REPORTED_CIRCLES: usize = 20;

/// A circle candidate that collected enough edge votes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Circle {
    pub x: u32,
    pub y: u32,
    pub radius: u32,
}

/// A straight segment. No detector produces these yet.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

/// Outcome of line detection.
#[derive(Debug, Clone, PartialEq)]
pub enum LineDetection {
    /// No line detector exists; `linearPatterns` is reported as 0.
    Unimplemented,
    Detected(Vec<LineSegment>),
}

impl LineDetection {
    pub fn count(&self) -> usize {
        match self {
            LineDetection::Unimplemented => 0,
            LineDetection::Detected(lines) => lines.len(),
        }
    }
}

/// Shape-level features of the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternAnalysis {
    pub circular_spots: usize,
    /// Radii of the reported circles, in scan order.
    pub circle_sizes: Vec<u32>,
    /// Always 0 until a line detector exists.
    pub linear_patterns: usize,
    /// Placeholder count, see `SyntheticEstimator::contours`.
    pub contour_count: usize,
    pub area_variance: f64,
    pub avg_area: f64,
    pub symmetry_score: f64,
    pub edge_density: f64,
}

pub fn analyze_patterns(
    plane: &LumaPlane,
    edges: &EdgeMap,
    synthetic: &mut SyntheticEstimator,
) -> PatternAnalysis {
    let circles = detect_circles(edges);
    let lines = detect_lines(edges);
    let contours = synthetic.contours(edges.strong_edge_count());

    let avg_area = if contours.is_empty() {
        0.0
    } else {
        contours.iter().map(|contour| contour.area).sum::<f64>() / contours.len() as f64
    };

    PatternAnalysis {
        circular_spots: circles.len(),
        circle_sizes: circles.iter().map(|circle| circle.radius).collect(),
        linear_patterns: lines.count(),
        contour_count: contours.len(),
        area_variance: area_variance(&contours),
        avg_area,
        symmetry_score: symmetry_score(plane),
        edge_density: edges.edge_density(),
    }
}

/// Coarse circle accumulator over the strong edges.
pub fn detect_circles(edges: &EdgeMap) -> Vec<Circle> {
    let (width, height) = (edges.width, edges.height);
    let max_radius = width.min(height) as f64 / 4.0;
    let mut circles = Vec::new();

    let mut radius = MIN_CIRCLE_RADIUS;
    while (radius as f64) < max_radius {
        let mut y = radius;
        while y + radius < height {
            let mut x = radius;
            while x + radius < width {
                if circle_votes(edges, x, y, radius) >= CIRCLE_MIN_VOTES {
                    circles.push(Circle { x, y, radius });
                    if circles.len() == MAX_REPORTED_CIRCLES {
                        return circles;
                    }
                }
                x += CIRCLE_CENTER_STEP;
            }
            y += CIRCLE_CENTER_STEP;
        }
        radius += CIRCLE_RADIUS_STEP;
    }

    circles
}

fn circle_votes(edges: &EdgeMap, center_x: u32, center_y: u32, radius: u32) -> u32 {
    let mut votes = 0;
    for angle in (0..360).step_by(CIRCLE_SAMPLE_ANGLE_STEP as usize) {
        let radians = angle as f64 * PI / 180.0;
        let px = (center_x as f64 + radius as f64 * radians.cos()).round();
        let py = (center_y as f64 + radius as f64 * radians.sin()).round();
        if edges.contains(px, py) && edges.is_strong(px as u32, py as u32) {
            votes += 1;
        }
    }
    votes
}

// TODO: Hough line transform over `edges`; fertilizer-burn scoring already reads the count.
pub fn detect_lines(_edges: &EdgeMap) -> LineDetection {
    LineDetection::Unimplemented
}

/// Population variance of contour areas, 0 when there are none.
pub fn area_variance(contours: &[SyntheticContour]) -> f64 {
    if contours.is_empty() {
        return 0.0;
    }
    let count = contours.len() as f64;
    let mean = contours.iter().map(|contour| contour.area).sum::<f64>() / count;
    contours
        .iter()
        .map(|contour| (contour.area - mean).powi(2))
        .sum::<f64>()
        / count
}

/// Left/right mirror similarity in [0, 1]. A one-pixel-wide image is trivially symmetric.
pub fn symmetry_score(plane: &LumaPlane) -> f64 {
    let center_x = plane.width / 2;
    if center_x == 0 {
        return 1.0;
    }

    let mut score = 0.0;
    for y in 0..plane.height {
        for x in 0..center_x {
            let left = plane.at(x, y) as f64;
            let right = plane.at(plane.width - 1 - x, y) as f64;
            score += (255.0 - (left - right).abs()) / 255.0;
        }
    }
    score / (plane.height as f64 * center_x as f64)
}
