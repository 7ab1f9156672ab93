// THEORY:
// PLACEHOLDER OUTPUTS. Nothing produced in this module is measured from the image.
//
// Three fields of the analysis result look like spatial measurements but are filled
// with random numbers scaled by real aggregate scores:
//   - the placeholder contour list behind `contourCount`, `avgArea`, `areaVariance`
//   - the 20x20 `weedDensityMap`
//   - the `locations` of identified weed types
//
// They are kept because the stored analysis records carry them and downstream
// consumers read them. They are routed through `SyntheticEstimator` so that nobody
// mistakes them for detection output, and so tests can seed them. An unseeded
// estimator draws from OS entropy and reproduces the product's nondeterministic
// filler.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

pub const DENSITY_MAP_SIZE: usize = 20;
pub const MAX_WEED_LOCATIONS: usize = 20;

/// A contour stand-in with random area and perimeter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyntheticContour {
    pub area: f64,
    pub perimeter: f64,
}

/// A random point inside the image with a random radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeedLocation {
    pub x: u32,
    pub y: u32,
    pub radius: u32,
}

/// Source of every placeholder value in an analysis.
pub struct SyntheticEstimator {
    rng: StdRng,
}

impl SyntheticEstimator {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }

    /// One contour per hundred strong edge pixels.
    pub fn contours(&mut self, strong_edge_pixels: usize) -> Vec<SyntheticContour> {
        (0..strong_edge_pixels / 100)
            .map(|_| SyntheticContour {
                area: self.rng.r#gen::<f64>() * 1000.0 + 100.0,
                perimeter: self.rng.r#gen::<f64>() * 200.0 + 50.0,
            })
            .collect()
    }

    /// A 20x20 grid of `U[0,1) * total_weed_percentage / 100`.
    pub fn density_map(&mut self, total_weed_percentage: f64) -> Vec<Vec<f64>> {
        (0..DENSITY_MAP_SIZE)
            .map(|_| {
                (0..DENSITY_MAP_SIZE)
                    .map(|_| self.rng.r#gen::<f64>() * total_weed_percentage / 100.0)
                    .collect()
            })
            .collect()
    }

    /// Up to 20 points scattered uniformly over a `width` x `height` image.
    pub fn weed_locations(&mut self, width: u32, height: u32, count: usize) -> Vec<WeedLocation> {
        (0..count.min(MAX_WEED_LOCATIONS))
            .map(|_| WeedLocation {
                x: self.rng.gen_range(0..width.max(1)),
                y: self.rng.gen_range(0..height.max(1)),
                radius: self.rng.gen_range(5..25),
            })
            .collect()
    }
}
