// THEORY:
// Health and weed aggregation. Both records are pure functions of earlier stages;
// neither reads pixels.
//
// The formulas are hand-tuned constants with no derivation behind them. They are
// written out literally below so a change to any weight shows up in review.
// Reported values are rounded to one decimal place, as stored analysis records
// carry them.

use crate::core_modules::color_classifier::ColorAnalysis;
use crate::core_modules::synthetic::{SyntheticEstimator, WeedLocation};
use crate::core_modules::texture::TextureAnalysis;
use serde::{Deserialize, Serialize};

const HEALTH_BASELINE: f64 = 5.0;
const MAX_WEED_PERCENTAGE: f64 = 85.0;
const BROADLEAF_FLOWER_THRESHOLD: f64 = 2.0;
const GRASSY_VARIATION_THRESHOLD: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    /// 1-10.
    pub overall_health: f64,
    pub green_coverage: f64,
    pub brown_coverage: f64,
    pub yellow_coverage: f64,
    pub stress_indicators: f64,
    /// 0-10.
    pub density_score: f64,
    pub vitality_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifiedWeedType {
    #[serde(rename = "type")]
    pub weed_type: String,
    pub confidence: f64,
    /// Placeholder points, not detections.
    pub locations: Vec<WeedLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeedDetection {
    /// Never above 85.
    pub total_weed_percentage: f64,
    pub flower_coverage: f64,
    pub broadleaf_indicators: f64,
    pub grassy_weed_indicators: f64,
    pub creeping_weed_indicators: f64,
    /// 20x20 placeholder grid, not derived from pixel positions.
    pub weed_density_map: Vec<Vec<f64>>,
    pub identified_weed_types: Vec<IdentifiedWeedType>,
}

pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

pub fn calculate_health_metrics(
    colors: &ColorAnalysis,
    texture: &TextureAnalysis,
) -> HealthMetrics {
    let green_coverage = colors.healthy_green + colors.dark_green;
    let brown_coverage = colors.dead_brown;
    let yellow_coverage = colors.stressed_yellow;
    let stress_indicators = brown_coverage + yellow_coverage + colors.bluish_gray;

    let overall_health = (HEALTH_BASELINE + green_coverage / 20.0 - stress_indicators / 15.0
        + texture.sharpness / 200.0)
        .clamp(1.0, 10.0);
    let density_score = (green_coverage / 10.0 - stress_indicators / 20.0).clamp(0.0, 10.0);
    let vitality_index = (texture.grass_blade_definition + texture.sharpness / 100.0) / 2.0;

    HealthMetrics {
        overall_health: round_tenth(overall_health),
        green_coverage: round_tenth(green_coverage),
        brown_coverage: round_tenth(brown_coverage),
        yellow_coverage: round_tenth(yellow_coverage),
        stress_indicators: round_tenth(stress_indicators),
        density_score: round_tenth(density_score),
        vitality_index: round_tenth(vitality_index),
    }
}

/// Weed estimate from flower-like and off-green color shares.
///
/// Only the scalar percentages are measurements. The density map and the weed
/// locations come from `synthetic` and are placeholders.
pub fn detect_weeds(
    colors: &ColorAnalysis,
    width: u32,
    height: u32,
    synthetic: &mut SyntheticEstimator,
) -> WeedDetection {
    let flower_coverage =
        colors.bright_yellow_flowers + colors.white_flowers + colors.purple_flowers;
    let color_variation = colors.light_green_weeds + colors.very_dark_green;
    let total_weed_percentage = total_weed_percentage(flower_coverage, color_variation);

    let weed_density_map = synthetic.density_map(total_weed_percentage);

    let mut identified_weed_types = Vec::new();
    if flower_coverage > BROADLEAF_FLOWER_THRESHOLD {
        identified_weed_types.push(IdentifiedWeedType {
            weed_type: "Broadleaf Weeds".to_string(),
            confidence: (flower_coverage / 5.0 + 0.3).min(0.9),
            locations: synthetic.weed_locations(width, height, flower_coverage.floor() as usize),
        });
    }
    if color_variation > GRASSY_VARIATION_THRESHOLD {
        identified_weed_types.push(IdentifiedWeedType {
            weed_type: "Grassy Weeds".to_string(),
            confidence: (color_variation / 15.0 + 0.2).min(0.8),
            locations: synthetic.weed_locations(
                width,
                height,
                (color_variation / 2.0).floor() as usize,
            ),
        });
    }

    WeedDetection {
        total_weed_percentage: round_tenth(total_weed_percentage),
        flower_coverage: round_tenth(flower_coverage),
        broadleaf_indicators: round_tenth(flower_coverage),
        grassy_weed_indicators: round_tenth(color_variation),
        creeping_weed_indicators: round_tenth(colors.purple_flowers),
        weed_density_map,
        identified_weed_types,
    }
}

/// `min(85, flowers * 2 + variation * 0.8)`. NaN inputs collapse to the cap.
pub fn total_weed_percentage(flower_coverage: f64, color_variation: f64) -> f64 {
    (flower_coverage * 2.0 + color_variation * 0.8).min(MAX_WEED_PERCENTAGE)
}
