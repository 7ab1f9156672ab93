//! The full analysis record and its canned fallback.

use crate::advisor::AIVisionAnalysis;
use crate::core_modules::color_classifier::{ColorAnalysis, DominantColor};
use crate::core_modules::health::{HealthMetrics, IdentifiedWeedType, WeedDetection};
use crate::core_modules::pattern_detector::PatternAnalysis;
use crate::core_modules::problem_indicators::ProblemIndicators;
use crate::core_modules::similarity::{
    CommunityValidation, EmbeddingMetadata, EmbeddingRecord, SimilarImage,
};
use crate::core_modules::synthetic::{DENSITY_MAP_SIZE, WeedLocation};
use crate::core_modules::texture::TextureAnalysis;
use serde::{Deserialize, Serialize};

/// Everything one analysis produces. Serializes to the camelCase JSON stored with
/// each submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysisResult {
    pub color_analysis: ColorAnalysis,
    pub pattern_analysis: PatternAnalysis,
    pub texture_analysis: TextureAnalysis,
    pub health_metrics: HealthMetrics,
    pub weed_detection: WeedDetection,
    pub problem_indicators: ProblemIndicators,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_vision_analysis: Option<AIVisionAnalysis>,
}

impl ImageAnalysisResult {
    /// Fixed record returned by the fail-soft entry point. Every value is a constant;
    /// none of it describes a real image.
    pub fn default_analysis() -> Self {
        Self {
            color_analysis: ColorAnalysis {
                healthy_green: 45.0,
                stressed_yellow: 15.0,
                dead_brown: 20.0,
                dark_green: 10.0,
                orange_rust: 0.0,
                bluish_gray: 5.0,
                bright_yellow_flowers: 2.0,
                white_flowers: 1.0,
                purple_flowers: 0.5,
                light_green_weeds: 8.0,
                very_dark_green: 3.0,
                dominant_colors: vec![
                    dominant("Green", 55.0, "#228B22"),
                    dominant("Brown", 25.0, "#8B4513"),
                    dominant("Yellow", 20.0, "#FFD700"),
                ],
            },
            pattern_analysis: PatternAnalysis {
                circular_spots: 2,
                circle_sizes: vec![25, 40],
                linear_patterns: 1,
                contour_count: 15,
                area_variance: 500.0,
                avg_area: 200.0,
                symmetry_score: 0.6,
                edge_density: 0.1,
            },
            texture_analysis: TextureAnalysis {
                sharpness: 120.0,
                uniformity: 0.5,
                roughness: 15.0,
                contrast: 80.0,
                homogeneity: 0.6,
                entropy: 6.5,
                grass_blade_definition: 6.0,
            },
            health_metrics: HealthMetrics {
                overall_health: 5.5,
                green_coverage: 55.0,
                brown_coverage: 20.0,
                yellow_coverage: 15.0,
                stress_indicators: 35.0,
                density_score: 4.5,
                vitality_index: 6.0,
            },
            weed_detection: WeedDetection {
                total_weed_percentage: 15.0,
                flower_coverage: 3.5,
                broadleaf_indicators: 3.5,
                grassy_weed_indicators: 8.0,
                creeping_weed_indicators: 0.5,
                weed_density_map: vec![vec![0.15; DENSITY_MAP_SIZE]; DENSITY_MAP_SIZE],
                identified_weed_types: vec![IdentifiedWeedType {
                    weed_type: "Broadleaf Weeds".to_string(),
                    confidence: 0.7,
                    locations: vec![WeedLocation { x: 100, y: 150, radius: 15 }],
                }],
            },
            problem_indicators: ProblemIndicators {
                dog_urine_spots: 30.0,
                dull_mower_blades: 25.0,
                fertilizer_burn: 10.0,
                grub_damage: 15.0,
                chinch_bugs: 20.0,
                brown_patch: 25.0,
                dollar_spot: 5.0,
                fairy_rings: 10.0,
                rust_fungus: 0.0,
                drought_stress: 35.0,
                overwatering: 15.0,
                compacted_soil: 30.0,
                thatch_buildup: 20.0,
                moss_invasion: 5.0,
            },
            ai_vision_analysis: None,
        }
    }

    pub fn to_json_pretty(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The highest-scoring problem, first on ties, with its score. `None` when every
    /// score is 0.
    pub fn primary_problem(&self) -> Option<(&'static str, f64)> {
        let mut best: Option<(&'static str, f64)> = None;
        for (name, score) in self.problem_indicators.named_scores() {
            if score > best.map_or(0.0, |(_, top)| top) {
                best = Some((name, score));
            }
        }
        best
    }

    /// Index record for this analysis: its primary problem, with the score on a 0-1
    /// scale as confidence. Unscored images are stored as "unknown" at 0.5.
    pub fn embedding_record(
        &self,
        id: impl Into<String>,
        image_url: impl Into<String>,
        embedding: Vec<f64>,
    ) -> EmbeddingRecord {
        let (problem_type, confidence) = match self.primary_problem() {
            Some((name, score)) => (name.to_string(), score / 100.0),
            None => ("unknown".to_string(), 0.5),
        };
        EmbeddingRecord {
            id: id.into(),
            embedding,
            metadata: EmbeddingMetadata {
                problem_type,
                confidence,
                reddit_post_id: None,
                image_url: image_url.into(),
                verified: false,
            },
        }
    }
}

/// A scored analysis together with its embedding and its nearest stored neighbors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhancedAnalysisResult {
    #[serde(flatten)]
    pub analysis: ImageAnalysisResult,
    pub image_embedding: Vec<f64>,
    pub similar_images: Vec<SimilarImage>,
    pub confidence_boost: f64,
    pub community_validation: CommunityValidation,
}

fn dominant(color: &str, percentage: f64, hex: &str) -> DominantColor {
    DominantColor {
        color: color.to_string(),
        percentage,
        hex: hex.to_string(),
    }
}
