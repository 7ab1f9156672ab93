// THEORY:
// The `ProblemIndicators` stage is the end of the scorer: fourteen independent
// scores, one per named lawn problem, each in [0, 100].
//
// Each scorer is a sum of fixed weights gated by fixed thresholds over the color,
// pattern and texture records. These constants ARE the diagnostic logic; there is
// no calibration data behind them, so they are kept exactly as chosen. Scores are
// not normalized against each other: several problems can score high at once.
//
// `rust_fungus` is the odd one out. It is a straight linear scale of the orange
// rust share, not a threshold sum.
//
// Every scorer ends in `clamp_score`, which also maps NaN to 0, so out-of-range
// inputs cannot push a score outside [0, 100].

use crate::core_modules::color_classifier::ColorAnalysis;
use crate::core_modules::pattern_detector::PatternAnalysis;
use crate::core_modules::texture::TextureAnalysis;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemIndicators {
    pub dog_urine_spots: f64,
    pub dull_mower_blades: f64,
    pub fertilizer_burn: f64,
    pub grub_damage: f64,
    pub chinch_bugs: f64,
    pub brown_patch: f64,
    pub dollar_spot: f64,
    pub fairy_rings: f64,
    pub rust_fungus: f64,
    pub drought_stress: f64,
    pub overwatering: f64,
    pub compacted_soil: f64,
    pub thatch_buildup: f64,
    pub moss_invasion: f64,
}

impl ProblemIndicators {
    /// Display name and score for every problem, in declaration order.
    pub fn named_scores(&self) -> [(&'static str, f64); 14] {
        [
            ("Dog urine spots", self.dog_urine_spots),
            ("Dull mower blades", self.dull_mower_blades),
            ("Fertilizer burn", self.fertilizer_burn),
            ("Grub damage", self.grub_damage),
            ("Chinch bugs", self.chinch_bugs),
            ("Brown patch", self.brown_patch),
            ("Dollar spot", self.dollar_spot),
            ("Fairy rings", self.fairy_rings),
            ("Rust fungus", self.rust_fungus),
            ("Drought stress", self.drought_stress),
            ("Overwatering", self.overwatering),
            ("Compacted soil", self.compacted_soil),
            ("Thatch buildup", self.thatch_buildup),
            ("Moss invasion", self.moss_invasion),
        ]
    }
}

pub fn analyze_problem_indicators(
    colors: &ColorAnalysis,
    patterns: &PatternAnalysis,
    texture: &TextureAnalysis,
) -> ProblemIndicators {
    ProblemIndicators {
        dog_urine_spots: dog_urine_spots(colors, patterns),
        dull_mower_blades: dull_mower_blades(texture, colors),
        fertilizer_burn: fertilizer_burn(colors, patterns),
        grub_damage: grub_damage(colors, patterns),
        chinch_bugs: chinch_bugs(colors),
        brown_patch: brown_patch(colors, patterns),
        dollar_spot: dollar_spot(patterns),
        fairy_rings: fairy_rings(colors, patterns),
        rust_fungus: rust_fungus(colors),
        drought_stress: drought_stress(colors, texture),
        overwatering: overwatering(colors),
        compacted_soil: compacted_soil(colors, texture),
        thatch_buildup: thatch_buildup(texture),
        moss_invasion: moss_invasion(colors, texture),
    }
}

/// Clamps to [0, 100]; NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    score.max(0.0).min(100.0)
}

fn count_radii(patterns: &PatternAnalysis, predicate: impl Fn(u32) -> bool) -> usize {
    patterns
        .circle_sizes
        .iter()
        .filter(|&&radius| predicate(radius))
        .count()
}

pub fn dog_urine_spots(colors: &ColorAnalysis, patterns: &PatternAnalysis) -> f64 {
    let mut score = 0.0;
    if patterns.circular_spots > 0 {
        let small_circles = count_radii(patterns, |radius| (15..=100).contains(&radius));
        score += (small_circles as f64 * 10.0).min(40.0);
    }
    // Dark green ring around a brown center.
    if colors.dark_green > 2.0 && colors.dead_brown > 3.0 {
        score += 30.0;
    }
    if patterns.circular_spots > 2 {
        score += 20.0;
    }
    clamp_score(score)
}

pub fn dull_mower_blades(texture: &TextureAnalysis, colors: &ColorAnalysis) -> f64 {
    let mut score = 0.0;
    if texture.grass_blade_definition < 5.0 {
        score += 40.0;
    }
    if texture.sharpness < 100.0 {
        score += 30.0;
    }
    // Torn, browning tips.
    if colors.dead_brown > 15.0 && colors.stressed_yellow > 10.0 {
        score += 30.0;
    }
    clamp_score(score)
}

pub fn fertilizer_burn(colors: &ColorAnalysis, patterns: &PatternAnalysis) -> f64 {
    let mut score = 0.0;
    // Application streaks.
    if patterns.linear_patterns > 3 {
        score += 40.0;
    }
    if colors.stressed_yellow > 20.0 || colors.dead_brown > 15.0 {
        score += 30.0;
    }
    if patterns.symmetry_score < 0.5 {
        score += 30.0;
    }
    clamp_score(score)
}

pub fn grub_damage(colors: &ColorAnalysis, patterns: &PatternAnalysis) -> f64 {
    let mut score = 0.0;
    if colors.dead_brown > 25.0 && patterns.avg_area > 500.0 {
        score += 60.0;
    }
    if patterns.area_variance > 1000.0 {
        score += 40.0;
    }
    clamp_score(score)
}

pub fn chinch_bugs(colors: &ColorAnalysis) -> f64 {
    let mut score = 0.0;
    if colors.stressed_yellow > 15.0 && colors.dead_brown > 10.0 {
        score += 70.0;
    }
    if colors.stressed_yellow > 20.0 {
        score += 30.0;
    }
    clamp_score(score)
}

pub fn brown_patch(colors: &ColorAnalysis, patterns: &PatternAnalysis) -> f64 {
    let mut score = 0.0;
    if patterns.circular_spots > 0 {
        let large_circles = count_radii(patterns, |radius| radius > 50);
        score += (large_circles as f64 * 25.0).min(50.0);
    }
    if colors.dead_brown > 20.0 {
        score += 30.0;
    }
    // Smoky ring edges.
    if patterns.area_variance > 500.0 {
        score += 20.0;
    }
    clamp_score(score)
}

pub fn dollar_spot(patterns: &PatternAnalysis) -> f64 {
    let mut score = 0.0;
    if patterns.circular_spots > 5 {
        let small_circles = count_radii(patterns, |radius| radius < 30);
        if small_circles as f64 >= patterns.circular_spots as f64 * 0.7 {
            score += 80.0;
        }
    }
    clamp_score(score)
}

pub fn fairy_rings(colors: &ColorAnalysis, patterns: &PatternAnalysis) -> f64 {
    let mut score = 0.0;
    if patterns.circular_spots > 0 && patterns.area_variance < 1000.0 {
        score += 40.0;
    }
    if colors.dark_green > 5.0 {
        score += 30.0;
    }
    if patterns.symmetry_score > 0.7 {
        score += 30.0;
    }
    clamp_score(score)
}

/// Linear in the orange share: 10 points per percent.
pub fn rust_fungus(colors: &ColorAnalysis) -> f64 {
    clamp_score(colors.orange_rust * 10.0)
}

pub fn drought_stress(colors: &ColorAnalysis, texture: &TextureAnalysis) -> f64 {
    let mut score = 0.0;
    if colors.bluish_gray > 10.0 {
        score += 40.0;
    }
    if colors.stressed_yellow > 25.0 || colors.dead_brown > 30.0 {
        score += 30.0;
    }
    if texture.grass_blade_definition < 4.0 {
        score += 30.0;
    }
    clamp_score(score)
}

pub fn overwatering(colors: &ColorAnalysis) -> f64 {
    let mut score = 0.0;
    if colors.stressed_yellow > 20.0 {
        score += 50.0;
    }
    if colors.healthy_green < 30.0 {
        score += 30.0;
    }
    if colors.dead_brown > 15.0 {
        score += 20.0;
    }
    clamp_score(score)
}

pub fn compacted_soil(colors: &ColorAnalysis, texture: &TextureAnalysis) -> f64 {
    let mut score = 0.0;
    if colors.healthy_green < 40.0 {
        score += 40.0;
    }
    if texture.uniformity < 0.3 {
        score += 30.0;
    }
    if colors.stressed_yellow + colors.dead_brown > 30.0 {
        score += 30.0;
    }
    clamp_score(score)
}

pub fn thatch_buildup(texture: &TextureAnalysis) -> f64 {
    let mut score = 0.0;
    if texture.homogeneity > 0.8 {
        score += 50.0;
    }
    if texture.contrast < 100.0 {
        score += 30.0;
    }
    if texture.uniformity > 0.7 && texture.sharpness < 150.0 {
        score += 20.0;
    }
    clamp_score(score)
}

pub fn moss_invasion(colors: &ColorAnalysis, texture: &TextureAnalysis) -> f64 {
    let mut score = 0.0;
    if colors.healthy_green > 60.0 && texture.uniformity < 0.4 {
        score += 60.0;
    }
    // Soft, matted surface.
    if texture.roughness < 10.0 && texture.homogeneity > 0.7 {
        score += 40.0;
    }
    clamp_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn colors(value: f64) -> ColorAnalysis {
        ColorAnalysis {
            healthy_green: value,
            stressed_yellow: value,
            dead_brown: value,
            dark_green: value,
            orange_rust: value,
            bluish_gray: value,
            bright_yellow_flowers: value,
            white_flowers: value,
            purple_flowers: value,
            light_green_weeds: value,
            very_dark_green: value,
            dominant_colors: Vec::new(),
        }
    }

    fn patterns(circle_sizes: Vec<u32>) -> PatternAnalysis {
        PatternAnalysis {
            circular_spots: circle_sizes.len(),
            circle_sizes,
            linear_patterns: 0,
            contour_count: 0,
            area_variance: 0.0,
            avg_area: 0.0,
            symmetry_score: 0.6,
            edge_density: 0.0,
        }
    }

    fn texture(value: f64) -> TextureAnalysis {
        TextureAnalysis {
            sharpness: value,
            uniformity: value,
            roughness: value,
            contrast: value,
            homogeneity: value,
            entropy: value,
            grass_blade_definition: value,
        }
    }

    fn all_scores(indicators: &ProblemIndicators) -> Vec<f64> {
        indicators.named_scores().iter().map(|(_, score)| *score).collect()
    }

    #[test]
    fn scores_stay_in_range_for_extreme_inputs() {
        let extremes = [
            f64::NEG_INFINITY,
            -1e9,
            -1.0,
            0.0,
            0.5,
            1e9,
            f64::INFINITY,
            f64::NAN,
        ];
        for &value in &extremes {
            for sizes in [vec![], vec![5, 20, 60], vec![10; 20], vec![200; 20]] {
                let mut pattern = patterns(sizes);
                pattern.area_variance = value;
                pattern.avg_area = value;
                pattern.symmetry_score = value;
                pattern.linear_patterns = 9;
                let indicators =
                    analyze_problem_indicators(&colors(value), &pattern, &texture(value));
                for score in all_scores(&indicators) {
                    assert!((0.0..=100.0).contains(&score), "value {} gave {}", value, score);
                }
            }
        }
    }

    #[test]
    fn dog_urine_counts_mid_sized_circles() {
        let mut c = colors(0.0);
        assert_eq!(dog_urine_spots(&c, &patterns(vec![20])), 10.0);
        assert_eq!(dog_urine_spots(&c, &patterns(vec![10, 20])), 10.0);
        // Three circles: 30 for sizes + 20 for multiplicity.
        assert_eq!(dog_urine_spots(&c, &patterns(vec![15, 50, 100])), 50.0);
        c.dark_green = 3.0;
        c.dead_brown = 4.0;
        // 40 (capped) + 30 + 20.
        assert_eq!(dog_urine_spots(&c, &patterns(vec![20; 6])), 90.0);
    }

    #[test]
    fn rust_fungus_is_linear_then_clamped() {
        let mut c = colors(0.0);
        c.orange_rust = 4.2;
        assert!((rust_fungus(&c) - 42.0).abs() < 1e-9);
        c.orange_rust = 30.0;
        assert_eq!(rust_fungus(&c), 100.0);
        c.orange_rust = f64::NAN;
        assert_eq!(rust_fungus(&c), 0.0);
    }

    #[test]
    fn dollar_spot_needs_mostly_small_circles() {
        assert_eq!(dollar_spot(&patterns(vec![10; 6])), 80.0);
        assert_eq!(dollar_spot(&patterns(vec![10; 5])), 0.0);
        assert_eq!(dollar_spot(&patterns(vec![10, 10, 10, 10, 40, 40])), 0.0);
    }

    #[test]
    fn brown_patch_caps_large_circle_weight() {
        let c = colors(0.0);
        assert_eq!(brown_patch(&c, &patterns(vec![60])), 25.0);
        assert_eq!(brown_patch(&c, &patterns(vec![60, 70, 80])), 50.0);
    }

    #[test]
    fn fertilizer_burn_ignores_unimplemented_lines() {
        let c = colors(0.0);
        let mut p = patterns(vec![]);
        p.symmetry_score = 0.4;
        assert_eq!(fertilizer_burn(&c, &p), 30.0);
        p.linear_patterns = 4;
        assert_eq!(fertilizer_burn(&c, &p), 70.0);
    }

    #[test]
    fn healthy_lawn_scores_low_on_stress_problems() {
        let mut c = colors(0.0);
        c.healthy_green = 70.0;
        let mut t = texture(0.0);
        t.sharpness = 400.0;
        t.grass_blade_definition = 6.0;
        t.uniformity = 0.05;
        t.contrast = 200.0;
        t.roughness = 25.0;
        t.homogeneity = 0.2;
        let indicators = analyze_problem_indicators(&c, &patterns(vec![]), &t);
        assert_eq!(indicators.chinch_bugs, 0.0);
        assert_eq!(indicators.overwatering, 0.0);
        assert_eq!(indicators.drought_stress, 0.0);
        assert_eq!(indicators.dull_mower_blades, 0.0);
        assert_eq!(indicators.thatch_buildup, 0.0);
        assert_eq!(indicators.moss_invasion, 60.0);
        assert_eq!(indicators.compacted_soil, 30.0);
    }

    #[test]
    fn threshold_sums_reach_full_scale() {
        let mut c = colors(0.0);
        c.stressed_yellow = 30.0;
        c.dead_brown = 35.0;
        c.bluish_gray = 12.0;
        assert_eq!(chinch_bugs(&c), 100.0);
        assert_eq!(overwatering(&c), 100.0);
        assert_eq!(drought_stress(&c, &texture(0.0)), 100.0);
    }
}
