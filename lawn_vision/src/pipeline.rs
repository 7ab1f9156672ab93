// THEORY:
// The `pipeline` module is the top-level API of the scorer. It wires the stages of
// `core_modules` into one call and owns the policies that sit around them:
//
// 1.  **Stage order**: colors, then the shared luma plane and edge map, then patterns
//     and texture, then the health and weed aggregates, then the problem scores.
//     The color, pattern and texture stages read the buffer independently; only
//     health, weeds and problems depend on earlier results.
// 2.  **Failure policy**: `analyze_file` propagates decode errors. Falling back to the
//     canned `default_analysis()` is a separate, explicitly named entry point,
//     `analyze_file_or_default`, which also absorbs panics from the scoring stages.
//     Callers that cannot tell a real result from the fallback should not use it.
// 3.  **Comparison**: `analyze_enhanced` adds the image embedding and its neighbors in
//     a caller-owned `SimilarityIndex`. The index is only read; storing the new image
//     is left to the caller.
//
// An analyzer holds only its configuration. Every call allocates its own buffers, so
// one analyzer can be shared across threads and tasks.

use crate::advisor::{AIVisionAnalysis, VisionAdvisor};
use crate::config::AnalyzerConfig;
use crate::core_modules::color_classifier::analyze_colors;
use crate::core_modules::edge_map::LumaPlane;
use crate::core_modules::embedding::image_embedding;
use crate::core_modules::health::{calculate_health_metrics, detect_weeds};
use crate::core_modules::pattern_detector::analyze_patterns;
use crate::core_modules::pixel::pixel::PixelBuffer;
use crate::core_modules::problem_indicators::analyze_problem_indicators;
use crate::core_modules::similarity::{SimilarityIndex, community_validation, confidence_boost};
use crate::core_modules::synthetic::SyntheticEstimator;
use crate::core_modules::texture::analyze_texture;
use crate::decode;
use crate::error::{AnalysisError, Result};
use crate::report::{EnhancedAnalysisResult, ImageAnalysisResult};
use log::{debug, error, warn};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

/// Runs the full scoring pipeline over images.
#[derive(Debug, Clone, Default)]
pub struct LawnAnalyzer {
    config: AnalyzerConfig,
}

impl LawnAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Scores a decoded buffer. Never fails; the advisor is not consulted.
    pub fn analyze(&self, buffer: &PixelBuffer) -> ImageAnalysisResult {
        let mut synthetic = SyntheticEstimator::new(self.config.synthetic_seed);
        score(buffer, &mut synthetic)
    }

    /// Decodes an image, scaled down to the configured size limit.
    pub fn load(&self, path: &Path) -> Result<PixelBuffer> {
        decode::load_image(path, self.config.max_dimension)
    }

    /// Decodes and scores an image file. Decode errors propagate.
    pub fn analyze_file(&self, path: &Path) -> Result<ImageAnalysisResult> {
        let buffer = self.load(path)?;
        Ok(self.analyze(&buffer))
    }

    /// Normalized feature vector of a decoded buffer, for `SimilarityIndex` search.
    pub fn embed(&self, buffer: &PixelBuffer) -> Vec<f64> {
        image_embedding(buffer)
    }

    /// Scores a buffer and looks up its `top_k` nearest neighbors in `index`.
    pub fn analyze_enhanced(
        &self,
        buffer: &PixelBuffer,
        index: &SimilarityIndex,
        top_k: usize,
    ) -> EnhancedAnalysisResult {
        let analysis = self.analyze(buffer);
        let image_embedding = self.embed(buffer);
        let similar_images = index.find_similar(&image_embedding, top_k);
        debug!(
            "{} of {} indexed images returned as similar",
            similar_images.len(),
            index.len()
        );

        EnhancedAnalysisResult {
            analysis,
            confidence_boost: confidence_boost(&similar_images),
            community_validation: community_validation(&similar_images),
            image_embedding,
            similar_images,
        }
    }

    /// Like `analyze_file`, and attaches the advisor's record when
    /// `include_ai_vision` is set. A failing advisor never fails the analysis.
    /// Decoding and scoring run on the blocking pool.
    pub async fn analyze_file_with_advisor<A>(
        &self,
        path: &Path,
        advisor: &A,
    ) -> Result<ImageAnalysisResult>
    where
        A: VisionAdvisor + ?Sized,
    {
        let analyzer = self.clone();
        let path = path.to_path_buf();
        let (buffer, mut result) = tokio::task::spawn_blocking(move || {
            let buffer = analyzer.load(&path)?;
            let result = analyzer.analyze(&buffer);
            Ok::<_, AnalysisError>((buffer, result))
        })
        .await??;

        if self.config.include_ai_vision {
            result.ai_vision_analysis = Some(consult(advisor, &buffer).await);
        }
        Ok(result)
    }

    /// Fail-soft variant of `analyze_file`: any error or panic is logged and the
    /// canned `default_analysis()` is returned in its place.
    pub fn analyze_file_or_default(&self, path: &Path) -> ImageAnalysisResult {
        or_default(path, || self.analyze_file(path))
    }
}

/// Runs `analysis`, replacing an error or a panic with `default_analysis()`.
fn or_default<F>(path: &Path, analysis: F) -> ImageAnalysisResult
where
    F: FnOnce() -> Result<ImageAnalysisResult>,
{
    match panic::catch_unwind(AssertUnwindSafe(analysis)) {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => {
            error!(
                "analysis of {} failed, using default analysis: {}",
                path.display(),
                e
            );
            ImageAnalysisResult::default_analysis()
        }
        Err(_) => {
            error!(
                "analysis of {} panicked, using default analysis",
                path.display()
            );
            ImageAnalysisResult::default_analysis()
        }
    }
}

/// The scoring stages in order, over one buffer.
pub fn score(buffer: &PixelBuffer, synthetic: &mut SyntheticEstimator) -> ImageAnalysisResult {
    let (width, height) = (buffer.width(), buffer.height());

    // Stage 1: Color classes
    let color_analysis = analyze_colors(buffer);
    debug!(
        "colors: healthy {:.1}%, brown {:.1}%, yellow {:.1}%",
        color_analysis.healthy_green, color_analysis.dead_brown, color_analysis.stressed_yellow
    );

    // Stage 2: Shared grayscale and edges
    let plane = LumaPlane::from_buffer(buffer);
    let edges = plane.sobel();

    // Stage 3: Shapes
    let pattern_analysis = analyze_patterns(&plane, &edges, synthetic);
    debug!(
        "patterns: {} circles, edge density {:.3}, symmetry {:.3}",
        pattern_analysis.circular_spots,
        pattern_analysis.edge_density,
        pattern_analysis.symmetry_score
    );

    // Stage 4: Texture
    let texture_analysis = analyze_texture(&plane, &edges);
    debug!(
        "texture: sharpness {:.1}, entropy {:.2}, blade definition {:.2}",
        texture_analysis.sharpness,
        texture_analysis.entropy,
        texture_analysis.grass_blade_definition
    );

    // Stage 5: Aggregates
    let health_metrics = calculate_health_metrics(&color_analysis, &texture_analysis);
    let weed_detection = detect_weeds(&color_analysis, width, height, synthetic);
    debug!(
        "health {:.1}, weeds {:.1}%",
        health_metrics.overall_health, weed_detection.total_weed_percentage
    );

    // Stage 6: Problem scores
    let problem_indicators =
        analyze_problem_indicators(&color_analysis, &pattern_analysis, &texture_analysis);

    ImageAnalysisResult {
        color_analysis,
        pattern_analysis,
        texture_analysis,
        health_metrics,
        weed_detection,
        problem_indicators,
        ai_vision_analysis: None,
    }
}

/// Asks the advisor, substituting the unavailable record on failure.
pub async fn consult<A>(advisor: &A, buffer: &PixelBuffer) -> AIVisionAnalysis
where
    A: VisionAdvisor + ?Sized,
{
    match advisor.advise(buffer).await {
        Ok(analysis) => analysis,
        Err(e) => {
            warn!("vision advisor failed, continuing without it: {}", e);
            AIVisionAnalysis::unavailable()
        }
    }
}
