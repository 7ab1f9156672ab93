// THEORY:
// This file is the main entry point for the `lawn_vision` library crate.
//
// The public surface is small: `LawnAnalyzer` for one image, `BatchAnalyzer` for
// many, `AnalyzerConfig` to tune them, and `ImageAnalysisResult` as the record both
// return. `SimilarityIndex` holds embeddings of past images for comparison. The
// scoring stages in `core_modules` are public so their records and pure functions
// can be reused on their own, but callers are expected to go through the analyzers.
//
// Scores are heuristic. They are derived from color shares, edge statistics and
// hand-tuned thresholds, not from a trained model, and several fields of the result
// are placeholders (see `core_modules::synthetic`).

pub mod advisor;
pub mod config;
pub mod core_modules;
pub mod decode;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;
pub mod report;

pub use advisor::{AIVisionAnalysis, SimulatedAdvisor, TreatmentUrgency, VisionAdvisor};
pub use config::AnalyzerConfig;
pub use core_modules::pixel::pixel::{Pixel, PixelBuffer};
pub use core_modules::similarity::{DEFAULT_TOP_K, EmbeddingRecord, SimilarImage, SimilarityIndex};
pub use error::{AnalysisError, ConfigError, Result};
pub use parallel_pipeline::BatchAnalyzer;
pub use pipeline::LawnAnalyzer;
pub use report::{EnhancedAnalysisResult, ImageAnalysisResult};
