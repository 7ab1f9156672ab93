// THEORY:
// The scoring stages, leaves first. Each module is synchronous and pure over the
// buffer it is handed; `pipeline` is the only place that wires them together.
// `embedding` and `similarity` sit beside the scorer and never feed a score.

pub mod pixel;
pub mod color_classifier;
pub mod edge_map;
pub mod synthetic;
pub mod pattern_detector;
pub mod texture;
pub mod health;
pub mod problem_indicators;
pub mod embedding;
pub mod similarity;
