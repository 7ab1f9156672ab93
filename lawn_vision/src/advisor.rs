// THEORY:
// A `VisionAdvisor` is an outside opinion about a lawn photo, such as a hosted vision
// model. It is the only asynchronous step of a single analysis and the only one that
// is allowed to fail without failing the analysis: the pipeline swaps in
// `AIVisionAnalysis::unavailable()` and keeps the scored result.
//
// The product never wired a real model; it returns a canned record after a pause.
// `SimulatedAdvisor` reproduces that record so results carry the same shape.

use crate::core_modules::pixel::pixel::PixelBuffer;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TreatmentUrgency {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIVisionAnalysis {
    pub description: String,
    pub identified_problems: Vec<String>,
    pub confidence: f64,
    pub recommendations: Vec<String>,
    pub grass_type: String,
    pub seasonal_factors: Vec<String>,
    pub environmental_conditions: Vec<String>,
    pub treatment_urgency: TreatmentUrgency,
}

impl AIVisionAnalysis {
    /// Stand-in record used when the advisor could not answer.
    pub fn unavailable() -> Self {
        Self {
            description: "AI vision analysis unavailable - using advanced image processing instead"
                .to_string(),
            identified_problems: Vec::new(),
            confidence: 0.3,
            recommendations: vec![
                "Analysis based on color and pattern detection".to_string(),
                "Consider professional lawn assessment for complex issues".to_string(),
            ],
            grass_type: "Unknown".to_string(),
            seasonal_factors: Vec::new(),
            environmental_conditions: Vec::new(),
            treatment_urgency: TreatmentUrgency::Medium,
        }
    }
}

#[async_trait::async_trait]
pub trait VisionAdvisor: Send + Sync {
    async fn advise(&self, buffer: &PixelBuffer) -> Result<AIVisionAnalysis>;
}

/// Canned advisor. Optionally waits before answering, like the hosted call it replaces.
#[derive(Debug, Clone, Default)]
pub struct SimulatedAdvisor {
    latency: Duration,
}

impl SimulatedAdvisor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

#[async_trait::async_trait]
impl VisionAdvisor for SimulatedAdvisor {
    async fn advise(&self, _buffer: &PixelBuffer) -> Result<AIVisionAnalysis> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(AIVisionAnalysis {
            description: "Advanced computer vision analysis completed. Multiple lawn health indicators detected and analyzed."
                .to_string(),
            identified_problems: vec![
                "Color variation detected".to_string(),
                "Texture analysis completed".to_string(),
                "Pattern recognition performed".to_string(),
            ],
            confidence: 0.8,
            recommendations: vec![
                "Continue with image-based analysis".to_string(),
                "Consider professional assessment for complex cases".to_string(),
            ],
            grass_type: "Mixed/Cool Season".to_string(),
            seasonal_factors: vec!["Current growing season conditions".to_string()],
            environmental_conditions: vec!["Moderate stress indicators".to_string()],
            treatment_urgency: TreatmentUrgency::Medium,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::Pixel;

    #[tokio::test]
    async fn simulated_advisor_returns_canned_record() {
        let buffer = PixelBuffer::uniform(2, 2, Pixel::rgb(0, 0, 0)).unwrap();
        let analysis = SimulatedAdvisor::new().advise(&buffer).await.unwrap();
        assert_eq!(analysis.confidence, 0.8);
        assert_eq!(analysis.grass_type, "Mixed/Cool Season");
        assert_eq!(analysis.identified_problems.len(), 3);
        assert_eq!(analysis.treatment_urgency, TreatmentUrgency::Medium);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_delays_but_does_not_change_the_record() {
        let buffer = PixelBuffer::uniform(2, 2, Pixel::rgb(0, 0, 0)).unwrap();
        let advisor = SimulatedAdvisor::with_latency(Duration::from_secs(2));
        let started = tokio::time::Instant::now();

        let analysis = advisor.advise(&buffer).await.unwrap();

        assert!(started.elapsed() >= Duration::from_secs(2));
        assert_eq!(analysis, SimulatedAdvisor::new().advise(&buffer).await.unwrap());
    }

    #[test]
    fn urgency_serializes_lowercase() {
        let json = serde_json::to_value(AIVisionAnalysis::unavailable()).unwrap();
        assert_eq!(json["treatmentUrgency"], "medium");
        assert_eq!(json["grassType"], "Unknown");
        assert_eq!(json["confidence"], 0.3);
    }
}
