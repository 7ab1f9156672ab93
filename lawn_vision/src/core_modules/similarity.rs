// THEORY:
// The `SimilarityIndex` is an in-memory store of image embeddings with a brute-force
// cosine top-K search. Each stored record carries what a past diagnosis concluded
// (problem type and confidence) and where the image came from. A search turns
// neighbors into two derived signals:
//
// 1.  **Confidence boost**: a similarity- and confidence-weighted mean similarity,
//     scaled into [0, 0.3].
// 2.  **Community validation**: how many neighbors came from community posts, their
//     mean confidence, and the share of those above 0.8.
//
// Persistence is the caller's concern; records serialize with serde.

use crate::core_modules::embedding::cosine_similarity;
use serde::{Deserialize, Serialize};

/// Neighbors returned when the caller has no preference.
pub const DEFAULT_TOP_K: usize = 10;

const MAX_CONFIDENCE_BOOST: f64 = 0.3;
const SUCCESSFUL_TREATMENT_CONFIDENCE: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingMetadata {
    pub problem_type: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reddit_post_id: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    pub id: String,
    pub embedding: Vec<f64>,
    pub metadata: EmbeddingMetadata,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    Reddit,
    UserSubmission,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarImage {
    pub id: String,
    pub similarity: f64,
    pub problem_type: String,
    pub confidence: f64,
    pub image_url: String,
    pub source: ImageSource,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityValidation {
    pub matching_posts: usize,
    pub average_confidence: f64,
    pub treatment_success: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityIndex {
    records: Vec<EmbeddingRecord>,
}

impl SimilarityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, record: EmbeddingRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[EmbeddingRecord] {
        &self.records
    }

    /// The `top_k` stored records most similar to `query`, best first. Records of
    /// equal similarity keep insertion order.
    pub fn find_similar(&self, query: &[f64], top_k: usize) -> Vec<SimilarImage> {
        let mut scored: Vec<(f64, &EmbeddingRecord)> = self
            .records
            .iter()
            .map(|record| (cosine_similarity(query, &record.embedding), record))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(top_k)
            .map(|(similarity, record)| SimilarImage {
                id: record.id.clone(),
                similarity,
                problem_type: record.metadata.problem_type.clone(),
                confidence: record.metadata.confidence,
                image_url: record.metadata.image_url.clone(),
                source: if record.metadata.reddit_post_id.is_some() {
                    ImageSource::Reddit
                } else {
                    ImageSource::UserSubmission
                },
            })
            .collect()
    }
}

/// Weighted mean similarity of the neighbors, scaled to at most 0.3. Each neighbor
/// weighs `similarity * confidence`.
pub fn confidence_boost(similar: &[SimilarImage]) -> f64 {
    let mut total = 0.0;
    let mut weight_sum = 0.0;
    for image in similar {
        let weight = image.similarity * image.confidence;
        total += weight * image.similarity;
        weight_sum += weight;
    }
    if weight_sum > 0.0 {
        total / weight_sum * MAX_CONFIDENCE_BOOST
    } else {
        0.0
    }
}

pub fn community_validation(similar: &[SimilarImage]) -> CommunityValidation {
    let posts: Vec<&SimilarImage> = similar
        .iter()
        .filter(|image| image.source == ImageSource::Reddit)
        .collect();
    if posts.is_empty() {
        return CommunityValidation::default();
    }

    let count = posts.len() as f64;
    let successes = posts
        .iter()
        .filter(|image| image.confidence > SUCCESSFUL_TREATMENT_CONFIDENCE)
        .count();
    CommunityValidation {
        matching_posts: posts.len(),
        average_confidence: posts.iter().map(|image| image.confidence).sum::<f64>() / count,
        treatment_success: successes as f64 / count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, embedding: Vec<f64>, confidence: f64, reddit: bool) -> EmbeddingRecord {
        EmbeddingRecord {
            id: id.to_string(),
            embedding,
            metadata: EmbeddingMetadata {
                problem_type: format!("{} problem", id),
                confidence,
                reddit_post_id: reddit.then(|| format!("t3_{}", id)),
                image_url: format!("{}.png", id),
                verified: false,
            },
        }
    }

    fn hit(similarity: f64, confidence: f64, source: ImageSource) -> SimilarImage {
        SimilarImage {
            id: "x".to_string(),
            similarity,
            problem_type: "Brown patch".to_string(),
            confidence,
            image_url: String::new(),
            source,
        }
    }

    fn index() -> SimilarityIndex {
        let mut index = SimilarityIndex::new();
        index.insert(record("east", vec![1.0, 0.0], 0.9, true));
        index.insert(record("north", vec![0.0, 1.0], 0.6, false));
        index.insert(record("northeast", vec![1.0, 1.0], 0.7, false));
        index.insert(record("short", vec![1.0], 0.5, false));
        index
    }

    #[test]
    fn search_ranks_by_cosine_similarity() {
        let hits = index().find_similar(&[1.0, 0.2], DEFAULT_TOP_K);
        let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_str()).collect();
        // The one-element embedding scores 0 against a two-element query.
        assert_eq!(ids, vec!["east", "northeast", "north", "short"]);
        assert_eq!(hits[3].similarity, 0.0);
        assert_eq!(hits[0].source, ImageSource::Reddit);
        assert_eq!(hits[1].source, ImageSource::UserSubmission);
        assert_eq!(hits[0].problem_type, "east problem");
    }

    #[test]
    fn search_is_truncated_to_top_k() {
        let index = index();
        assert_eq!(index.len(), 4);
        assert_eq!(index.find_similar(&[0.0, 1.0], 2).len(), 2);
        assert!(index.find_similar(&[0.0, 1.0], 0).is_empty());
        assert!(SimilarityIndex::new().find_similar(&[1.0], 5).is_empty());
    }

    #[test]
    fn zero_query_ties_keep_insertion_order() {
        let hits = index().find_similar(&[0.0, 0.0], 3);
        assert!(hits.iter().all(|hit| hit.similarity == 0.0));
        let ids: Vec<&str> = hits.iter().map(|hit| hit.id.as_str()).collect();
        assert_eq!(ids, vec!["east", "north", "northeast"]);
    }

    #[test]
    fn confidence_boost_is_weighted_and_capped() {
        assert_eq!(confidence_boost(&[]), 0.0);
        // A lone neighbor's boost is its similarity times 0.3.
        let single = confidence_boost(&[hit(0.5, 1.0, ImageSource::Reddit)]);
        assert!((single - 0.15).abs() < 1e-12);
        // (1 * 1 + 0.25 * 0.5) / (1 + 0.25) = 0.9
        let pair = confidence_boost(&[
            hit(1.0, 1.0, ImageSource::Reddit),
            hit(0.5, 0.5, ImageSource::UserSubmission),
        ]);
        assert!((pair - 0.27).abs() < 1e-12);
        assert_eq!(confidence_boost(&[hit(0.9, 0.0, ImageSource::Reddit)]), 0.0);
    }

    #[test]
    fn community_validation_counts_only_posts() {
        assert_eq!(
            community_validation(&[hit(0.9, 0.9, ImageSource::UserSubmission)]),
            CommunityValidation::default()
        );

        let validation = community_validation(&[
            hit(0.9, 0.9, ImageSource::Reddit),
            hit(0.8, 0.5, ImageSource::Reddit),
            hit(0.7, 1.0, ImageSource::UserSubmission),
        ]);
        assert_eq!(validation.matching_posts, 2);
        assert!((validation.average_confidence - 0.7).abs() < 1e-12);
        assert_eq!(validation.treatment_success, 0.5);
    }

    #[test]
    fn index_serializes_its_records() {
        let index = index();
        let json = serde_json::to_string(&index).unwrap();
        assert!(json.contains("\"problemType\":\"east problem\""));
        assert!(json.contains("\"redditPostId\":\"t3_east\""));
        let restored: SimilarityIndex = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, index);
    }
}
