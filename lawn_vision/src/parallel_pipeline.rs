// THEORY:
// The `BatchAnalyzer` scores many image files concurrently. Scoring is CPU-bound and
// synchronous, so each file is decoded and scored on tokio's blocking pool, never on
// the async executor threads. A semaphore bounds how many run at once: the
// configured `workers`, or one per CPU.
//
// Results are returned in input order, one `Result` per path. A failure in one file
// (decode error, panicked worker) is reported in its slot and does not affect the
// others. The advisor, when present, is consulted after scoring and outside the
// blocking pool, under the same permit.
//
// `index_files` runs the same way and produces `SimilarityIndex` records instead of
// bare results, keyed by path.

use crate::advisor::VisionAdvisor;
use crate::config::AnalyzerConfig;
use crate::core_modules::similarity::EmbeddingRecord;
use crate::error::{AnalysisError, Result};
use crate::pipeline::{LawnAnalyzer, consult};
use crate::report::ImageAnalysisResult;
use futures::future::join_all;
use log::debug;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub struct BatchAnalyzer {
    analyzer: Arc<LawnAnalyzer>,
    permits: Arc<Semaphore>,
    worker_count: usize,
}

impl BatchAnalyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let worker_count = config.worker_count();
        Self {
            analyzer: Arc::new(LawnAnalyzer::new(config)),
            permits: Arc::new(Semaphore::new(worker_count)),
            worker_count,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn analyzer(&self) -> &LawnAnalyzer {
        &self.analyzer
    }

    /// Scores every path without consulting an advisor.
    pub async fn analyze_files(&self, paths: Vec<PathBuf>) -> Vec<Result<ImageAnalysisResult>> {
        self.run(paths, None).await
    }

    /// Scores every path and, when `include_ai_vision` is set, attaches the advisor's
    /// record to each successful result.
    pub async fn analyze_files_with_advisor(
        &self,
        paths: Vec<PathBuf>,
        advisor: Arc<dyn VisionAdvisor>,
    ) -> Vec<Result<ImageAnalysisResult>> {
        self.run(paths, Some(advisor)).await
    }

    /// Scores and embeds every path. Each record's id and image URL are the path.
    pub async fn index_files(&self, paths: Vec<PathBuf>) -> Vec<Result<EmbeddingRecord>> {
        let tasks = paths.into_iter().map(|path| {
            let analyzer = Arc::clone(&self.analyzer);
            let permits = Arc::clone(&self.permits);
            async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| AnalysisError::Worker(e.to_string()))?;

                tokio::task::spawn_blocking(move || {
                    let buffer = analyzer.load(&path)?;
                    let id = path.display().to_string();
                    let analysis = analyzer.analyze(&buffer);
                    let embedding = analyzer.embed(&buffer);
                    Ok::<_, AnalysisError>(analysis.embedding_record(id.clone(), id, embedding))
                })
                .await?
            }
        });

        join_all(tasks).await
    }

    async fn run(
        &self,
        paths: Vec<PathBuf>,
        advisor: Option<Arc<dyn VisionAdvisor>>,
    ) -> Vec<Result<ImageAnalysisResult>> {
        debug!(
            "batch of {} images on {} workers",
            paths.len(),
            self.worker_count
        );
        let advisor = advisor.filter(|_| self.analyzer.config().include_ai_vision);

        let tasks = paths.into_iter().map(|path| {
            let analyzer = Arc::clone(&self.analyzer);
            let permits = Arc::clone(&self.permits);
            let advisor = advisor.clone();
            async move {
                // The semaphore is never closed.
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| AnalysisError::Worker(e.to_string()))?;

                let (buffer, mut result) = tokio::task::spawn_blocking(move || {
                    let buffer = analyzer.load(&path)?;
                    let result = analyzer.analyze(&buffer);
                    Ok::<_, AnalysisError>((buffer, result))
                })
                .await??;

                if let Some(advisor) = advisor {
                    result.ai_vision_analysis = Some(consult(advisor.as_ref(), &buffer).await);
                }
                Ok::<_, AnalysisError>(result)
            }
        });

        join_all(tasks).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::{Pixel, PixelBuffer};
    use crate::decode::save_png;

    #[test]
    fn configured_workers_size_the_pool() {
        let config = AnalyzerConfig {
            workers: Some(3),
            ..AnalyzerConfig::default()
        };
        assert_eq!(BatchAnalyzer::new(config).worker_count(), 3);
        assert!(BatchAnalyzer::new(AnalyzerConfig::default()).worker_count() >= 1);
    }

    #[tokio::test]
    async fn empty_batch_returns_nothing() {
        let batch = BatchAnalyzer::new(AnalyzerConfig::default());
        assert!(batch.analyze_files(Vec::new()).await.is_empty());
        assert!(batch.index_files(Vec::new()).await.is_empty());
    }

    #[tokio::test]
    async fn unreadable_file_fails_only_its_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lawn.png");
        let buffer = PixelBuffer::uniform(16, 16, Pixel::rgb(130, 170, 40)).unwrap();
        save_png(&path, &buffer).unwrap();

        let batch = BatchAnalyzer::new(AnalyzerConfig::default());
        let records = batch
            .index_files(vec![path.clone(), dir.path().join("missing.png")])
            .await;

        let record = records[0].as_ref().unwrap();
        assert_eq!(record.id, path.display().to_string());
        assert_eq!(record.embedding, batch.analyzer().embed(&buffer));
        assert!(records[1].is_err());
    }
}
