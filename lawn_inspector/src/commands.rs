//! Command handlers

use crate::cli::{Cli, Commands, OutputFormat};
use crate::output::{
    AnalysisEntry, output_analysis, output_config, output_entries, output_similar,
};
use anyhow::{Context, Result, bail};
use lawn_vision::{
    AnalysisError, AnalyzerConfig, BatchAnalyzer, ImageAnalysisResult, SimilarityIndex,
    SimulatedAdvisor,
};
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Analyze {
            images,
            format,
            seed,
            no_ai,
            fail_soft,
            workers,
        } => {
            let mut config = config;
            // CLI flags override the config file
            if seed.is_some() {
                config.synthetic_seed = seed;
            }
            if workers.is_some() {
                config.workers = workers;
            }
            if no_ai {
                config.include_ai_vision = false;
            }
            config.validate()?;
            cmd_analyze(config, images, format, fail_soft).await
        }

        Commands::Similar {
            query,
            references,
            top_k,
            format,
        } => cmd_similar(config, query, references, top_k, format).await,

        Commands::Defaults { format } => {
            output_analysis(format, &ImageAnalysisResult::default_analysis())
        }

        Commands::Config => output_config(&config),
    }
}

fn load_config(cli: &Cli) -> Result<AnalyzerConfig> {
    match cli.config {
        Some(ref path) => AnalyzerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(AnalyzerConfig::default()),
    }
}

async fn cmd_analyze(
    config: AnalyzerConfig,
    images: Vec<PathBuf>,
    format: OutputFormat,
    fail_soft: bool,
) -> Result<()> {
    let include_ai_vision = config.include_ai_vision;
    let batch = BatchAnalyzer::new(config);
    info!(
        "analyzing {} images with {} workers",
        images.len(),
        batch.worker_count()
    );

    let results = if include_ai_vision {
        batch
            .analyze_files_with_advisor(images.clone(), Arc::new(SimulatedAdvisor::new()))
            .await
    } else {
        batch.analyze_files(images.clone()).await
    };

    let mut entries = Vec::with_capacity(results.len());
    let mut failures = 0usize;
    for (image, result) in images.into_iter().zip(results) {
        match result {
            Ok(analysis) => entries.push(AnalysisEntry { image, analysis }),
            Err(e) if fail_soft => {
                error!(
                    "{}: {}; reporting default analysis",
                    image.display(),
                    e
                );
                entries.push(AnalysisEntry {
                    image,
                    analysis: ImageAnalysisResult::default_analysis(),
                });
            }
            Err(e) => {
                eprintln!("Error: {}: {}", image.display(), e);
                failures += 1;
            }
        }
    }

    output_entries(format, &entries)?;

    if failures > 0 {
        bail!("{} of {} images could not be analyzed", failures, failures + entries.len());
    }
    Ok(())
}

async fn cmd_similar(
    config: AnalyzerConfig,
    query: PathBuf,
    references: Vec<PathBuf>,
    top_k: usize,
    format: OutputFormat,
) -> Result<()> {
    let batch = BatchAnalyzer::new(config);
    info!("indexing {} reference images", references.len());

    let mut index = SimilarityIndex::new();
    for (reference, record) in references.iter().zip(batch.index_files(references.clone()).await) {
        match record {
            Ok(record) => index.insert(record),
            Err(e) => warn!("{}: {}; left out of the index", reference.display(), e),
        }
    }
    if index.is_empty() {
        bail!("none of the {} reference images could be indexed", references.len());
    }

    let analyzer = batch.analyzer().clone();
    let query_path = query.clone();
    let enhanced = tokio::task::spawn_blocking(move || {
        let buffer = analyzer.load(&query_path)?;
        Ok::<_, AnalysisError>(analyzer.analyze_enhanced(&buffer, &index, top_k))
    })
    .await?
    .with_context(|| format!("analyzing {}", query.display()))?;

    output_similar(format, &query, &enhanced)
}
