//! Output formatting module

use crate::cli::OutputFormat;
use anyhow::Result;
use lawn_vision::{AnalyzerConfig, EnhancedAnalysisResult, ImageAnalysisResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Problems at or above this score are listed in table output.
const PROBLEM_REPORT_THRESHOLD: f64 = 30.0;

#[derive(Debug, Serialize)]
pub struct AnalysisEntry {
    pub image: PathBuf,
    pub analysis: ImageAnalysisResult,
}

pub fn output_entries(output_format: OutputFormat, entries: &[AnalysisEntry]) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }
    for entry in entries {
        println!("\n{}", entry.image.display());
        print_table(&entry.analysis);
    }
    Ok(())
}

pub fn output_analysis(output_format: OutputFormat, analysis: &ImageAnalysisResult) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(analysis)?);
    } else {
        print_table(analysis);
    }
    Ok(())
}

pub fn output_similar(
    output_format: OutputFormat,
    query: &Path,
    enhanced: &EnhancedAnalysisResult,
) -> Result<()> {
    if output_format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(enhanced)?);
        return Ok(());
    }

    println!("Images similar to {}", query.display());
    println!("{:<6}{:<12}{:<24}Image", "Rank", "Similarity", "Problem");
    for (rank, image) in enhanced.similar_images.iter().enumerate() {
        println!(
            "{:<6}{:<12.4}{:<24}{}",
            rank + 1,
            image.similarity,
            image.problem_type,
            image.image_url
        );
    }
    println!("\nConfidence boost: {:.1}%", enhanced.confidence_boost * 100.0);
    let community = &enhanced.community_validation;
    println!(
        "Community posts:  {} (mean confidence {:.2}, treated {:.0}%)",
        community.matching_posts,
        community.average_confidence,
        community.treatment_success * 100.0
    );
    Ok(())
}

pub fn output_config(config: &AnalyzerConfig) -> Result<()> {
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn print_table(analysis: &ImageAnalysisResult) {
    let colors = &analysis.color_analysis;
    let health = &analysis.health_metrics;
    let weeds = &analysis.weed_detection;
    let texture = &analysis.texture_analysis;
    let patterns = &analysis.pattern_analysis;

    println!("Lawn Analysis");
    println!("=============");
    println!("Overall health:  {:.1} / 10", health.overall_health);
    println!("Density:         {:.1} / 10", health.density_score);
    println!("Vitality:        {:.1}", health.vitality_index);

    println!("\n--- Coverage ---");
    println!("Green:           {:.1}%", health.green_coverage);
    println!("Yellow:          {:.1}%", health.yellow_coverage);
    println!("Brown:           {:.1}%", health.brown_coverage);
    println!("Orange rust:     {:.1}%", colors.orange_rust);
    println!("Bluish gray:     {:.1}%", colors.bluish_gray);
    for dominant in colors.dominant_colors.iter().take(3) {
        println!(
            "Dominant:        {} {} ({:.1}%)",
            dominant.hex, dominant.color, dominant.percentage
        );
    }

    println!("\n--- Surface ---");
    println!("Sharpness:       {:.1}", texture.sharpness);
    println!("Blade definition:{:>5.1} / 10", texture.grass_blade_definition);
    println!("Entropy:         {:.2} bits", texture.entropy);
    println!("Circular spots:  {}", patterns.circular_spots);
    println!("Edge density:    {:.3}", patterns.edge_density);
    println!("Symmetry:        {:.2}", patterns.symmetry_score);

    println!("\n--- Weeds ---");
    println!("Estimated:       {:.1}%", weeds.total_weed_percentage);
    for weed in &weeds.identified_weed_types {
        println!(
            "Type:            {} (confidence {:.0}%)",
            weed.weed_type,
            weed.confidence * 100.0
        );
    }

    let mut problems: Vec<(&str, f64)> = analysis
        .problem_indicators
        .named_scores()
        .into_iter()
        .filter(|(_, score)| *score >= PROBLEM_REPORT_THRESHOLD)
        .collect();
    problems.sort_by(|a, b| b.1.total_cmp(&a.1));

    println!("\n--- Likely problems ---");
    if problems.is_empty() {
        println!("None above {:.0}", PROBLEM_REPORT_THRESHOLD);
    }
    for (name, score) in problems {
        println!("{:<17}{:.0}", format!("{}:", name), score);
    }

    if let Some(ref ai) = analysis.ai_vision_analysis {
        println!("\n--- Vision advisor ---");
        println!("{}", ai.description);
        println!("Grass type:      {}", ai.grass_type);
        println!("Confidence:      {:.0}%", ai.confidence * 100.0);
        for recommendation in &ai.recommendations {
            println!("  - {}", recommendation);
        }
    }
}
