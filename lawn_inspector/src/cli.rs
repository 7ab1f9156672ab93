//! CLI definition using clap

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "lawn-inspector")]
#[command(version)]
#[command(about = "Heuristic lawn health scoring from photos")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Analyzer configuration file (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze one or more lawn photos
    Analyze {
        /// Paths to image files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Seed for placeholder outputs (density map, weed locations, contours)
        #[arg(long)]
        seed: Option<u64>,

        /// Skip the vision advisor
        #[arg(long)]
        no_ai: bool,

        /// Report the default analysis instead of failing on unreadable images
        #[arg(long)]
        fail_soft: bool,

        /// Concurrent analyses. Uses config value, then CPU count, if not specified.
        #[arg(long, short = 'j')]
        workers: Option<usize>,
    },

    /// Rank reference photos by visual similarity to a query photo
    Similar {
        /// Photo to compare
        query: PathBuf,

        /// Reference photos to index
        #[arg(required = true)]
        references: Vec<PathBuf>,

        /// Number of matches to report
        #[arg(long, short = 'k', default_value_t = lawn_vision::DEFAULT_TOP_K)]
        top_k: usize,

        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the canned default analysis
    Defaults {
        /// Output format
        #[arg(long, short = 'f', value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Print the effective analyzer configuration as TOML
    Config,
}
