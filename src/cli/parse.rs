//! CLI parse: clap types for pixelart. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Pixelart CLI - Batch pixel-art animation pipeline
#[derive(Parser)]
#[command(name = "pixelart")]
#[command(about = "Generate pixel-art animations from a YAML config via the PixelLab API")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (default: config.yaml in the current directory)
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr)
    #[arg(long, global = true)]
    pub log_output: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate animations from config, resuming from frames already on disk
    Generate {
        /// Animation kind to generate (singles, emotes, chains, journeys, cycles, all)
        #[arg(long = "type", short = 't')]
        kind: Option<String>,

        /// Restrict to specific unit names (repeatable)
        #[arg(long = "name", short = 'n')]
        names: Vec<String>,
    },
    /// Assemble existing frames into GIFs without any remote calls
    Assemble,
    /// Estimate the cost of a fresh run without generating
    Cost,
    /// Check PixelLab API credit balance
    Balance,
    /// Create a starter project in the current directory
    Init {
        /// Project name (default: my-project)
        #[arg(long, short = 'n')]
        name: Option<String>,
    },
}
