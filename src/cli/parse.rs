//! CLI parse: clap types for nanoforge. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Nanoforge CLI - resilient image generation against the Gemini API
#[derive(Parser, Debug)]
#[command(name = "nanoforge")]
#[command(about = "Generate images from one prompt with concurrent, retried requests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config/ is read from here)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Disable logging entirely
    #[arg(long, default_value = "false", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate images from a prompt
    Generate {
        /// Model display name or model id
        #[arg(long)]
        model: String,

        /// Prompt text
        #[arg(long)]
        prompt: String,

        /// Number of images to request (1-8); each is a separate concurrent request
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(u16).range(1..=8))]
        count: u16,

        /// Reference image file (repeatable)
        #[arg(long = "reference")]
        references: Vec<PathBuf>,

        /// Directory decoded images are written to
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Rewrite a prompt into a detailed image-generation prompt
    Refine {
        /// Conversational model display name or model id
        #[arg(long)]
        model: String,

        /// Prompt text to refine
        #[arg(long)]
        prompt: String,

        /// Optional reference image the refinement should describe
        #[arg(long)]
        reference: Option<PathBuf>,
    },
    /// List available models
    Models {
        /// Merge the live listing from the API over the configured models
        #[arg(long)]
        live: bool,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

impl Commands {
    /// Command name for logging (e.g. "generate", "models").
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Generate { .. } => "generate",
            Commands::Refine { .. } => "refine",
            Commands::Models { .. } => "models",
        }
    }
}
