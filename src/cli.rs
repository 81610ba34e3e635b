//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::{Path, PathBuf};

/// ClassPulse - weekly classroom teaching metrics analyzer
///
/// Ingest a CSV of weekly teaching records, compute hours-weighted
/// metrics per class and subject, and write a JSON analysis artifact
/// plus an optional Markdown narrative report.
///
/// Examples:
///   classpulse --input records.csv
///   classpulse --input records.csv --report weekly_report.md
///   classpulse --input records.csv --output out/results.json --top-subjects 3
///   classpulse --input records.csv --dry-run
///   classpulse --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to the weekly teaching records CSV
    ///
    /// Column headers are mapped through .classpulse.toml; extra columns
    /// are ignored. Not required when using --init-config.
    #[arg(
        short,
        long,
        value_name = "FILE",
        env = "CLASSPULSE_INPUT",
        required_unless_present = "init_config"
    )]
    pub input: Option<PathBuf>,

    /// Output file path for the JSON analysis artifact
    #[arg(
        short,
        long,
        default_value = "analysis_results.json",
        value_name = "FILE"
    )]
    pub output: PathBuf,

    /// Also render a Markdown narrative report to this path
    #[arg(short, long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .classpulse.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// How many subjects the top-subjects ranking keeps
    ///
    /// Overrides the [report] top_subjects config setting.
    #[arg(long, value_name = "COUNT")]
    pub top_subjects: Option<usize>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Ingest and clean the input without writing any output
    ///
    /// Shows how many rows survive cleaning and exits.
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .classpulse.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the input path; empty when not set (validated first).
    pub fn input_path(&self) -> &Path {
        self.input.as_deref().unwrap_or_else(|| Path::new(""))
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        let Some(ref input) = self.input else {
            return Err("An input CSV must be provided with --input".to_string());
        };

        if !input.exists() {
            return Err(format!("Input file does not exist: {}", input.display()));
        }
        if !input.is_file() {
            return Err(format!("Input path is not a file: {}", input.display()));
        }

        if let Some(top_subjects) = self.top_subjects {
            if top_subjects == 0 {
                return Err("Top subjects count must be at least 1".to_string());
            }
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
