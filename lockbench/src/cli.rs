//! Command-line interface for lockbench.

use crate::config::{Config, DEFAULT_CONFIG_FILE};
use clap::Parser;
use lockbench_core::stats::z_for_confidence;
use lockbench_core::ConfigurationError;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "lockbench")]
#[command(about = "Benchmark serial, mutex and read-write-lock linked lists across thread counts")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Number of trials per matrix cell
    #[arg(long)]
    pub sample_count: Option<u32>,

    /// Target confidence half-width, in percent of the mean
    #[arg(long)]
    pub precision: Option<f64>,

    /// Standard normal quantile used for the precision target
    #[arg(long, conflicts_with = "confidence_level")]
    pub z_value: Option<f64>,

    /// Confidence level (0.0-1.0), converted to a Z value
    #[arg(long)]
    pub confidence_level: Option<f64>,

    /// Thread counts for threaded implementations (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub threads: Vec<u32>,

    /// Per-trial timeout in milliseconds
    #[arg(long)]
    pub trial_timeout_ms: Option<u64>,

    /// Use existing binaries instead of compiling them
    #[arg(long)]
    pub skip_build: bool,

    /// Directory for per-case plot files
    #[arg(long)]
    pub plot_dir: Option<PathBuf>,

    /// Write the full report as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Render plots from a saved JSON report without running anything
    #[arg(long, conflicts_with = "skip_build")]
    pub render_only: Option<PathBuf>,

    /// Exit with a non-zero status if any build or cell failed
    #[arg(long)]
    pub strict: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Apply CLI overrides to the configuration.
    ///
    /// CLI arguments take precedence over config file values.
    /// Only non-None optional values will override the config.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::InvalidConfidenceLevel`] if the confidence
    /// level is outside (0, 1).
    pub fn apply_to_config(&self, config: &mut Config) -> Result<(), ConfigurationError> {
        if let Some(sample_count) = self.sample_count {
            config.sampling.sample_count = sample_count;
        }

        if let Some(precision) = self.precision {
            config.sampling.relative_precision = precision;
        }

        if let Some(z) = self.z_value {
            config.sampling.z_value = z;
        }

        if let Some(level) = self.confidence_level {
            config.sampling.z_value = z_for_confidence(level)
                .ok_or(ConfigurationError::InvalidConfidenceLevel(level))?;
        }

        if !self.threads.is_empty() {
            config.matrix.thread_counts = self.threads.clone();
        }

        if let Some(timeout) = self.trial_timeout_ms {
            config.execution.trial_timeout_ms = Some(timeout);
        }

        if let Some(plot_dir) = &self.plot_dir {
            config.output.plot_dir = plot_dir.clone();
        }

        if let Some(json) = &self.json {
            config.output.report_json = Some(json.clone());
        }

        Ok(())
    }
}
