//! Configuration loading for lockbench.
//!
//! Supports loading configuration from TOML files, with defaults matching the
//! canonical experiment: three workload cases, thread counts 1, 2, 4 and 8,
//! 100 trials per cell and a 5% precision target at 95% confidence.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use lockbench_core::matrix::DEFAULT_THREAD_COUNTS;
use lockbench_core::sampler::DEFAULT_SAMPLE_COUNT;
use lockbench_core::stats::precision::{DEFAULT_RELATIVE_PRECISION, DEFAULT_Z};
use lockbench_core::{
    ConfigurationError, ExperimentMatrix, ImplementationKind, PrecisionTarget, Sampler,
    WorkloadCase,
};

/// Top-level configuration for lockbench.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Settings for per-cell sampling.
    pub sampling: SamplingConfig,
    /// Workload cases and thread counts to run.
    pub matrix: MatrixConfig,
    /// Settings for compiling the benchmark binaries.
    pub build: BuildConfig,
    /// Settings for running trials.
    pub execution: ExecutionConfig,
    /// Where results are written.
    pub output: OutputConfig,
}

/// Configuration for per-cell sampling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Number of trials per matrix cell.
    pub sample_count: u32,
    /// Target confidence half-width, in percent of the mean.
    pub relative_precision: f64,
    /// Standard normal quantile for the confidence level.
    pub z_value: f64,
}

/// The experiment matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatrixConfig {
    /// Thread counts for the Mutex and ReadWrite implementations.
    pub thread_counts: Vec<u32>,
    /// Workload cases, run in this order.
    pub cases: Vec<WorkloadCase>,
}

/// Source and output names for one benchmark binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Source file, relative to `build.source_dir`.
    pub source: PathBuf,
    /// Executable name, relative to `build.output_dir`.
    pub binary: PathBuf,
}

impl ArtifactConfig {
    fn new(source: &str, binary: &str) -> Self {
        Self {
            source: PathBuf::from(source),
            binary: PathBuf::from(binary),
        }
    }
}

/// One artifact per implementation kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub serial: ArtifactConfig,
    pub mutex: ArtifactConfig,
    pub read_write: ArtifactConfig,
}

impl ArtifactsConfig {
    pub fn get(&self, kind: ImplementationKind) -> &ArtifactConfig {
        match kind {
            ImplementationKind::Serial => &self.serial,
            ImplementationKind::Mutex => &self.mutex,
            ImplementationKind::ReadWrite => &self.read_write,
        }
    }
}

/// Configuration for compiling benchmark binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Compiler executable.
    pub compiler: String,
    /// Flags placed before `-o <binary> <source>`.
    pub flags: Vec<String>,
    /// Arguments placed after the source, typically libraries.
    pub libraries: Vec<String>,
    /// Directory containing the sources.
    pub source_dir: PathBuf,
    /// Directory receiving the binaries.
    pub output_dir: PathBuf,
    pub artifacts: ArtifactsConfig,
}

/// Configuration for running trials.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Per-trial timeout in milliseconds. No timeout when unset.
    pub trial_timeout_ms: Option<u64>,
}

/// Configuration for result output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for per-case plot files.
    pub plot_dir: PathBuf,
    /// Optional path for the full JSON report.
    pub report_json: Option<PathBuf>,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            relative_precision: DEFAULT_RELATIVE_PRECISION,
            z_value: DEFAULT_Z,
        }
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            thread_counts: DEFAULT_THREAD_COUNTS.to_vec(),
            cases: WorkloadCase::canonical(),
        }
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            serial: ArtifactConfig::new("linkedlistSerial.c", "linkedlistSerial"),
            mutex: ArtifactConfig::new("linkedlistMutex.c", "linkedlistMutex"),
            read_write: ArtifactConfig::new("linkedlistRWlock.c", "linkedlistRWlock"),
        }
    }
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            compiler: "gcc".to_string(),
            flags: vec!["-g".to_string(), "-Wall".to_string()],
            libraries: vec!["-lm".to_string(), "-lpthread".to_string()],
            source_dir: PathBuf::from("."),
            output_dir: PathBuf::from("."),
            artifacts: ArtifactsConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            plot_dir: PathBuf::from("plots"),
            report_json: None,
        }
    }
}

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = ".lockbench.toml";

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Config> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load configuration from `path` if it exists, otherwise use defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn load_or_default(path: &Path) -> Result<Config> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Config::default())
        }
    }

    /// The precision target described by the sampling section.
    pub fn precision_target(&self) -> PrecisionTarget {
        PrecisionTarget::new(self.sampling.relative_precision, self.sampling.z_value)
    }

    /// Validate the configuration and build the experiment it describes.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigurationError`] found: a zero sample count, a
    /// non-positive precision or Z value, an invalid workload case, or an
    /// empty or zero thread count list.
    pub fn validate(&self) -> Result<(ExperimentMatrix, Sampler), ConfigurationError> {
        let sampler = Sampler::new(self.sampling.sample_count, self.precision_target())?;
        let matrix =
            ExperimentMatrix::new(self.matrix.cases.clone(), self.matrix.thread_counts.clone())?;
        Ok((matrix, sampler))
    }

    /// Expected path of the binary for `kind`.
    pub fn binary_path(&self, kind: ImplementationKind) -> PathBuf {
        self.build
            .output_dir
            .join(&self.build.artifacts.get(kind).binary)
    }
}
