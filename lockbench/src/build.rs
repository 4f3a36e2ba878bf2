//! Build manager for compiling benchmark binaries.
//!
//! Each implementation is compiled on its own with
//! `<compiler> <flags...> -o <binary> <source> <libraries...>`. A failure is
//! returned per artifact so the remaining implementations can still run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

use lockbench_core::ImplementationKind;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::config::{ArtifactConfig, ArtifactsConfig, BuildConfig};

/// Errors that can occur while compiling a benchmark binary.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The source file does not exist.
    #[error("Source file not found: {0}")]
    NoSource(PathBuf),
    /// The compiler exited unsuccessfully.
    #[error("Build of {} failed ({status}): {output}", source_path.display())]
    BuildFailed {
        source_path: PathBuf,
        status: String,
        output: String,
    },
    /// IO error, including a missing compiler.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildResult {
    /// Path to the compiled benchmark binary.
    pub binary_path: PathBuf,
}

/// Per-implementation results of [`BuildManager::build_all`].
#[derive(Debug)]
pub struct BuildOutcome {
    pub results: Vec<(ImplementationKind, Result<BuildResult, BuildError>)>,
}

impl BuildOutcome {
    /// Whether any artifact failed to build.
    pub fn has_failures(&self) -> bool {
        self.results.iter().any(|(_, r)| r.is_err())
    }

    pub fn binary(&self, kind: ImplementationKind) -> Option<&Path> {
        self.results
            .iter()
            .find(|(k, _)| *k == kind)
            .and_then(|(_, r)| r.as_ref().ok())
            .map(|b| b.binary_path.as_path())
    }
}

/// Manages compiling benchmark binaries.
#[derive(Debug, Clone)]
pub struct BuildManager {
    compiler: String,
    flags: Vec<String>,
    libraries: Vec<String>,
    source_dir: PathBuf,
    output_dir: PathBuf,
}

impl BuildManager {
    /// Create a new BuildManager from build configuration.
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            compiler: config.compiler.clone(),
            flags: config.flags.clone(),
            libraries: config.libraries.clone(),
            source_dir: config.source_dir.clone(),
            output_dir: config.output_dir.clone(),
        }
    }

    /// Compile one artifact.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is missing, the compiler cannot be
    /// started, or the compiler exits unsuccessfully.
    pub fn build(&self, artifact: &ArtifactConfig) -> Result<BuildResult, BuildError> {
        let source = self.source_dir.join(&artifact.source);
        if !source.exists() {
            return Err(BuildError::NoSource(source));
        }

        std::fs::create_dir_all(&self.output_dir)?;
        let binary_path = self.output_dir.join(&artifact.binary);

        let args = self.command_args(&source, &binary_path);
        debug!(compiler = %self.compiler, ?args, "Invoking compiler");

        let output = Command::new(&self.compiler).args(&args).output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stdout = String::from_utf8_lossy(&output.stdout);
            return Err(BuildError::BuildFailed {
                source_path: source,
                status: output.status.to_string(),
                output: format!("{}\n{}", stdout.trim(), stderr.trim())
                    .trim()
                    .to_string(),
            });
        }

        Ok(BuildResult { binary_path })
    }

    /// Compile every implementation, continuing past failures.
    pub fn build_all(&self, artifacts: &ArtifactsConfig) -> BuildOutcome {
        let results = ImplementationKind::ALL
            .into_iter()
            .map(|kind| {
                let result = self.build(artifacts.get(kind));
                match &result {
                    Ok(built) => {
                        info!(%kind, binary = %built.binary_path.display(), "Built benchmark")
                    }
                    Err(e) => error!(%kind, error = %e, "Failed to build benchmark"),
                }
                (kind, result)
            })
            .collect();
        BuildOutcome { results }
    }

    /// Compiler arguments for one source file.
    fn command_args(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.flags.iter().map(OsString::from).collect();
        args.push("-o".into());
        args.push(output.into());
        args.push(source.into());
        args.extend(self.libraries.iter().map(OsString::from));
        args
    }
}
