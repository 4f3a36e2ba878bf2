//! The end-to-end experiment pipeline used by the binary.
//!
//! Compiles (or locates) the benchmark binaries, runs the experiment matrix
//! through them, and writes the JSON report and plot descriptions.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use lockbench_core::{ExperimentReport, ImplementationKind, MatrixRunner};
use tracing::{info, warn};

use crate::build::BuildManager;
use crate::config::Config;
use crate::plot::{JsonPlotRenderer, Renderer};
use crate::trial::{Artifact, ProcessTrialFactory};

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub report: ExperimentReport,
    /// Whether any benchmark failed to compile.
    pub build_failed: bool,
    /// Plot files written for this run.
    pub plots: Vec<PathBuf>,
}

impl RunSummary {
    /// Every build succeeded and every cell produced a statistic.
    pub fn is_complete(&self) -> bool {
        !self.build_failed && self.report.failures().is_empty()
    }

    /// Whether the process should exit unsuccessfully.
    ///
    /// Incomplete runs only fail under `strict`.
    pub fn should_fail(&self, strict: bool) -> bool {
        strict && !self.is_complete()
    }
}

/// Compile the benchmarks (unless skipped) and register what is available.
///
/// With `skip_build`, each binary is looked up at its configured output path
/// and marked unavailable when missing. Returns the factory and whether any
/// build failed.
///
/// # Errors
///
/// Returns an error if the process runtime cannot be created.
pub fn prepare_artifacts(config: &Config, skip_build: bool) -> Result<(ProcessTrialFactory, bool)> {
    let timeout = config.execution.trial_timeout_ms.map(Duration::from_millis);
    let mut factory =
        ProcessTrialFactory::new(timeout).context("Failed to start process runtime")?;

    if skip_build {
        for kind in ImplementationKind::ALL {
            let path = config.binary_path(kind);
            let artifact = if path.exists() {
                Artifact::Ready(path)
            } else {
                warn!(%kind, path = %path.display(), "Benchmark binary not found");
                Artifact::Unavailable(path)
            };
            factory = factory.with_artifact(kind, artifact);
        }
        return Ok((factory, false));
    }

    info!(compiler = %config.build.compiler, "Building benchmarks");
    let outcome = BuildManager::new(&config.build).build_all(&config.build.artifacts);

    for kind in ImplementationKind::ALL {
        let artifact = match outcome.binary(kind) {
            Some(path) => Artifact::Ready(path.to_path_buf()),
            None => Artifact::Unavailable(config.binary_path(kind)),
        };
        factory = factory.with_artifact(kind, artifact);
    }

    Ok((factory, outcome.has_failures()))
}

/// Validate the configuration, then build, run, and write outputs.
///
/// # Errors
///
/// Returns an error for an invalid configuration or when the report or plots
/// cannot be written. Build and cell failures are recorded in the summary.
pub fn run(config: &Config, skip_build: bool) -> Result<RunSummary> {
    let (matrix, sampler) = config.validate().context("Invalid configuration")?;

    // 1. Build
    let (factory, build_failed) = prepare_artifacts(config, skip_build)?;

    // 2. Run every cell
    info!(
        cells = matrix.len(),
        samples = sampler.sample_count(),
        "Running experiment"
    );
    let runner = MatrixRunner::new(matrix, sampler);
    let report = runner
        .run_to_report(&factory, |_| {})
        .context("Failed to aggregate results")?;

    // 3. Save results
    if let Some(path) = &config.output.report_json {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        info!(path = %path.display(), "Wrote JSON report");
    }
    let plots = render_plots(config, &report)?;

    Ok(RunSummary {
        report,
        build_failed,
        plots,
    })
}

/// Re-render plots from a saved JSON report without running anything.
///
/// # Errors
///
/// Returns an error if the report cannot be read or the plots written.
pub fn render_saved(
    config: &Config,
    report_path: &Path,
) -> Result<(ExperimentReport, Vec<PathBuf>)> {
    let report = ExperimentReport::read_json(report_path)
        .with_context(|| format!("Failed to read report: {}", report_path.display()))?;
    let plots = render_plots(config, &report)?;
    Ok((report, plots))
}

fn render_plots(config: &Config, report: &ExperimentReport) -> Result<Vec<PathBuf>> {
    let renderer = JsonPlotRenderer::new(&config.output.plot_dir);
    let written = renderer.render(report).with_context(|| {
        format!(
            "Failed to write plots to {}",
            config.output.plot_dir.display()
        )
    })?;
    info!(
        plots = written.len(),
        dir = %config.output.plot_dir.display(),
        "Wrote plots"
    );
    Ok(written)
}
