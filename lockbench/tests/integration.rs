//! Integration tests for lockbench.
//!
//! These tests drive the matrix runner through real processes using small
//! shell scripts in place of compiled linked list benchmarks.

use std::io::Write;

use lockbench::{Cli, Config};
use lockbench_core::{ConfigurationError, ExperimentMatrix};
use clap::Parser;
use tempfile::NamedTempFile;

/// A config file plus CLI overrides produce the experiment they describe.
#[test]
fn test_config_file_with_cli_overrides() {
    let toml_content = r#"
[sampling]
sample_count = 10
relative_precision = 10.0

[matrix]
thread_counts = [8, 1, 4, 1]
"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml_content.as_bytes()).unwrap();

    let cli = Cli::parse_from([
        "lockbench",
        "--config",
        file.path().to_str().unwrap(),
        "--sample-count",
        "25",
    ]);

    let mut config = Config::load_or_default(&cli.config).unwrap();
    cli.apply_to_config(&mut config).unwrap();
    let (matrix, sampler) = config.validate().unwrap();

    assert_eq!(sampler.sample_count(), 25);
    assert_eq!(sampler.target().relative_precision, 10.0);
    // Sorted and deduplicated
    assert_eq!(matrix.thread_counts(), &[1, 4, 8]);
    // 3 cases x (1 serial + 3 mutex + 3 read-write)
    assert_eq!(matrix.len(), 21);
}

/// Invalid workloads are rejected before anything runs.
#[test]
fn test_invalid_case_fails_fast() {
    let toml_content = r#"
[[matrix.cases]]
name = "Broken"
initial_size = 1000
op_count = 10000
p_member = 0.5
p_insert = 0.5
p_delete = 0.5
"#;
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(toml_content.as_bytes()).unwrap();

    let config = Config::load(file.path()).unwrap();

    assert!(matches!(
        config.validate(),
        Err(ConfigurationError::ProbabilitySum { .. })
    ));
}

#[test]
fn test_default_matrix_matches_canonical() {
    let (matrix, _) = Config::default().validate().unwrap();
    assert_eq!(matrix, ExperimentMatrix::canonical());
}

/// Runs the lockbench binary in `dir` with defaults and no benchmark binaries.
fn lockbench_in(dir: &std::path::Path, args: &[&str]) -> std::process::Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_lockbench"))
        .current_dir(dir)
        .args(["--config", "absent.toml", "--sample-count", "1"])
        .args(args)
        .env("RUST_LOG", "lockbench=debug,lockbench_core=debug")
        .output()
        .unwrap()
}

/// Missing binaries fail every cell: exit 0 normally, 1 under --strict.
#[test]
fn test_binary_exit_status() {
    let dir = tempfile::TempDir::new().unwrap();

    let relaxed = lockbench_in(dir.path(), &["--skip-build", "--no-color"]);
    assert!(relaxed.status.success());
    let stdout = String::from_utf8_lossy(&relaxed.stdout);
    assert!(stdout.contains("Summary: 0 measured, 27 failed"));
    assert!(dir.path().join("plots/Case_1.json").exists());

    let strict = lockbench_in(dir.path(), &["--skip-build", "--no-color", "--strict"]);
    assert_eq!(strict.status.code(), Some(1));
}

/// --no-color keeps escape codes out of both the report and the logs.
#[test]
fn test_no_color_output_is_plain() {
    let dir = tempfile::TempDir::new().unwrap();

    let output = lockbench_in(dir.path(), &["--skip-build", "--no-color"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Benchmark binary not found"));
    assert!(!stderr.contains('\u{1b}'));
    assert!(!String::from_utf8_lossy(&output.stdout).contains('\u{1b}'));
}

/// --render-only reads a saved report and writes plots without running.
#[test]
fn test_binary_render_only() {
    let dir = tempfile::TempDir::new().unwrap();
    let first = lockbench_in(dir.path(), &["--skip-build", "--no-color", "--json", "saved.json"]);
    assert!(first.status.success());
    std::fs::remove_dir_all(dir.path().join("plots")).unwrap();

    let output = lockbench_in(
        dir.path(),
        &["--no-color", "--render-only", "saved.json", "--plot-dir", "again"],
    );

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("27 failed"));
    assert!(dir.path().join("again/Case_3.json").exists());
    assert!(!dir.path().join("plots").exists());
}

#[cfg(unix)]
mod process_tests {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    use lockbench::plot::PlotSpec;
    use lockbench::run::{prepare_artifacts, render_saved, run};
    use lockbench::{Artifact, Config, JsonPlotRenderer, ProcessTrialFactory, Renderer};
    use lockbench_core::{
        ExperimentMatrix, ExperimentReport, ImplementationKind, MatrixCell, MatrixRunner,
        PrecisionTarget, Sampler, TrialExecutionError, TrialProducer, TrialProducerFactory,
        WorkloadCase,
    };
    use tempfile::TempDir;

    fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn runner(samples: u32) -> MatrixRunner {
        MatrixRunner::new(
            ExperimentMatrix::canonical(),
            Sampler::new(samples, PrecisionTarget::default()).unwrap(),
        )
    }

    fn case() -> WorkloadCase {
        WorkloadCase::new("Case 1", 1000, 10_000, 0.99, 0.005, 0.005)
    }

    /// Serial binaries get five arguments, threaded ones six.
    #[test]
    fn test_argument_contract() {
        let dir = TempDir::new().unwrap();
        let count_args = script(dir.path(), "count_args", "echo $#");

        let factory = ProcessTrialFactory::new(None).unwrap();
        let factory = ImplementationKind::ALL.into_iter().fold(factory, |f, kind| {
            f.with_artifact(kind, Artifact::Ready(count_args.clone()))
        });

        let report = runner(2).run_to_report(&factory, |_| {}).unwrap();

        assert_eq!(report.statistic_count(), 27);
        let serial = report
            .statistic(&MatrixCell::new("Case 2", ImplementationKind::Serial, 1))
            .unwrap();
        assert_eq!(serial.mean, 5.0);
        let mutex = report
            .statistic(&MatrixCell::new("Case 3", ImplementationKind::Mutex, 8))
            .unwrap();
        assert_eq!(mutex.mean, 6.0);
    }

    /// The thread count is passed as the last argument.
    #[test]
    fn test_thread_count_reaches_binary() {
        let dir = TempDir::new().unwrap();
        let echo_threads = script(dir.path(), "echo_threads", "eval echo \\${$#}");

        let factory = ProcessTrialFactory::new(None)
            .unwrap()
            .with_artifact(ImplementationKind::ReadWrite, Artifact::Ready(echo_threads));
        let cell = MatrixCell::new("Case 1", ImplementationKind::ReadWrite, 4);

        let mut producer = factory.producer_for(&case(), &cell);

        assert_eq!(producer.run_trial().unwrap().millis(), 4.0);
    }

    /// One broken implementation fails its cells but the run completes.
    #[test]
    fn test_failing_implementation_does_not_abort_run() {
        let dir = TempDir::new().unwrap();
        let ok = script(dir.path(), "ok", "echo 20");
        let broken = script(dir.path(), "broken", "echo 'lock init failed' >&2\nexit 3");

        let factory = ProcessTrialFactory::new(None)
            .unwrap()
            .with_artifact(ImplementationKind::Serial, Artifact::Ready(ok.clone()))
            .with_artifact(ImplementationKind::Mutex, Artifact::Ready(ok))
            .with_artifact(ImplementationKind::ReadWrite, Artifact::Ready(broken));

        let mut outcomes = 0;
        let report = runner(2)
            .run_to_report(&factory, |_| outcomes += 1)
            .unwrap();

        assert_eq!(outcomes, 27);
        assert_eq!(report.statistic_count(), 15);
        assert_eq!(report.failures().len(), 12);
        assert!(report
            .failures()
            .iter()
            .all(|f| f.cell.kind == ImplementationKind::ReadWrite));
        assert!(report.failures()[0].error.contains("lock init failed"));
    }

    #[test]
    fn test_non_zero_exit() {
        let dir = TempDir::new().unwrap();
        let broken = script(dir.path(), "broken", "echo 'segfault' >&2\nexit 139");

        let factory = ProcessTrialFactory::new(None)
            .unwrap()
            .with_artifact(ImplementationKind::Serial, Artifact::Ready(broken));
        let cell = MatrixCell::new("Case 1", ImplementationKind::Serial, 1);

        let result = factory.producer_for(&case(), &cell).run_trial();

        match result {
            Err(TrialExecutionError::NonZeroExit { stderr, .. }) => assert_eq!(stderr, "segfault"),
            other => panic!("expected NonZeroExit, got {:?}", other),
        }
    }

    #[test]
    fn test_unparsable_output() {
        let dir = TempDir::new().unwrap();
        let chatty = script(dir.path(), "chatty", "echo 'Elapsed: 20ms'");

        let factory = ProcessTrialFactory::new(None)
            .unwrap()
            .with_artifact(ImplementationKind::Serial, Artifact::Ready(chatty));
        let cell = MatrixCell::new("Case 1", ImplementationKind::Serial, 1);

        let result = factory.producer_for(&case(), &cell).run_trial();

        assert_eq!(
            result,
            Err(TrialExecutionError::UnparsableOutput(
                "Elapsed: 20ms".to_string()
            ))
        );
    }

    #[test]
    fn test_trial_timeout() {
        let dir = TempDir::new().unwrap();
        let slow = script(dir.path(), "slow", "exec sleep 5");

        let limit = Duration::from_millis(100);
        let factory = ProcessTrialFactory::new(Some(limit))
            .unwrap()
            .with_artifact(ImplementationKind::Mutex, Artifact::Ready(slow));
        let cell = MatrixCell::new("Case 1", ImplementationKind::Mutex, 1);

        let result = factory.producer_for(&case(), &cell).run_trial();

        assert_eq!(result, Err(TrialExecutionError::Timeout(limit)));
    }

    /// Full pipeline: run, save the report, reload it and render plots.
    #[test]
    fn test_run_save_and_render() {
        let dir = TempDir::new().unwrap();
        let serial = script(dir.path(), "serial", "echo 20");
        let mutex = script(dir.path(), "mutex", "echo 21.5");
        let rwlock = script(dir.path(), "rwlock", "echo 19");

        let factory = ProcessTrialFactory::new(Some(Duration::from_secs(10)))
            .unwrap()
            .with_artifact(ImplementationKind::Serial, Artifact::Ready(serial))
            .with_artifact(ImplementationKind::Mutex, Artifact::Ready(mutex))
            .with_artifact(ImplementationKind::ReadWrite, Artifact::Ready(rwlock));

        let report = runner(3).run_to_report(&factory, |_| {}).unwrap();
        assert!(report.failures().is_empty());

        let json_path = dir.path().join("report.json");
        report.write_json(&json_path).unwrap();
        let loaded = ExperimentReport::read_json(&json_path).unwrap();
        assert_eq!(loaded, report);

        let renderer = JsonPlotRenderer::new(dir.path().join("plots"));
        let written = renderer.render(&loaded).unwrap();
        assert_eq!(written.len(), 3);
        assert!(dir.path().join("plots/Case_3.json").exists());

        let spec: PlotSpec =
            serde_json::from_str(&std::fs::read_to_string(&written[0]).unwrap()).unwrap();
        assert_eq!(spec.title, "Average Execution Time vs Number of Threads - Case 1");
        assert_eq!(spec.reference.map(|r| r.y), Some(20.0));
        assert_eq!(
            spec.series[0].points,
            vec![(1, 21.5), (2, 21.5), (4, 21.5), (8, 21.5)]
        );

        // Constant output has zero spread, so the target is already met.
        let stat = loaded
            .statistic(&MatrixCell::new("Case 1", ImplementationKind::Serial, 1))
            .unwrap();
        assert_eq!(stat.required_samples.value(), Some(0));
        assert!(stat.is_adequate());
    }

    /// Config rooted in a temp dir: binaries in `bin/`, plots in `plots/`.
    fn config_in(dir: &Path) -> Config {
        let mut config = Config::default();
        config.sampling.sample_count = 2;
        config.build.source_dir = dir.to_path_buf();
        config.build.output_dir = dir.join("bin");
        config.output.plot_dir = dir.join("plots");
        config
    }

    fn install_binaries(dir: &Path, names: &[&str], body: &str) {
        let bin = dir.join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        for name in names {
            script(&bin, name, body);
        }
    }

    #[test]
    fn test_skip_build_finds_existing_binaries() {
        let dir = TempDir::new().unwrap();
        install_binaries(dir.path(), &["linkedlistSerial", "linkedlistMutex"], "echo 20");
        let config = config_in(dir.path());

        let (factory, build_failed) = prepare_artifacts(&config, true).unwrap();

        assert!(!build_failed);
        assert_eq!(
            factory.artifact(ImplementationKind::Serial),
            Some(&Artifact::Ready(dir.path().join("bin/linkedlistSerial")))
        );
        assert_eq!(
            factory.artifact(ImplementationKind::Mutex),
            Some(&Artifact::Ready(dir.path().join("bin/linkedlistMutex")))
        );
        assert_eq!(
            factory.artifact(ImplementationKind::ReadWrite),
            Some(&Artifact::Unavailable(dir.path().join("bin/linkedlistRWlock")))
        );
    }

    #[test]
    fn test_missing_binary_fails_only_under_strict() {
        let dir = TempDir::new().unwrap();
        install_binaries(dir.path(), &["linkedlistSerial", "linkedlistMutex"], "echo 20");
        let config = config_in(dir.path());

        let summary = run(&config, true).unwrap();

        assert!(!summary.build_failed);
        assert_eq!(summary.report.failures().len(), 12);
        assert!(summary.report.failures().iter().all(|f| {
            f.cell.kind == ImplementationKind::ReadWrite && f.error.contains("linkedlistRWlock")
        }));
        assert!(!summary.is_complete());
        assert!(summary.should_fail(true));
        assert!(!summary.should_fail(false));
    }

    #[test]
    fn test_complete_run_passes_strict() {
        let dir = TempDir::new().unwrap();
        install_binaries(
            dir.path(),
            &["linkedlistSerial", "linkedlistMutex", "linkedlistRWlock"],
            "echo 20",
        );
        let mut config = config_in(dir.path());
        config.output.report_json = Some(dir.path().join("report.json"));

        let summary = run(&config, true).unwrap();

        assert!(summary.is_complete());
        assert!(!summary.should_fail(true));
        assert_eq!(summary.report.statistic_count(), 27);
        assert_eq!(summary.plots.len(), 3);
        assert!(dir.path().join("report.json").exists());
    }

    #[test]
    fn test_build_failure_fails_strict() {
        let dir = TempDir::new().unwrap();
        for source in ["linkedlistSerial.c", "linkedlistMutex.c", "linkedlistRWlock.c"] {
            std::fs::write(dir.path().join(source), "int main(void) { return 0; }").unwrap();
        }
        let mut config = config_in(dir.path());
        config.build.compiler = "false".to_string();

        let summary = run(&config, false).unwrap();

        assert!(summary.build_failed);
        assert_eq!(summary.report.failures().len(), 27);
        assert!(summary.report.failures()[0].error.contains("unavailable"));
        assert!(summary.should_fail(true));
        assert!(!summary.should_fail(false));
    }

    /// Re-rendering a saved report reproduces the run's plots exactly.
    #[test]
    fn test_render_saved_report_matches_run() {
        let dir = TempDir::new().unwrap();
        // Pid-derived output gives means that are not short decimals.
        install_binaries(
            dir.path(),
            &["linkedlistSerial", "linkedlistMutex", "linkedlistRWlock"],
            "echo $(( $$ % 97 + 3 )).$(( $$ % 13 ))",
        );
        let mut config = config_in(dir.path());
        config.sampling.sample_count = 3;
        config.output.report_json = Some(dir.path().join("report.json"));

        let summary = run(&config, true).unwrap();
        let first: Vec<String> = summary
            .plots
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect();
        std::fs::remove_dir_all(dir.path().join("plots")).unwrap();

        let (report, plots) = render_saved(&config, &dir.path().join("report.json")).unwrap();

        assert_eq!(report, summary.report);
        assert_eq!(plots, summary.plots);
        let second: Vec<String> = plots
            .iter()
            .map(|p| std::fs::read_to_string(p).unwrap())
            .collect();
        assert_eq!(second, first);
    }

    #[test]
    fn test_render_saved_missing_report() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());

        let result = render_saved(&config, &dir.path().join("missing.json"));

        assert!(result.is_err());
    }
}
