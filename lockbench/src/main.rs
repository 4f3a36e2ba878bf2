use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use lockbench::{run, Cli, Config, Reporter, TerminalReporter};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load config and apply CLI overrides
    let mut config = Config::load_or_default(&cli.config)?;
    cli.apply_to_config(&mut config)
        .context("Invalid command-line override")?;
    debug!(?config, "Configuration");

    let reporter = if cli.no_color {
        TerminalReporter::without_colors()
    } else {
        TerminalReporter::new()
    };

    if let Some(path) = &cli.render_only {
        let (report, _) = run::render_saved(&config, path)?;
        reporter.report(&report)?;
        return Ok(ExitCode::SUCCESS);
    }

    let summary = run::run(&config, cli.skip_build)?;
    reporter.report(&summary.report)?;

    if summary.should_fail(cli.strict) {
        warn!(
            failed_cells = summary.report.failures().len(),
            build_failed = summary.build_failed,
            "Run incomplete"
        );
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}

fn init_tracing(verbose: bool, no_color: bool) {
    let default = if verbose {
        "lockbench=debug,lockbench_core=debug"
    } else {
        "lockbench=info,lockbench_core=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_target(false)
        .init();
}
