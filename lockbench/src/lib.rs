//! lockbench: benchmark harness for concurrent linked lists
//!
//! This library compiles serial, mutex and read-write-lock linked list
//! benchmarks, samples each across a matrix of workloads and thread counts,
//! and reports means, spreads and the sample sizes needed for a target
//! precision.

pub mod build;
pub mod cli;
pub mod config;
pub mod plot;
pub mod run;
pub mod trial;

// Re-export core types for convenience
pub use lockbench_core::{
    ExperimentMatrix, ExperimentReport, ImplementationKind, MatrixRunner, Reporter, Sampler,
    TerminalReporter,
};

// Re-export main types from this crate
pub use build::{BuildError, BuildManager, BuildOutcome, BuildResult};
pub use cli::Cli;
pub use config::Config;
pub use plot::{JsonPlotRenderer, PlotError, PlotSpec, Renderer};
pub use run::RunSummary;
pub use trial::{Artifact, ProcessTrialFactory, ProcessTrialProducer};
