//! Core types and utilities for lockbench.
//!
//! This crate holds the sampling and aggregation engine: it runs repeated
//! timed trials per experiment cell, summarizes them, recommends how many
//! trials a cell needs for a target precision, and collects the results of a
//! whole experiment matrix into a report.

pub mod matrix;
pub mod protocol;
pub mod report;
pub mod runner;
pub mod sampler;
pub mod stats;

// Re-export main types for convenience
pub use matrix::{ConfigurationError, ExperimentMatrix, ImplementationKind, MatrixCell, WorkloadCase};
pub use protocol::{parse_elapsed, TrialInvocation};
pub use report::{
    CaseReport, CaseSeries, CellFailure, ExperimentReport, ReportBuilder, ReportError, Reporter,
    TerminalReporter, ThreadPoint,
};
pub use runner::{CellOutcome, MatrixRun, MatrixRunner, TrialProducerFactory};
pub use sampler::{Sampler, TrialExecutionError, TrialProducer, TrialResult, Trials};
pub use stats::{Estimate, PrecisionTarget, SampleStatistic, StatsError};
