//! Command-line contract between the harness and a benchmark binary.
//!
//! A trial is invoked with positional arguments
//! `initial_size op_count p_member p_insert p_delete [threads]` and prints a
//! single elapsed time in milliseconds on stdout.

use serde::{Deserialize, Serialize};

use crate::matrix::{ImplementationKind, MatrixCell, WorkloadCase};
use crate::sampler::{TrialExecutionError, TrialResult};

/// Arguments for one benchmark binary invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialInvocation {
    pub kind: ImplementationKind,
    pub args: Vec<String>,
}

impl TrialInvocation {
    /// Build the argument vector for a cell of the given case.
    ///
    /// Serial binaries take no thread count.
    pub fn for_cell(case: &WorkloadCase, cell: &MatrixCell) -> Self {
        let mut args = vec![
            case.initial_size.to_string(),
            case.op_count.to_string(),
            case.p_member.to_string(),
            case.p_insert.to_string(),
            case.p_delete.to_string(),
        ];
        if cell.kind.is_threaded() {
            args.push(cell.threads.to_string());
        }
        Self {
            kind: cell.kind,
            args,
        }
    }
}

/// Parse a benchmark binary's stdout into a trial result.
///
/// Surrounding whitespace is ignored; integer and decimal output are both
/// accepted.
pub fn parse_elapsed(stdout: &str) -> Result<TrialResult, TrialExecutionError> {
    let trimmed = stdout.trim();
    let millis: f64 = trimmed
        .parse()
        .map_err(|_| TrialExecutionError::UnparsableOutput(trimmed.to_string()))?;
    TrialResult::new(millis)
}
