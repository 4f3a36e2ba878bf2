//! Aggregation of cell statistics into an experiment report.

use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::{ExperimentMatrix, ImplementationKind, MatrixCell};
use crate::runner::CellOutcome;
use crate::stats::SampleStatistic;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The same cell was recorded twice. Indicates a runner bug.
    #[error("Duplicate matrix cell: {0}")]
    DuplicateCell(MatrixCell),
    /// A Serial cell with a thread count other than 1.
    #[error("Serial cell must run with 1 thread: {0}")]
    SerialThreads(MatrixCell),
}

/// Statistic measured at one thread count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadPoint {
    pub threads: u32,
    pub statistic: SampleStatistic,
}

/// A cell whose trials failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellFailure {
    pub cell: MatrixCell,
    pub error: String,
}

/// All results for one workload case, grouped by implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    name: String,
    implementations: BTreeMap<ImplementationKind, Vec<ThreadPoint>>,
}

impl CaseReport {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implementations: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Points for one implementation, in increasing thread count.
    pub fn points(&self, kind: ImplementationKind) -> &[ThreadPoint] {
        self.implementations
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Mean elapsed times shaped for plotting.
    pub fn series(&self) -> CaseSeries<'_> {
        let curve = |kind: ImplementationKind| -> Vec<(u32, f64)> {
            self.points(kind)
                .iter()
                .map(|p| (p.threads, p.statistic.mean))
                .collect()
        };
        CaseSeries {
            case: &self.name,
            serial: self
                .points(ImplementationKind::Serial)
                .first()
                .map(|p| p.statistic.mean),
            mutex: curve(ImplementationKind::Mutex),
            read_write: curve(ImplementationKind::ReadWrite),
        }
    }
}

/// Per-case plotting data: a constant serial reference and two curves over
/// thread count.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseSeries<'a> {
    pub case: &'a str,
    pub serial: Option<f64>,
    pub mutex: Vec<(u32, f64)>,
    pub read_write: Vec<(u32, f64)>,
}

/// Finished results of an experiment run. Read-only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExperimentReport {
    cases: Vec<CaseReport>,
    failures: Vec<CellFailure>,
}

impl ExperimentReport {
    /// Aggregate a stream of outcomes.
    pub fn from_outcomes(
        outcomes: impl IntoIterator<Item = CellOutcome>,
    ) -> Result<Self, ReportError> {
        let mut builder = ReportBuilder::new();
        for outcome in outcomes {
            builder.record(outcome)?;
        }
        Ok(builder.finish())
    }

    /// Cases in the order they were configured.
    pub fn cases(&self) -> &[CaseReport] {
        &self.cases
    }

    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn failures(&self) -> &[CellFailure] {
        &self.failures
    }

    pub fn statistic(&self, cell: &MatrixCell) -> Option<&SampleStatistic> {
        self.case(&cell.case)?
            .points(cell.kind)
            .iter()
            .find(|p| p.threads == cell.threads)
            .map(|p| &p.statistic)
    }

    /// Number of cells with a statistic.
    pub fn statistic_count(&self) -> usize {
        self.cases
            .iter()
            .flat_map(|c| c.implementations.values())
            .map(Vec::len)
            .sum()
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self, ReportError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

/// Incrementally builds an [`ExperimentReport`], rejecting duplicate cells.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    cases: Vec<CaseReport>,
    failures: Vec<CellFailure>,
    seen: HashSet<MatrixCell>,
}

impl ReportBuilder {
    /// An empty builder; cases appear in the order they are first recorded.
    pub fn new() -> Self {
        Self::default()
    }

    /// A builder whose case order follows the matrix.
    pub fn for_matrix(matrix: &ExperimentMatrix) -> Self {
        Self {
            cases: matrix
                .cases()
                .iter()
                .map(|c| CaseReport::new(c.name.clone()))
                .collect(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: CellOutcome) -> Result<(), ReportError> {
        match outcome.result {
            Ok(statistic) => self.insert(outcome.cell, statistic),
            Err(e) => self.record_failure(outcome.cell, e),
        }
    }

    pub fn insert(&mut self, cell: MatrixCell, statistic: SampleStatistic) -> Result<(), ReportError> {
        self.claim(&cell)?;
        let threads = cell.threads;
        self.case_mut(cell.case)
            .implementations
            .entry(cell.kind)
            .or_default()
            .push(ThreadPoint { threads, statistic });
        Ok(())
    }

    pub fn record_failure(&mut self, cell: MatrixCell, error: impl Display) -> Result<(), ReportError> {
        self.claim(&cell)?;
        self.case_mut(cell.case.clone());
        self.failures.push(CellFailure {
            cell,
            error: error.to_string(),
        });
        Ok(())
    }

    pub fn finish(mut self) -> ExperimentReport {
        for case in &mut self.cases {
            for points in case.implementations.values_mut() {
                points.sort_by_key(|p| p.threads);
            }
        }
        ExperimentReport {
            cases: self.cases,
            failures: self.failures,
        }
    }

    fn claim(&mut self, cell: &MatrixCell) -> Result<(), ReportError> {
        if cell.kind == ImplementationKind::Serial && cell.threads != 1 {
            return Err(ReportError::SerialThreads(cell.clone()));
        }
        if !self.seen.insert(cell.clone()) {
            return Err(ReportError::DuplicateCell(cell.clone()));
        }
        Ok(())
    }

    fn case_mut(&mut self, name: String) -> &mut CaseReport {
        let index = match self.cases.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.cases.push(CaseReport::new(name));
                self.cases.len() - 1
            }
        };
        &mut self.cases[index]
    }
}

/// Presents a finished report.
pub trait Reporter: Send + Sync {
    fn report(&self, report: &ExperimentReport) -> Result<(), ReportError>;
}

mod terminal;
pub use terminal::TerminalReporter;
