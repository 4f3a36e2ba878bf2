//! Experiment matrix: workload cases, implementation kinds and thread counts.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Allowed deviation of a case's probability split from 1.0.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Thread counts exercised by the locking implementations unless configured.
pub const DEFAULT_THREAD_COUNTS: [u32; 4] = [1, 2, 4, 8];

/// Invalid experiment configuration, detected before any trial runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("Sample count must be at least 1")]
    ZeroSampleCount,
    #[error("Relative precision must be positive and finite, got {0}")]
    InvalidPrecision(f64),
    #[error("Z value must be positive and finite, got {0}")]
    InvalidZ(f64),
    #[error("Confidence level must be between 0 and 1 (exclusive), got {0}")]
    InvalidConfidenceLevel(f64),
    #[error("At least one workload case is required")]
    NoCases,
    #[error("Duplicate workload case name: {0}")]
    DuplicateCase(String),
    #[error("Workload case name must not be empty")]
    EmptyCaseName,
    #[error("Case '{case}': probability {name} = {value} is outside [0, 1]")]
    ProbabilityOutOfRange {
        case: String,
        name: &'static str,
        value: f64,
    },
    #[error("Case '{case}': probabilities sum to {sum}, expected 1.0")]
    ProbabilitySum { case: String, sum: f64 },
    #[error("Case '{0}': operation count must be at least 1")]
    ZeroOperations(String),
    #[error("At least one thread count is required")]
    NoThreadCounts,
    #[error("Thread counts must be at least 1")]
    ZeroThreads,
}

/// Concurrency-control strategy used by a trial producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ImplementationKind {
    Serial,
    Mutex,
    ReadWrite,
}

impl ImplementationKind {
    /// All kinds, in execution order.
    pub const ALL: [ImplementationKind; 3] = [
        ImplementationKind::Serial,
        ImplementationKind::Mutex,
        ImplementationKind::ReadWrite,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ImplementationKind::Serial => "Serial",
            ImplementationKind::Mutex => "Mutex",
            ImplementationKind::ReadWrite => "ReadWrite",
        }
    }

    /// Whether trials of this kind take a thread count argument.
    pub fn is_threaded(&self) -> bool {
        !matches!(self, ImplementationKind::Serial)
    }
}

impl fmt::Display for ImplementationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Named workload: list size, operation count and operation mix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkloadCase {
    pub name: String,
    /// Number of elements inserted before timing starts.
    pub initial_size: u64,
    /// Total number of operations across all threads.
    pub op_count: u64,
    /// Fraction of operations that are membership tests.
    pub p_member: f64,
    pub p_insert: f64,
    pub p_delete: f64,
}

impl WorkloadCase {
    pub fn new(
        name: impl Into<String>,
        initial_size: u64,
        op_count: u64,
        p_member: f64,
        p_insert: f64,
        p_delete: f64,
    ) -> Self {
        Self {
            name: name.into(),
            initial_size,
            op_count,
            p_member,
            p_insert,
            p_delete,
        }
    }

    /// The three canonical mixes: near-read-only, read-heavy and balanced.
    pub fn canonical() -> Vec<WorkloadCase> {
        vec![
            WorkloadCase::new("Case 1", 1000, 10_000, 0.99, 0.005, 0.005),
            WorkloadCase::new("Case 2", 1000, 10_000, 0.9, 0.05, 0.05),
            WorkloadCase::new("Case 3", 1000, 10_000, 0.5, 0.25, 0.25),
        ]
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyCaseName);
        }
        if self.op_count == 0 {
            return Err(ConfigurationError::ZeroOperations(self.name.clone()));
        }

        let split = [
            ("p_member", self.p_member),
            ("p_insert", self.p_insert),
            ("p_delete", self.p_delete),
        ];
        for (name, value) in split {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigurationError::ProbabilityOutOfRange {
                    case: self.name.clone(),
                    name,
                    value,
                });
            }
        }

        let sum = self.p_member + self.p_insert + self.p_delete;
        if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ConfigurationError::ProbabilitySum {
                case: self.name.clone(),
                sum,
            });
        }
        Ok(())
    }
}

/// One point of the experiment matrix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatrixCell {
    pub case: String,
    pub kind: ImplementationKind,
    pub threads: u32,
}

impl MatrixCell {
    pub fn new(case: impl Into<String>, kind: ImplementationKind, threads: u32) -> Self {
        Self {
            case: case.into(),
            kind,
            threads,
        }
    }
}

impl fmt::Display for MatrixCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.kind.is_threaded() {
            write!(f, "{} / {} / {} threads", self.case, self.kind, self.threads)
        } else {
            write!(f, "{} / {}", self.case, self.kind)
        }
    }
}

/// Validated set of cases and thread counts to run.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentMatrix {
    cases: Vec<WorkloadCase>,
    thread_counts: Vec<u32>,
}

impl ExperimentMatrix {
    /// Validate cases and thread counts.
    ///
    /// Thread counts are sorted and de-duplicated so cells of a kind always run
    /// in increasing thread order.
    pub fn new(
        cases: Vec<WorkloadCase>,
        mut thread_counts: Vec<u32>,
    ) -> Result<Self, ConfigurationError> {
        if cases.is_empty() {
            return Err(ConfigurationError::NoCases);
        }
        let mut names = HashSet::new();
        for case in &cases {
            case.validate()?;
            if !names.insert(case.name.as_str()) {
                return Err(ConfigurationError::DuplicateCase(case.name.clone()));
            }
        }

        if thread_counts.is_empty() {
            return Err(ConfigurationError::NoThreadCounts);
        }
        if thread_counts.contains(&0) {
            return Err(ConfigurationError::ZeroThreads);
        }
        thread_counts.sort_unstable();
        thread_counts.dedup();

        Ok(Self {
            cases,
            thread_counts,
        })
    }

    pub fn canonical() -> Self {
        Self {
            cases: WorkloadCase::canonical(),
            thread_counts: DEFAULT_THREAD_COUNTS.to_vec(),
        }
    }

    pub fn cases(&self) -> &[WorkloadCase] {
        &self.cases
    }

    pub fn thread_counts(&self) -> &[u32] {
        &self.thread_counts
    }

    /// Thread counts exercised for a given kind.
    pub fn threads_for(&self, kind: ImplementationKind) -> &[u32] {
        if kind.is_threaded() {
            &self.thread_counts
        } else {
            &[1]
        }
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cases.len() * (1 + 2 * self.thread_counts.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every cell with its case, in execution order: case, then kind, then
    /// increasing thread count.
    pub fn cells(&self) -> impl Iterator<Item = (&WorkloadCase, MatrixCell)> + '_ {
        self.cases.iter().flat_map(move |case| {
            ImplementationKind::ALL.into_iter().flat_map(move |kind| {
                self.threads_for(kind)
                    .iter()
                    .map(move |&threads| (case, MatrixCell::new(case.name.clone(), kind, threads)))
            })
        })
    }
}
