//! Sequential execution of the experiment matrix.
//!
//! The runner visits every cell exactly once, in matrix order, and samples it
//! through a producer obtained from a [`TrialProducerFactory`]. Cells never
//! overlap. A failing cell is reported and the run moves on.

use tracing::{debug, info, warn};

use crate::matrix::{ExperimentMatrix, MatrixCell, WorkloadCase};
use crate::report::{ExperimentReport, ReportBuilder, ReportError};
use crate::sampler::{Sampler, TrialExecutionError, TrialProducer};
use crate::stats::SampleStatistic;

/// Supplies a trial producer for each matrix cell.
pub trait TrialProducerFactory {
    type Producer: TrialProducer;

    fn producer_for(&self, case: &WorkloadCase, cell: &MatrixCell) -> Self::Producer;
}

/// The result of sampling one cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOutcome {
    pub cell: MatrixCell,
    pub result: Result<SampleStatistic, TrialExecutionError>,
}

/// Runs every cell of an experiment matrix through a sampler.
#[derive(Debug, Clone)]
pub struct MatrixRunner {
    matrix: ExperimentMatrix,
    sampler: Sampler,
}

impl MatrixRunner {
    pub fn new(matrix: ExperimentMatrix, sampler: Sampler) -> Self {
        Self { matrix, sampler }
    }

    pub fn matrix(&self) -> &ExperimentMatrix {
        &self.matrix
    }

    /// Lazily run the matrix; each call to `next` samples one cell.
    pub fn run<'a, F: TrialProducerFactory>(&'a self, factory: &'a F) -> MatrixRun<'a, F> {
        MatrixRun {
            cells: Box::new(self.matrix.cells()),
            factory,
            sampler: &self.sampler,
            position: 0,
            total: self.matrix.len(),
        }
    }

    /// Run the whole matrix and aggregate it into a report.
    ///
    /// `on_outcome` sees every outcome as soon as its cell finishes.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::DuplicateCell`] if a cell is produced twice.
    /// Failed cells are not errors; they are recorded in the report.
    pub fn run_to_report<F, O>(
        &self,
        factory: &F,
        on_outcome: O,
    ) -> Result<ExperimentReport, ReportError>
    where
        F: TrialProducerFactory,
        O: FnMut(&CellOutcome),
    {
        self.aggregate(self.run(factory), on_outcome)
    }

    /// Aggregate outcomes in this matrix's case order.
    ///
    /// Stops pulling outcomes at the first one that cannot be recorded, so a
    /// lazy run halts there.
    pub fn aggregate<I, O>(
        &self,
        outcomes: I,
        mut on_outcome: O,
    ) -> Result<ExperimentReport, ReportError>
    where
        I: IntoIterator<Item = CellOutcome>,
        O: FnMut(&CellOutcome),
    {
        let mut builder = ReportBuilder::for_matrix(&self.matrix);
        for outcome in outcomes {
            on_outcome(&outcome);
            builder.record(outcome)?;
        }
        Ok(builder.finish())
    }
}

/// Iterator over cell outcomes, driving one cell per step.
pub struct MatrixRun<'a, F> {
    cells: Box<dyn Iterator<Item = (&'a WorkloadCase, MatrixCell)> + 'a>,
    factory: &'a F,
    sampler: &'a Sampler,
    position: usize,
    total: usize,
}

impl<F: TrialProducerFactory> Iterator for MatrixRun<'_, F> {
    type Item = CellOutcome;

    fn next(&mut self) -> Option<CellOutcome> {
        let (case, cell) = self.cells.next()?;
        self.position += 1;

        info!(
            cell = %cell,
            position = self.position,
            total = self.total,
            samples = self.sampler.sample_count(),
            "Running cell"
        );

        let mut producer = self.factory.producer_for(case, &cell);
        let result = self.sampler.sample(&mut producer);

        match &result {
            Ok(stat) => debug!(
                cell = %cell,
                mean = stat.mean,
                std_dev = ?stat.std_dev,
                required_samples = ?stat.required_samples,
                "Cell complete"
            ),
            Err(e) => warn!(cell = %cell, error = %e, "Cell failed, continuing with next cell"),
        }

        Some(CellOutcome { cell, result })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.position;
        (remaining, Some(remaining))
    }
}
