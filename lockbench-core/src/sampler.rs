//! Repeated trial execution for a single matrix cell.
//!
//! A [`TrialProducer`] yields one elapsed-time measurement per call. The
//! [`Sampler`] pulls a fixed number of measurements through a lazy [`Trials`]
//! iterator and reduces them to a [`SampleStatistic`]. Trials always run one
//! after another; running them concurrently would perturb the timings.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::matrix::ConfigurationError;
use crate::stats::{PrecisionTarget, SampleStatistic};

/// Default number of trials per cell.
pub const DEFAULT_SAMPLE_COUNT: u32 = 100;

/// Errors raised while producing a single trial.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrialExecutionError {
    /// The benchmark artifact for this cell was never built.
    #[error("Benchmark artifact unavailable: {0}")]
    MissingArtifact(PathBuf),
    /// The trial process could not be started.
    #[error("Failed to spawn trial: {0}")]
    Spawn(String),
    /// The trial process exited unsuccessfully.
    #[error("Trial exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },
    /// The trial did not finish in time.
    #[error("Trial timed out after {0:?}")]
    Timeout(Duration),
    /// The trial's output was not a number.
    #[error("Unparsable trial output: {0:?}")]
    UnparsableOutput(String),
    /// The trial reported a negative or non-finite elapsed time.
    #[error("Invalid elapsed time: {0}")]
    InvalidElapsed(f64),
    /// The sampler finished without collecting any trial.
    #[error("No trials were collected")]
    NoTrials,
}

/// A single measured elapsed time, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrialResult(f64);

impl TrialResult {
    /// Wrap a measurement, rejecting negative or non-finite values.
    pub fn new(millis: f64) -> Result<Self, TrialExecutionError> {
        if !millis.is_finite() || millis < 0.0 {
            return Err(TrialExecutionError::InvalidElapsed(millis));
        }
        Ok(Self(millis))
    }

    pub fn millis(&self) -> f64 {
        self.0
    }
}

/// Something that can run one timed trial and report its elapsed time.
///
/// Implementations block until the trial finishes.
pub trait TrialProducer {
    fn run_trial(&mut self) -> Result<TrialResult, TrialExecutionError>;
}

impl<F> TrialProducer for F
where
    F: FnMut() -> Result<TrialResult, TrialExecutionError>,
{
    fn run_trial(&mut self) -> Result<TrialResult, TrialExecutionError> {
        self()
    }
}

/// Lazy sequence of at most `remaining` trials drawn from a producer.
///
/// Nothing runs until the iterator is polled. Each call to [`Sampler::trials`]
/// starts a fresh sequence.
pub struct Trials<'a, P: ?Sized> {
    producer: &'a mut P,
    remaining: u32,
}

impl<P: TrialProducer + ?Sized> Iterator for Trials<'_, P> {
    type Item = Result<TrialResult, TrialExecutionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.producer.run_trial())
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining as usize, Some(self.remaining as usize))
    }
}

/// Runs a fixed number of trials and summarizes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    sample_count: u32,
    target: PrecisionTarget,
}

impl Default for Sampler {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            target: PrecisionTarget::default(),
        }
    }
}

impl Sampler {
    /// Create a sampler taking `sample_count` trials per cell.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] if `sample_count` is zero or the
    /// precision target is not positive and finite.
    pub fn new(sample_count: u32, target: PrecisionTarget) -> Result<Self, ConfigurationError> {
        if sample_count == 0 {
            return Err(ConfigurationError::ZeroSampleCount);
        }
        if !(target.relative_precision.is_finite() && target.relative_precision > 0.0) {
            return Err(ConfigurationError::InvalidPrecision(target.relative_precision));
        }
        if !(target.z.is_finite() && target.z > 0.0) {
            return Err(ConfigurationError::InvalidZ(target.z));
        }
        Ok(Self {
            sample_count,
            target,
        })
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn target(&self) -> &PrecisionTarget {
        &self.target
    }

    /// A lazy sequence of this sampler's trials from `producer`.
    pub fn trials<'a, P: TrialProducer + ?Sized>(&self, producer: &'a mut P) -> Trials<'a, P> {
        Trials {
            producer,
            remaining: self.sample_count,
        }
    }

    /// Run all trials and compute the cell statistic.
    ///
    /// The first failing trial aborts the remaining ones and its error is
    /// returned; no partial statistic is produced.
    pub fn sample<P: TrialProducer + ?Sized>(
        &self,
        producer: &mut P,
    ) -> Result<SampleStatistic, TrialExecutionError> {
        let results = self
            .trials(producer)
            .collect::<Result<Vec<TrialResult>, _>>()?;

        SampleStatistic::from_trials(&results, &self.target).ok_or(TrialExecutionError::NoTrials)
    }
}
