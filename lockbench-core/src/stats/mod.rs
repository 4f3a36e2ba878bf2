use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use thiserror::Error;

use crate::sampler::TrialResult;

/// Reasons a statistic cannot be computed from a sample.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StatsError {
    /// Standard deviation needs at least two observations.
    #[error("Insufficient samples: {count} collected, at least 2 required")]
    InsufficientSamples { count: usize },
    /// The required-sample formula divides by the mean.
    #[error("Required sample count is undefined for mean {mean}")]
    Undefined { mean: f64 },
}

/// A derived value that may be unavailable for a well-understood reason.
///
/// Marked values are part of the result rather than errors: a cell with a
/// single trial still has a mean, it just has no spread.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Estimate<T> {
    Value(T),
    InsufficientSamples,
    Undefined,
}

impl<T: Copy> Estimate<T> {
    /// The numeric value, if one was computed.
    pub fn value(&self) -> Option<T> {
        match self {
            Estimate::Value(v) => Some(*v),
            _ => None,
        }
    }
}

impl<T> From<Result<T, StatsError>> for Estimate<T> {
    fn from(result: Result<T, StatsError>) -> Self {
        match result {
            Ok(v) => Estimate::Value(v),
            Err(StatsError::InsufficientSamples { .. }) => Estimate::InsufficientSamples,
            Err(StatsError::Undefined { .. }) => Estimate::Undefined,
        }
    }
}

/// Summary of the trials collected for one matrix cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleStatistic {
    /// Number of trials the statistic was computed from.
    pub sample_count: usize,
    /// Arithmetic mean elapsed time in milliseconds.
    pub mean: f64,
    /// Sample standard deviation (n-1 divisor) in milliseconds.
    pub std_dev: Estimate<f64>,
    /// Trials needed to reach the configured relative precision.
    pub required_samples: Estimate<u64>,
}

impl SampleStatistic {
    /// Compute the statistic for a non-empty, ordered sequence of trials.
    ///
    /// Returns `None` for an empty sequence; the sampler never produces one.
    pub fn from_trials(trials: &[TrialResult], target: &PrecisionTarget) -> Option<Self> {
        if trials.is_empty() {
            return None;
        }
        let values: Vec<f64> = trials.iter().map(|t| t.millis()).collect();

        let mean = mean(&values);
        let std_dev = sample_std_dev(&values);
        let required_samples = match std_dev {
            Ok(sd) => target.required_samples(mean, sd),
            Err(e) => Err(e),
        };

        Some(Self {
            sample_count: values.len(),
            mean,
            std_dev: std_dev.into(),
            required_samples: required_samples.into(),
        })
    }

    /// Whether the collected trials already meet the precision target.
    pub fn is_adequate(&self) -> bool {
        matches!(self.required_samples, Estimate::Value(n) if n <= self.sample_count as u64)
    }
}

/// Arithmetic mean of the values (NaN for an empty slice).
pub fn mean(values: &[f64]) -> f64 {
    Statistics::mean(values)
}

/// Unbiased sample standard deviation.
pub fn sample_std_dev(values: &[f64]) -> Result<f64, StatsError> {
    if values.len() < 2 {
        return Err(StatsError::InsufficientSamples {
            count: values.len(),
        });
    }
    Ok(Statistics::std_dev(values))
}

pub mod precision;
pub use precision::{z_for_confidence, PrecisionTarget};
