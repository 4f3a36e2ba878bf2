use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use super::StatsError;

/// Default two-sided 95% quantile of the standard normal distribution.
pub const DEFAULT_Z: f64 = 1.96;

/// Default target half-width, as a percentage of the mean.
pub const DEFAULT_RELATIVE_PRECISION: f64 = 5.0;

/// Target precision for a measured mean.
///
/// The confidence interval half-width is `z * std_dev / sqrt(n)`. Requiring it
/// to be at most `relative_precision` percent of the mean gives
/// `n >= (z * std_dev * 100 / (relative_precision * mean))^2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PrecisionTarget {
    /// Maximum confidence half-width in percent of the mean (e.g. 5.0).
    pub relative_precision: f64,
    /// Standard normal quantile for the confidence level (e.g. 1.96).
    pub z: f64,
}

impl Default for PrecisionTarget {
    fn default() -> Self {
        Self {
            relative_precision: DEFAULT_RELATIVE_PRECISION,
            z: DEFAULT_Z,
        }
    }
}

impl PrecisionTarget {
    pub fn new(relative_precision: f64, z: f64) -> Self {
        Self {
            relative_precision,
            z,
        }
    }

    /// Smallest sample count meeting this target for the given mean and spread.
    ///
    /// A zero mean (or any input that makes the ratio non-finite) yields
    /// [`StatsError::Undefined`].
    pub fn required_samples(&self, mean: f64, std_dev: f64) -> Result<u64, StatsError> {
        let denominator = self.relative_precision * mean;
        if mean == 0.0 || !denominator.is_finite() || denominator == 0.0 {
            return Err(StatsError::Undefined { mean });
        }

        let ratio = self.z * std_dev * 100.0 / denominator;
        let required = ratio.powi(2).ceil();
        if !required.is_finite() {
            return Err(StatsError::Undefined { mean });
        }

        Ok(required as u64)
    }
}

/// Two-sided standard normal quantile for a confidence level in (0, 1).
///
/// Returns `None` when the level is outside the open interval.
pub fn z_for_confidence(confidence_level: f64) -> Option<f64> {
    if !(confidence_level > 0.0 && confidence_level < 1.0) {
        return None;
    }
    let standard = Normal::new(0.0, 1.0).ok()?;
    Some(standard.inverse_cdf(1.0 - (1.0 - confidence_level) / 2.0))
}
