//! Plot descriptions for per-case results.
//!
//! A plot shows average execution time against thread count for the Mutex
//! and ReadWrite implementations, with the Serial average as a horizontal
//! reference line. The [`JsonPlotRenderer`] writes these as JSON documents
//! that any plotting front end can draw.

use std::path::PathBuf;

use lockbench_core::{CaseSeries, ExperimentReport};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum PlotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineStyle {
    Dashed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Marker {
    Circle,
}

/// A horizontal line at a constant y value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceLine {
    pub label: String,
    pub y: f64,
    pub color: String,
    pub style: LineStyle,
}

/// A curve over thread counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub label: String,
    pub marker: Marker,
    pub points: Vec<(u32, f64)>,
}

/// Everything needed to draw one case's plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotSpec {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub reference: Option<ReferenceLine>,
    pub series: Vec<Series>,
}

impl PlotSpec {
    pub fn from_series(series: &CaseSeries<'_>) -> Self {
        let curve = |label: &str, points: &[(u32, f64)]| Series {
            label: label.to_string(),
            marker: Marker::Circle,
            points: points.to_vec(),
        };
        Self {
            title: format!("Average Execution Time vs Number of Threads - {}", series.case),
            x_label: "Number of Threads".to_string(),
            y_label: "Average Execution Time (ms)".to_string(),
            reference: series.serial.map(|y| ReferenceLine {
                label: "Serial".to_string(),
                y,
                color: "red".to_string(),
                style: LineStyle::Dashed,
            }),
            series: vec![
                curve("Mutex", &series.mutex),
                curve("ReadWrite", &series.read_write),
            ],
        }
    }
}

/// File stem for a case's plot: spaces become underscores.
pub fn plot_file_stem(case: &str) -> String {
    case.replace(' ', "_")
}

/// Produces per-case plots from a finished report.
pub trait Renderer {
    /// Render every case, returning the files written.
    fn render(&self, report: &ExperimentReport) -> Result<Vec<PathBuf>, PlotError>;
}

/// Writes one `<case>.json` plot description per case.
#[derive(Debug, Clone)]
pub struct JsonPlotRenderer {
    output_dir: PathBuf,
}

impl JsonPlotRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

impl Renderer for JsonPlotRenderer {
    fn render(&self, report: &ExperimentReport) -> Result<Vec<PathBuf>, PlotError> {
        std::fs::create_dir_all(&self.output_dir)?;

        let mut written = Vec::with_capacity(report.cases().len());
        for case in report.cases() {
            let spec = PlotSpec::from_series(&case.series());
            if spec.reference.is_none() {
                warn!(case = case.name(), "No serial baseline; plot has no reference line");
            }

            let path = self
                .output_dir
                .join(format!("{}.json", plot_file_stem(case.name())));
            std::fs::write(&path, serde_json::to_string_pretty(&spec)?)?;
            debug!(path = %path.display(), "Wrote plot");
            written.push(path);
        }
        Ok(written)
    }
}
