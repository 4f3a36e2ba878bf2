use std::io::{self, Write};

use colored::Colorize;

use super::{CaseReport, CellFailure, ExperimentReport, ReportError, Reporter, ThreadPoint};
use crate::matrix::ImplementationKind;
use crate::stats::{Estimate, SampleStatistic};

/// A reporter that prints experiment results to the terminal, grouped by case
/// and implementation.
#[derive(Debug, Clone, Default)]
pub struct TerminalReporter {
    /// Whether to use colors in output (defaults to true).
    use_colors: bool,
}

impl TerminalReporter {
    /// Create a new terminal reporter with default settings.
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    /// Create a terminal reporter with color output disabled.
    pub fn without_colors() -> Self {
        Self { use_colors: false }
    }

    /// Write the report to any writer.
    pub fn write_report(
        &self,
        writer: &mut impl Write,
        report: &ExperimentReport,
    ) -> io::Result<()> {
        for case in report.cases() {
            self.print_case(writer, case, report.failures())?;
        }
        self.print_failure_list(writer, report.failures())?;
        self.print_summary(writer, report)
    }

    fn format_ms(ms: f64) -> String {
        format!("{:.4} ms", ms)
    }

    fn format_std_dev(std_dev: &Estimate<f64>) -> String {
        match std_dev {
            Estimate::Value(sd) => Self::format_ms(*sd),
            Estimate::InsufficientSamples => "insufficient samples".to_string(),
            Estimate::Undefined => "undefined".to_string(),
        }
    }

    fn format_required(&self, stat: &SampleStatistic) -> String {
        let text = match stat.required_samples {
            Estimate::Value(n) => format!("{} (collected {})", n, stat.sample_count),
            Estimate::InsufficientSamples => "insufficient samples".to_string(),
            Estimate::Undefined => "undefined (zero mean)".to_string(),
        };
        if !self.use_colors {
            return text;
        }
        match stat.required_samples {
            Estimate::Value(_) if stat.is_adequate() => text.green().to_string(),
            _ => text.yellow().to_string(),
        }
    }

    fn kind_header(kind: ImplementationKind) -> String {
        format!("{} Linked List", kind.label())
    }

    fn print_case(
        &self,
        writer: &mut impl Write,
        case: &CaseReport,
        failures: &[CellFailure],
    ) -> io::Result<()> {
        let banner = format!("=============== {} ===============", case.name().to_uppercase());
        if self.use_colors {
            writeln!(writer, "{}", banner.bold())?;
        } else {
            writeln!(writer, "{}", banner)?;
        }

        for kind in ImplementationKind::ALL {
            let failed: Vec<&CellFailure> = failures
                .iter()
                .filter(|f| f.cell.case == case.name() && f.cell.kind == kind)
                .collect();
            let points = case.points(kind);
            if points.is_empty() && failed.is_empty() {
                continue;
            }

            writeln!(writer, "{}", Self::kind_header(kind))?;
            writeln!(writer, "=======")?;

            // Successes and failures interleaved by thread count.
            let mut threads: Vec<u32> = points
                .iter()
                .map(|p| p.threads)
                .chain(failed.iter().map(|f| f.cell.threads))
                .collect();
            threads.sort_unstable();

            for t in threads {
                if kind.is_threaded() {
                    writeln!(writer, "{} - Number of Threads: {}", kind.label(), t)?;
                }
                if let Some(point) = points.iter().find(|p| p.threads == t) {
                    self.print_point(writer, point)?;
                } else if let Some(failure) = failed.iter().find(|f| f.cell.threads == t) {
                    self.print_failure(writer, failure)?;
                }
                writeln!(writer)?;
            }
        }
        Ok(())
    }

    fn print_point(&self, writer: &mut impl Write, point: &ThreadPoint) -> io::Result<()> {
        let stat = &point.statistic;
        writeln!(writer, "Average: {}", Self::format_ms(stat.mean))?;
        writeln!(
            writer,
            "Standard Deviation: {}",
            Self::format_std_dev(&stat.std_dev)
        )?;
        writeln!(writer, "Required Samples: {}", self.format_required(stat))?;
        Ok(())
    }

    fn print_failure(&self, writer: &mut impl Write, failure: &CellFailure) -> io::Result<()> {
        let text = format!("FAILED: {}", failure.error);
        if self.use_colors {
            writeln!(writer, "{}", text.red().bold())
        } else {
            writeln!(writer, "{}", text)
        }
    }

    fn print_failure_list(
        &self,
        writer: &mut impl Write,
        failures: &[CellFailure],
    ) -> io::Result<()> {
        if failures.is_empty() {
            return Ok(());
        }

        let header = format!("Failed cells ({}):", failures.len());
        if self.use_colors {
            writeln!(writer, "{}", header.red().bold())?;
        } else {
            writeln!(writer, "{}", header)?;
        }
        for failure in failures {
            writeln!(writer, "  {}: {}", failure.cell, failure.error)?;
        }
        writeln!(writer)
    }

    fn print_summary(&self, writer: &mut impl Write, report: &ExperimentReport) -> io::Result<()> {
        let measured = report.statistic_count();
        let failed = report.failures().len();
        let inadequate = report
            .cases()
            .iter()
            .flat_map(|c| ImplementationKind::ALL.into_iter().flat_map(move |k| c.points(k)))
            .filter(|p| !p.statistic.is_adequate())
            .count();

        writeln!(writer, "{}", "-".repeat(60))?;

        let summary_label = "Summary:";
        if self.use_colors {
            write!(writer, "{} ", summary_label.bold())?;
        } else {
            write!(writer, "{} ", summary_label)?;
        }

        let measured_text = format!("{} measured", measured);
        let failed_text = format!("{} failed", failed);
        let inadequate_text = format!("{} below target precision", inadequate);

        if self.use_colors {
            writeln!(
                writer,
                "{}, {}, {}",
                measured_text.green(),
                failed_text.red(),
                inadequate_text.yellow()
            )?;
        } else {
            writeln!(writer, "{}, {}, {}", measured_text, failed_text, inadequate_text)?;
        }

        writeln!(writer)?;
        Ok(())
    }
}

impl Reporter for TerminalReporter {
    fn report(&self, report: &ExperimentReport) -> Result<(), ReportError> {
        let stdout = io::stdout();
        let mut writer = stdout.lock();
        self.write_report(&mut writer, report)?;
        Ok(())
    }
}
