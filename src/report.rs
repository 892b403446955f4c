// In: src/report.rs

//! Presenters for a verification run.
//!
//! A `ReportingSink` only formats; it never influences the verdict. Output is
//! best effort: a failed write is logged and otherwise ignored.

use std::fmt;
use std::io::{self, Write};

use colored::Colorize;

use crate::config::RunConfig;
use crate::pipeline::{PhaseTiming, RunResult};
use crate::types::ErrorBoundMode;

//==================================================================================
// 1. The Sink Trait
//==================================================================================

/// A timed backend call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Compress,
    Decompress,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Compress => write!(f, "Compression"),
            Phase::Decompress => write!(f, "Decompression"),
        }
    }
}

pub trait ReportingSink {
    /// Called once, before any data is loaded.
    fn print_config(&mut self, config: &RunConfig);

    /// Value range of the loaded input, widened to `f64`.
    fn print_min_max(&mut self, _min: f64, _max: f64) {}

    fn print_phase(&mut self, _phase: Phase, _timing: &PhaseTiming) {}

    /// Called once per completed round trip, whether or not the tolerance was met.
    fn print_result(&mut self, result: &RunResult);
}

/// A sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl ReportingSink for NullReporter {
    fn print_config(&mut self, _config: &RunConfig) {}
    fn print_result(&mut self, _result: &RunResult) {}
}

/// "Abs. L^2 error", "Rel. L^infty error", ...
pub fn error_label(result: &RunResult) -> String {
    let prefix = match result.mode {
        ErrorBoundMode::Absolute => "Abs.",
        ErrorBoundMode::Relative => "Rel.",
    };
    format!("{} {} error", prefix, result.metric.label())
}

//==================================================================================
// 2. Console Presenter
//==================================================================================

/// Human-readable output in the layout of the legacy command-line tool.
pub struct ConsoleReporter<W: Write> {
    out: W,
}

impl ConsoleReporter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, text: fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(text).and_then(|_| self.out.write_all(b"\n")) {
            log::warn!("Report output failed: {}", e);
        }
    }
}

impl<W: Write> ReportingSink for ConsoleReporter<W> {
    fn print_config(&mut self, config: &RunConfig) {
        self.emit(format_args!("Input data: {}", config.input));
        self.emit(format_args!("Data type: {}", config.precision));
        self.emit(format_args!("Shape: {}", config.shape));
        self.emit(format_args!("Error: {}", config.mode));
        self.emit(format_args!(
            "Error bound: {:.2e} S: {:.2}",
            config.tolerance, config.smoothness
        ));
        self.emit(format_args!("Use: {}", config.device));
    }

    fn print_min_max(&mut self, min: f64, max: f64) {
        self.emit(format_args!("Min: {:.6}, Max: {:.6}", min, max));
    }

    fn print_phase(&mut self, phase: Phase, timing: &PhaseTiming) {
        let seconds = timing.elapsed.as_secs_f64();
        match timing.throughput() {
            Some(bps) => self.emit(format_args!(
                "{} time: {:.6} s ({:.3} GB/s)",
                phase,
                seconds,
                bps / 1e9
            )),
            None => self.emit(format_args!("{} time: {:.6} s", phase, seconds)),
        }
    }

    fn print_result(&mut self, result: &RunResult) {
        self.emit(format_args!(
            "In size:  {:>10}  Out size: {:>10}  Compression ratio: {:>10.3}",
            result.original_size_bytes, result.compressed_size_bytes, result.compression_ratio
        ));
        self.emit(format_args!(
            "{}: {:10.5E}",
            error_label(result),
            result.measured_error
        ));
        if result.tolerance_met {
            self.emit(format_args!("{}", "SUCCESS: Error tolerance met!".green()));
        } else {
            self.emit(format_args!("{}", "FAILURE: Error tolerance NOT met!".red()));
        }
    }
}

//==================================================================================
// 3. JSON Presenter
//==================================================================================

/// Writes each `RunResult` as one JSON line, for consumption by test suites.
pub struct JsonReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ReportingSink for JsonReporter<W> {
    fn print_config(&mut self, config: &RunConfig) {
        log::debug!("JSON report for input '{}'", config.input);
    }

    fn print_result(&mut self, result: &RunResult) {
        let written = serde_json::to_writer(&mut self.out, result)
            .map_err(io::Error::from)
            .and_then(|_| self.out.write_all(b"\n"));
        if let Err(e) = written {
            log::warn!("JSON report output failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::compression_ratio;
    use crate::types::{Device, NormKind, Precision, Shape};
    use std::time::Duration;

    fn sample_config() -> RunConfig {
        RunConfig {
            input: "random".into(),
            precision: Precision::Single,
            shape: Shape::new(vec![10, 10]).unwrap(),
            mode: ErrorBoundMode::Absolute,
            tolerance: 5.0,
            smoothness: 0.0,
            device: Device::Cpu,
            enforce_size: false,
        }
    }

    fn sample_result(met: bool) -> RunResult {
        let timing = PhaseTiming {
            elapsed: Duration::from_millis(2),
            bytes: 400,
        };
        RunResult {
            device: Device::Cpu,
            original_size_bytes: 400,
            compressed_size_bytes: 160,
            compression_ratio: compression_ratio(400, 160),
            metric: NormKind::L2,
            mode: ErrorBoundMode::Relative,
            norm: 10.0,
            measured_error: 0.01,
            tolerance: 0.1,
            effective_tolerance: 1.0,
            tolerance_met: met,
            compress: timing,
            decompress: timing,
        }
    }

    fn console_text(f: impl FnOnce(&mut ConsoleReporter<Vec<u8>>)) -> String {
        let mut reporter = ConsoleReporter::new(Vec::new());
        f(&mut reporter);
        String::from_utf8(reporter.into_inner()).unwrap()
    }

    #[test]
    fn test_console_config_lines() {
        let text = console_text(|r| r.print_config(&sample_config()));
        assert!(text.contains("Input data: random\n"));
        assert!(text.contains("Data type: single precision\n"));
        assert!(text.contains("Shape: 2 ( 10 10 )\n"));
        assert!(text.contains("Error: Absolute\n"));
        assert!(text.contains("S: 0.00\n"));
        assert!(text.contains("Use: CPU\n"));
    }

    #[test]
    fn test_console_result_lines() {
        let text = console_text(|r| r.print_result(&sample_result(true)));
        assert!(text.contains("Compression ratio:      2.500"));
        assert!(text.contains("Rel. L^2 error:"));
        assert!(text.contains("SUCCESS"));

        let text = console_text(|r| r.print_result(&sample_result(false)));
        assert!(text.contains("FAILURE"));
    }

    #[test]
    fn test_console_min_max_and_phase() {
        let text = console_text(|r| {
            r.print_min_max(1.0, 100.0);
            r.print_phase(Phase::Compress, &sample_result(true).compress);
        });
        assert!(text.contains("Min: 1.000000, Max: 100.000000"));
        assert!(text.contains("Compression time: 0.002000 s"));
    }

    #[test]
    fn test_json_reporter_emits_run_result() {
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.print_config(&sample_config());
        reporter.print_result(&sample_result(true));
        let text = String::from_utf8(reporter.into_inner()).unwrap();

        let value: serde_json::Value = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(value["original_size_bytes"], 400);
        assert_eq!(value["tolerance_met"], true);
        assert_eq!(value["mode"], "relative");
        assert_eq!(value["compress"]["elapsed_seconds"], 0.002);
    }
}
