//! coverage-reporter
//!
//! Compares Istanbul coverage of the current CI build with the latest build
//! of the base branch and reports the result on GitHub:
//! - Per-file and per-folder coverage with changes since the prior build
//! - A markdown pull request comment
//! - A pass/fail commit status against configurable thresholds

pub mod ci;
pub mod config;
pub mod coverage;
pub mod error;
pub mod history;
pub mod logging;
pub mod notifications;
pub mod report;
pub mod reporter;

#[cfg(test)]
pub(crate) mod testing;

pub use coverage::{CoverageMap, CoverageSnapshot, Metric, Thresholds, Verdict};
pub use error::{ReporterError, Result};
pub use reporter::{prepare, run, Outcome, Report};
