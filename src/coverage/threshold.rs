//! Coverage threshold validation

use colored::Colorize;
use serde::{Deserialize, Serialize};

use super::{format_delta, format_percent};

pub const DESCRIPTION_PASSED: &str = "Your code coverage passed!";
pub const DESCRIPTION_BOTH_FAILED: &str = "Your code coverage was less than the minimum required, and the coverage change was also less than the minimum required.";
pub const DESCRIPTION_CHANGE_FAILED: &str =
    "Your code coverage change was less than the minimum required.";
pub const DESCRIPTION_COVERAGE_FAILED: &str =
    "Your code coverage was less than the minimum required.";

/// Policy for the commit status. `None` means the check is not configured;
/// `Some(0.0)` is a real threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Thresholds {
    /// Current percent must be strictly above this
    pub minimum_coverage: Option<f64>,
    /// Current minus prior percent must be strictly above this; may be negative
    pub minimum_change: Option<f64>,
}

impl Thresholds {
    pub fn is_configured(&self) -> bool {
        self.minimum_coverage.is_some() || self.minimum_change.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusState {
    Success,
    Failure,
}

impl StatusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusState::Success => "success",
            StatusState::Failure => "failure",
        }
    }
}

/// Result of threshold validation
#[derive(Debug, Clone, PartialEq)]
pub struct Verdict {
    pub state: StatusState,
    pub description: String,
    pub passed_minimum_coverage: bool,
    pub passed_minimum_change: bool,
    pub current: f64,
    pub prior: Option<f64>,
}

impl Verdict {
    pub fn passed(&self) -> bool {
        self.state == StatusState::Success
    }

    pub fn print_summary(&self) {
        let status = if self.passed() { "✓".green() } else { "✗".red() };
        let change = match self.prior {
            Some(prior) => format!(" ({})", format_delta(self.current - prior)),
            None => String::new(),
        };
        println!(
            "  {} Coverage: {}{} - {}",
            status,
            format_percent(self.current),
            change,
            self.description
        );
    }
}

/// Validate whole-repository coverage against thresholds
pub fn evaluate(current: f64, prior: Option<f64>, thresholds: &Thresholds) -> Verdict {
    let passed_minimum_coverage = match thresholds.minimum_coverage {
        Some(minimum) => current > minimum,
        None => true,
    };

    let passed_minimum_change = match (thresholds.minimum_change, prior) {
        (Some(minimum), Some(prior)) => (current - prior) > minimum,
        _ => true,
    };

    let (state, description) = match (passed_minimum_coverage, passed_minimum_change) {
        (true, true) => (StatusState::Success, DESCRIPTION_PASSED),
        (false, false) => (StatusState::Failure, DESCRIPTION_BOTH_FAILED),
        (true, false) => (StatusState::Failure, DESCRIPTION_CHANGE_FAILED),
        (false, true) => (StatusState::Failure, DESCRIPTION_COVERAGE_FAILED),
    };

    Verdict {
        state,
        description: description.to_string(),
        passed_minimum_coverage,
        passed_minimum_change,
        current,
        prior,
    }
}
