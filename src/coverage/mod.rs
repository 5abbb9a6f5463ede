//! Coverage module
//!
//! Provides:
//! - Istanbul JSON parsing
//! - Folder aggregation
//! - Diffing against a prior snapshot
//! - Markdown rendering
//! - Threshold evaluation

mod diff;
mod format;
mod istanbul;
mod summary;
mod threshold;

pub use diff::*;
pub use format::*;
pub use istanbul::*;
pub use summary::*;
pub use threshold::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::AddAssign;
use std::str::FromStr;

/// Covered/total pair for one kind of coverage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counter {
    pub covered: u64,
    pub total: u64,
}

impl Counter {
    pub fn new(covered: u64, total: u64) -> Self {
        Self { covered, total }
    }

    /// Percent covered; an empty counter counts as fully covered.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        (self.covered as f64 / self.total as f64) * 100.0
    }
}

impl AddAssign for Counter {
    fn add_assign(&mut self, other: Self) {
        self.covered += other.covered;
        self.total += other.total;
    }
}

/// Which counter drives the headline percent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Statements,
    Branches,
    Functions,
    #[default]
    Lines,
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "statements" => Ok(Metric::Statements),
            "branches" => Ok(Metric::Branches),
            "functions" => Ok(Metric::Functions),
            "lines" => Ok(Metric::Lines),
            _ => Err(format!(
                "Unknown metric: {}. Supported: statements, branches, functions, lines",
                s
            )),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::Statements => "statements",
            Metric::Branches => "branches",
            Metric::Functions => "functions",
            Metric::Lines => "lines",
        };
        f.write_str(name)
    }
}

/// Statement, branch, function and line counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageMetrics {
    pub statements: Counter,
    pub branches: Counter,
    pub functions: Counter,
    pub lines: Counter,
}

impl CoverageMetrics {
    pub fn get(&self, metric: Metric) -> Counter {
        match metric {
            Metric::Statements => self.statements,
            Metric::Branches => self.branches,
            Metric::Functions => self.functions,
            Metric::Lines => self.lines,
        }
    }

    pub fn percent(&self, metric: Metric) -> f64 {
        self.get(metric).percent()
    }
}

impl AddAssign for CoverageMetrics {
    fn add_assign(&mut self, other: Self) {
        self.statements += other.statements;
        self.branches += other.branches;
        self.functions += other.functions;
        self.lines += other.lines;
    }
}

/// Coverage data for a single file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCoverage {
    /// Repository-relative path using `/` separators
    pub path: String,
    pub metrics: CoverageMetrics,
}

impl FileCoverage {
    pub fn new(path: impl Into<String>, metrics: CoverageMetrics) -> Self {
        Self {
            path: path.into(),
            metrics,
        }
    }
}

/// Per-file coverage for one build, keyed by repository-relative path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageMap {
    files: BTreeMap<String, FileCoverage>,
}

impl CoverageMap {
    pub fn from_files(files: impl IntoIterator<Item = FileCoverage>) -> Self {
        let mut merged: BTreeMap<String, FileCoverage> = BTreeMap::new();
        for file in files {
            match merged.get_mut(&file.path) {
                Some(existing) => existing.metrics += file.metrics,
                None => {
                    merged.insert(file.path.clone(), file);
                }
            }
        }
        Self { files: merged }
    }

    pub fn get(&self, path: &str) -> Option<&FileCoverage> {
        self.files.get(path)
    }

    /// Files in path order
    pub fn iter(&self) -> impl Iterator<Item = &FileCoverage> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Copy of this map without the files matching any of `patterns`
    pub fn exclude(&self, patterns: &[glob::Pattern]) -> Self {
        if patterns.is_empty() {
            return self.clone();
        }
        let files = self
            .files
            .iter()
            .filter(|(path, _)| !patterns.iter().any(|p| p.matches(path)))
            .map(|(path, file)| (path.clone(), file.clone()))
            .collect();
        Self { files }
    }
}
