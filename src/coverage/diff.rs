//! Comparison of a coverage snapshot against a prior build

use super::summary::folder_depth;
use super::{CoverageSnapshot, FolderSummary, Metric};

/// Decimal places used for every rendered percentage
pub const PERCENT_DECIMALS: i32 = 2;

/// Round a percentage to [`PERCENT_DECIMALS`], never producing `-0.0`
pub fn round_percent(value: f64) -> f64 {
    let factor = 10f64.powi(PERCENT_DECIMALS);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

impl Direction {
    /// Changes that round to zero are flat
    pub fn of(delta: f64) -> Self {
        let rounded = round_percent(delta);
        if rounded > 0.0 {
            Direction::Up
        } else if rounded < 0.0 {
            Direction::Down
        } else {
            Direction::Flat
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Direction::Up => "↑",
            Direction::Down => "↓",
            Direction::Flat => "→",
        }
    }
}

/// Change of one file or folder relative to the prior build
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    /// No prior snapshot to compare against
    Unavailable,
    /// Not present in the prior snapshot
    New,
    /// Current percent minus prior percent
    Changed(f64),
}

impl Delta {
    fn between(current: f64, prior: Option<f64>, has_prior: bool) -> Self {
        match (has_prior, prior) {
            (false, _) => Delta::Unavailable,
            (true, None) => Delta::New,
            (true, Some(prior)) => Delta::Changed(current - prior),
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Delta::Changed(value) => Some(*value),
            _ => None,
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        self.value().map(Direction::of)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FolderChange {
    pub path: String,
    pub depth: usize,
    pub files: usize,
    pub percent: f64,
    pub delta: Delta,
}

impl FolderChange {
    fn new(folder: &FolderSummary, prior: Option<&CoverageSnapshot>, metric: Metric) -> Self {
        let percent = folder.percent(metric);
        let before = prior
            .and_then(|p| p.folder(&folder.path))
            .map(|f| f.percent(metric));
        Self {
            path: folder.path.clone(),
            depth: folder.depth(),
            files: folder.files,
            percent,
            delta: Delta::between(percent, before, prior.is_some()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileChange {
    pub path: String,
    pub before: Option<f64>,
    pub after: f64,
    pub delta: Delta,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiffOptions {
    pub metric: Metric,
    /// A file is listed only when its absolute rounded delta (in percent
    /// points) is above this
    pub min_file_change: f64,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            metric: Metric::default(),
            min_file_change: 0.0,
        }
    }
}

/// Structured comparison of two builds
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageDiff {
    pub metric: Metric,
    pub has_prior: bool,
    /// The `*` row
    pub overall: FolderChange,
    /// Every folder, root first, ordered by depth then path
    pub folders: Vec<FolderChange>,
    /// Files whose coverage changed visibly, ordered by path
    pub changed: Vec<FileChange>,
}

/// Compare `current` against an optional prior snapshot.
///
/// Files present only in the prior snapshot are not reported.
pub fn diff(
    current: &CoverageSnapshot,
    prior: Option<&CoverageSnapshot>,
    options: &DiffOptions,
) -> CoverageDiff {
    let metric = options.metric;

    let mut folders: Vec<FolderChange> = current
        .folders()
        .map(|folder| FolderChange::new(folder, prior, metric))
        .collect();
    folders.sort_by(|a, b| {
        folder_depth(&a.path)
            .cmp(&folder_depth(&b.path))
            .then_with(|| a.path.cmp(&b.path))
    });

    let overall = FolderChange::new(current.root(), prior, metric);

    let changed = match prior {
        Some(prior) => changed_files(current, prior, options),
        None => Vec::new(),
    };

    CoverageDiff {
        metric,
        has_prior: prior.is_some(),
        overall,
        folders,
        changed,
    }
}

fn changed_files(
    current: &CoverageSnapshot,
    prior: &CoverageSnapshot,
    options: &DiffOptions,
) -> Vec<FileChange> {
    let metric = options.metric;
    let mut changed = Vec::new();

    // CoverageMap iterates in path order
    for file in current.files().iter() {
        let after_counter = file.metrics.get(metric);
        let after = after_counter.percent();

        let Some(previous) = prior.files().get(&file.path) else {
            changed.push(FileChange {
                path: file.path.clone(),
                before: None,
                after,
                delta: Delta::New,
            });
            continue;
        };

        let before_counter = previous.metrics.get(metric);
        let before = before_counter.percent();
        let delta = after - before;
        let rounded = round_percent(delta).abs();
        let appeared_or_vanished = (before_counter.total == 0) != (after_counter.total == 0);
        let visible = rounded > 0.0 && rounded > options.min_file_change;

        if visible || appeared_or_vanished {
            changed.push(FileChange {
                path: file.path.clone(),
                before: Some(before),
                after,
                delta: Delta::Changed(delta),
            });
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coverage::{Counter, CoverageMap, CoverageMetrics, FileCoverage};

    fn snapshot(files: &[(&str, u64, u64)]) -> CoverageSnapshot {
        CoverageSnapshot::from_map(CoverageMap::from_files(files.iter().map(
            |(path, covered, total)| {
                FileCoverage::new(
                    *path,
                    CoverageMetrics {
                        lines: Counter::new(*covered, *total),
                        ..Default::default()
                    },
                )
            },
        )))
    }

    #[test]
    fn test_round_percent_avoids_negative_zero() {
        assert_eq!(round_percent(-0.001).to_string(), "0");
        assert_eq!(round_percent(1.234_9), 1.23);
        assert_eq!(round_percent(-2.5), -2.5);
    }

    #[test]
    fn test_direction() {
        assert_eq!(Direction::of(0.5), Direction::Up);
        assert_eq!(Direction::of(-2.5), Direction::Down);
        assert_eq!(Direction::of(0.004), Direction::Flat);
        assert_eq!(Direction::of(-0.004), Direction::Flat);
        assert_eq!(Direction::Up.glyph(), "↑");
    }

    #[test]
    fn test_no_prior_has_no_deltas() {
        let current = snapshot(&[("a.js", 8, 10)]);
        let result = diff(&current, None, &DiffOptions::default());

        assert!(!result.has_prior);
        assert_eq!(result.overall.delta, Delta::Unavailable);
        assert!(result.overall.delta.direction().is_none());
        assert!(result.changed.is_empty());
        assert!((result.overall.percent - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_deltas_against_prior() {
        let current = snapshot(&[
            ("src/a.js", 9, 10),
            ("src/b.js", 5, 10),
            ("src/new/c.js", 1, 2),
            ("z.js", 3, 3),
        ]);
        let prior = snapshot(&[
            ("src/a.js", 8, 10),
            ("src/b.js", 5, 10),
            ("gone.js", 0, 10),
            ("z.js", 3, 3),
        ]);
        let result = diff(&current, Some(&prior), &DiffOptions::default());

        let changed: Vec<_> = result.changed.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(changed, vec!["src/a.js", "src/new/c.js"]);

        let a = &result.changed[0];
        assert_eq!(a.before, Some(80.0));
        assert_eq!(a.delta.direction(), Some(Direction::Up));
        assert_eq!(result.changed[1].delta, Delta::New);

        let new_folder = result.folders.iter().find(|f| f.path == "src/new").unwrap();
        assert_eq!(new_folder.delta, Delta::New);
        assert!(result.overall.delta.value().is_some());
    }

    #[test]
    fn test_folders_sorted_by_depth_then_path() {
        let current = snapshot(&[
            ("b/x/y.js", 1, 1),
            ("a/z/q.js", 1, 1),
            ("c/k.js", 1, 1),
        ]);
        let result = diff(&current, None, &DiffOptions::default());
        let paths: Vec<_> = result.folders.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["*", "a", "b", "c", "a/z", "b/x"]);
    }

    #[test]
    fn test_min_file_change_hides_small_moves() {
        let current = snapshot(&[("a.js", 501, 1000), ("b.js", 60, 100)]);
        let prior = snapshot(&[("a.js", 500, 1000), ("b.js", 50, 100)]);
        let options = DiffOptions {
            min_file_change: 1.0,
            ..Default::default()
        };
        let result = diff(&current, Some(&prior), &options);
        let changed: Vec<_> = result.changed.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(changed, vec!["b.js"]);
    }

    #[test]
    fn test_min_file_change_is_exclusive() {
        let current = snapshot(&[("a.js", 51, 100), ("b.js", 52, 100)]);
        let prior = snapshot(&[("a.js", 50, 100), ("b.js", 50, 100)]);
        let options = DiffOptions {
            min_file_change: 1.0,
            ..Default::default()
        };
        let result = diff(&current, Some(&prior), &options);
        let changed: Vec<_> = result.changed.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(changed, vec!["b.js"]);
    }

    #[test]
    fn test_coverage_appearing_is_listed_even_when_flat() {
        let current = snapshot(&[("a.js", 4, 4)]);
        let prior = snapshot(&[("a.js", 0, 0)]);
        let result = diff(&current, Some(&prior), &DiffOptions::default());
        assert_eq!(result.changed.len(), 1);
        assert_eq!(result.changed[0].delta.direction(), Some(Direction::Flat));
    }
}
