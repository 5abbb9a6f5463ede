//! Istanbul JSON parser
//!
//! Accepts both `coverage-final.json` (per-file hit maps) and
//! `coverage-summary.json` (per-file covered/total counters).

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use super::{Counter, CoverageMap, CoverageMetrics, FileCoverage};
use crate::error::{ReporterError, Result};

/// Parse an Istanbul coverage file, normalizing paths relative to `root`
pub fn parse_file(root: &Path, path: &Path) -> Result<CoverageMap> {
    let content =
        fs::read_to_string(path).map_err(|e| ReporterError::parse(path, e.to_string()))?;
    parse_coverage_json(root, &content).map_err(|message| ReporterError::parse(path, message))
}

/// Parse Istanbul coverage already loaded into memory
pub fn parse_str(root: &Path, content: &str) -> Result<CoverageMap> {
    parse_coverage_json(root, content).map_err(|message| ReporterError::parse("<input>", message))
}

/// Make `raw` relative to `root` with `/` separators
pub fn normalize_path(root: &Path, raw: &str) -> String {
    let unified = raw.replace('\\', "/");
    let root = root.to_string_lossy().replace('\\', "/");
    let root = root.trim_end_matches('/');

    let mut relative = if root.is_empty() {
        unified.as_str()
    } else {
        unified
            .strip_prefix(root)
            .and_then(|rest| rest.strip_prefix('/'))
            .unwrap_or(&unified)
    };

    while let Some(rest) = relative.strip_prefix("./") {
        relative = rest;
    }
    relative.to_string()
}

#[derive(Debug, Deserialize)]
struct Position {
    line: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Location {
    start: Position,
}

/// One file of `coverage-final.json`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailEntry {
    #[serde(default)]
    statement_map: BTreeMap<String, Location>,
    s: BTreeMap<String, u64>,
    f: BTreeMap<String, u64>,
    b: BTreeMap<String, Vec<u64>>,
    #[serde(default)]
    l: Option<BTreeMap<String, u64>>,
}

impl DetailEntry {
    fn metrics(&self) -> CoverageMetrics {
        CoverageMetrics {
            statements: hit_counter(self.s.values().copied()),
            functions: hit_counter(self.f.values().copied()),
            branches: hit_counter(self.b.values().flatten().copied()),
            lines: self.line_counter(),
        }
    }

    fn line_counter(&self) -> Counter {
        if let Some(ref lines) = self.l {
            return hit_counter(lines.values().copied());
        }

        // Line hits are the best hit count of any statement starting on that line
        let mut lines: BTreeMap<u64, u64> = BTreeMap::new();
        for (id, hits) in &self.s {
            let Some(line) = self.statement_map.get(id).and_then(|loc| loc.start.line) else {
                continue;
            };
            let best = lines.entry(line).or_insert(0);
            *best = (*best).max(*hits);
        }
        hit_counter(lines.into_values())
    }
}

/// One file of `coverage-summary.json`
#[derive(Debug, Deserialize)]
struct SummaryEntry {
    statements: Counter,
    branches: Counter,
    functions: Counter,
    lines: Counter,
}

impl SummaryEntry {
    fn metrics(&self) -> CoverageMetrics {
        CoverageMetrics {
            statements: self.statements,
            branches: self.branches,
            functions: self.functions,
            lines: self.lines,
        }
    }
}

fn hit_counter(hits: impl Iterator<Item = u64>) -> Counter {
    let mut counter = Counter::default();
    for count in hits {
        counter.total += 1;
        if count > 0 {
            counter.covered += 1;
        }
    }
    counter
}

fn parse_coverage_json(root: &Path, content: &str) -> std::result::Result<CoverageMap, String> {
    let value: Value = serde_json::from_str(content).map_err(|e| e.to_string())?;
    let Value::Object(entries) = value else {
        return Err("expected an object mapping file paths to coverage".to_string());
    };

    let mut files = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        let metrics = if entry.get("s").is_some() {
            serde_json::from_value::<DetailEntry>(entry)
                .map_err(|e| format!("invalid coverage for {}: {}", key, e))?
                .metrics()
        } else if entry.get("lines").is_some() {
            // Summary files carry a synthetic whole-project entry
            if key == "total" {
                continue;
            }
            serde_json::from_value::<SummaryEntry>(entry)
                .map_err(|e| format!("invalid coverage summary for {}: {}", key, e))?
                .metrics()
        } else {
            return Err(format!(
                "entry {} has neither statement hits (`s`) nor a `lines` summary",
                key
            ));
        };

        files.push(FileCoverage::new(normalize_path(root, &key), metrics));
    }

    Ok(CoverageMap::from_files(files))
}
