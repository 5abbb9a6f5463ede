use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::coverage::{Metric, Thresholds};
use crate::error::{ReporterError, Result};
use crate::notifications::DEFAULT_STATUS_CONTEXT;

pub const CONFIG_FILE: &str = "coverage-reporter.toml";
pub const DEFAULT_COVERAGE_JSON: &str = "coverage/coverage-final.json";
pub const DEFAULT_COVERAGE_HTML: &str = "coverage/lcov-report";
pub const DEFAULT_BRANCH: &str = "master";

/// Contents of `coverage-reporter.toml`
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub status: StatusSection,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportSection {
    pub coverage_json: Option<String>,
    pub coverage_html: Option<String>,
    pub branch: Option<String>,
    pub collapse_changes: Option<bool>,
    pub metric: Option<Metric>,
    /// Smallest file change shown in the changed-file table
    pub min_file_change: Option<f64>,
    /// Glob patterns of files left out of the report
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Post the pull request comment (default: true)
    pub comment: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatusSection {
    pub enabled: Option<bool>,
    pub context: Option<String>,
    pub minimum_coverage: Option<f64>,
    pub minimum_change: Option<f64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ReporterError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config: FileConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load `explicit` if given, otherwise `<root>/coverage-reporter.toml` if it exists
    pub fn discover(explicit: Option<&Path>, root: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = root.join(CONFIG_FILE);
                if default.is_file() {
                    Self::load(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Values given on the command line; `None` defers to the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub coverage_json: Option<String>,
    pub coverage_html: Option<String>,
    pub branch: Option<String>,
    pub collapse_changes: Option<bool>,
    pub metric: Option<Metric>,
    pub min_file_change: Option<f64>,
    pub minimum_coverage: Option<f64>,
    pub minimum_change: Option<f64>,
    pub status: Option<bool>,
    pub comment: Option<bool>,
    pub status_context: Option<String>,
}

/// Fully resolved settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    pub root: PathBuf,
    pub coverage_json: String,
    pub coverage_html: String,
    pub default_branch: String,
    pub collapse_changes: bool,
    pub metric: Metric,
    pub min_file_change: f64,
    pub exclude: Vec<glob::Pattern>,
    pub comment: bool,
    pub status: bool,
    pub status_context: String,
    pub thresholds: Thresholds,
}

impl Settings {
    /// Defaults for `root` with nothing configured
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            coverage_json: DEFAULT_COVERAGE_JSON.to_string(),
            coverage_html: DEFAULT_COVERAGE_HTML.to_string(),
            default_branch: DEFAULT_BRANCH.to_string(),
            collapse_changes: false,
            metric: Metric::default(),
            min_file_change: 0.0,
            exclude: Vec::new(),
            comment: true,
            status: false,
            status_context: DEFAULT_STATUS_CONTEXT.to_string(),
            thresholds: Thresholds::default(),
        }
    }

    /// Merge defaults, config file and command line, then validate
    pub fn resolve(root: impl Into<PathBuf>, file: FileConfig, cli: Overrides) -> Result<Self> {
        let defaults = Self::new(root);
        let FileConfig { report, status } = file;

        let exclude = report
            .exclude
            .iter()
            .map(|p| {
                glob::Pattern::new(p)
                    .map_err(|e| ReporterError::Config(format!("invalid exclude pattern '{}': {}", p, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let thresholds = Thresholds {
            minimum_coverage: cli.minimum_coverage.or(status.minimum_coverage),
            minimum_change: cli.minimum_change.or(status.minimum_change),
        };

        let settings = Self {
            coverage_json: cli
                .coverage_json
                .or(report.coverage_json)
                .unwrap_or(defaults.coverage_json),
            coverage_html: cli
                .coverage_html
                .or(report.coverage_html)
                .unwrap_or(defaults.coverage_html),
            default_branch: cli.branch.or(report.branch).unwrap_or(defaults.default_branch),
            collapse_changes: cli
                .collapse_changes
                .or(report.collapse_changes)
                .unwrap_or(defaults.collapse_changes),
            metric: cli.metric.or(report.metric).unwrap_or(defaults.metric),
            min_file_change: cli
                .min_file_change
                .or(report.min_file_change)
                .unwrap_or(defaults.min_file_change),
            exclude,
            comment: cli.comment.or(report.comment).unwrap_or(defaults.comment),
            status: cli
                .status
                .or(status.enabled)
                .unwrap_or(defaults.status)
                || thresholds.is_configured(),
            status_context: cli
                .status_context
                .or(status.context)
                .unwrap_or(defaults.status_context),
            thresholds,
            root: defaults.root,
        };

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if let Some(minimum) = self.thresholds.minimum_coverage {
            if !minimum.is_finite() || !(0.0..=100.0).contains(&minimum) {
                return Err(ReporterError::Config(format!(
                    "minimum coverage must be between 0 and 100, got {}",
                    minimum
                )));
            }
        }

        if let Some(minimum) = self.thresholds.minimum_change {
            if !minimum.is_finite() || !(-100.0..=100.0).contains(&minimum) {
                return Err(ReporterError::Config(format!(
                    "minimum change must be between -100 and 100, got {}",
                    minimum
                )));
            }
        }

        if !self.min_file_change.is_finite() || self.min_file_change < 0.0 {
            return Err(ReporterError::Config(format!(
                "min file change must be a non-negative number, got {}",
                self.min_file_change
            )));
        }

        if !self.comment && !self.status {
            return Err(ReporterError::Config(
                "nothing to publish: comment is disabled and no status is configured".into(),
            ));
        }

        if self.coverage_json.trim().is_empty() {
            return Err(ReporterError::Config("coverage JSON path is empty".into()));
        }

        Ok(())
    }

    /// Absolute path of the coverage JSON
    pub fn coverage_json_path(&self) -> PathBuf {
        self.root.join(&self.coverage_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[report]
coverage_json = "out/coverage-final.json"
collapse_changes = true
metric = "statements"
exclude = ["**/*.test.js"]

[status]
context = "coverage"
minimum_coverage = 0
minimum_change = -0.5
"#;

        let config: FileConfig = toml::from_str(toml_content).unwrap();
        let settings = Settings::resolve("/repo", config, Overrides::default()).unwrap();

        assert_eq!(settings.coverage_json, "out/coverage-final.json");
        assert_eq!(settings.coverage_html, DEFAULT_COVERAGE_HTML);
        assert!(settings.collapse_changes);
        assert_eq!(settings.metric, Metric::Statements);
        assert_eq!(settings.exclude.len(), 1);
        assert_eq!(settings.thresholds.minimum_coverage, Some(0.0));
        assert_eq!(settings.thresholds.minimum_change, Some(-0.5));
        // thresholds switch the status on
        assert!(settings.status);
        assert_eq!(settings.status_context, "coverage");
        assert_eq!(settings.coverage_json_path(), PathBuf::from("/repo/out/coverage-final.json"));
    }

    #[test]
    fn test_cli_overrides_file() {
        let config: FileConfig = toml::from_str("[report]\nbranch = \"develop\"\n").unwrap();
        let cli = Overrides {
            branch: Some("main".to_string()),
            minimum_coverage: Some(75.0),
            ..Default::default()
        };
        let settings = Settings::resolve("/repo", config, cli).unwrap();
        assert_eq!(settings.default_branch, "main");
        assert_eq!(settings.thresholds.minimum_coverage, Some(75.0));
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve("/repo", FileConfig::default(), Overrides::default()).unwrap();
        assert_eq!(settings.coverage_json, DEFAULT_COVERAGE_JSON);
        assert_eq!(settings.default_branch, DEFAULT_BRANCH);
        assert!(settings.comment);
        assert!(!settings.status);
        assert_eq!(settings.thresholds, Thresholds::default());
    }

    #[test]
    fn test_invalid_thresholds() {
        for cli in [
            Overrides {
                minimum_coverage: Some(120.0),
                ..Default::default()
            },
            Overrides {
                minimum_change: Some(f64::NAN),
                ..Default::default()
            },
            Overrides {
                min_file_change: Some(-1.0),
                ..Default::default()
            },
        ] {
            let err = Settings::resolve("/repo", FileConfig::default(), cli).unwrap_err();
            assert!(matches!(err, ReporterError::Config(_)));
        }
    }

    #[test]
    fn test_nothing_to_publish() {
        let cli = Overrides {
            comment: Some(false),
            ..Default::default()
        };
        let err = Settings::resolve("/repo", FileConfig::default(), cli).unwrap_err();
        assert!(err.to_string().contains("nothing to publish"));
    }

    #[test]
    fn test_discover() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::discover(None, dir.path()).unwrap();
        assert!(config.report.branch.is_none());

        let mut file = fs::File::create(dir.path().join(CONFIG_FILE)).unwrap();
        file.write_all(b"[report]\nbranch = \"trunk\"\n").unwrap();
        let config = FileConfig::discover(None, dir.path()).unwrap();
        assert_eq!(config.report.branch.as_deref(), Some("trunk"));

        let missing = dir.path().join("nope.toml");
        let err = FileConfig::discover(Some(&missing), dir.path()).unwrap_err();
        assert!(matches!(err, ReporterError::Config(_)));

        let bad = dir.path().join("bad.toml");
        fs::write(&bad, "[report\n").unwrap();
        let err = FileConfig::discover(Some(&bad), dir.path()).unwrap_err();
        assert!(matches!(err, ReporterError::Toml(_)));
    }
}
