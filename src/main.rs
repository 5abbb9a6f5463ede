use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;

use coverage_reporter::ci::CiEnv;
use coverage_reporter::config::{FileConfig, Overrides, Settings};
use coverage_reporter::coverage::Metric;
use coverage_reporter::history::CircleCiHistory;
use coverage_reporter::notifications::{ConsolePublisher, GitHubClient};
use coverage_reporter::{logging, reporter, Outcome, ReporterError};

/// Exit status when coverage misses a configured threshold
const EXIT_THRESHOLD_FAILED: i32 = 1;

#[derive(Parser)]
#[command(name = "coverage-reporter")]
#[command(about = "Report Istanbul coverage changes on GitHub pull requests")]
#[command(version)]
struct Cli {
    /// Relative path to the Istanbul coverage JSON [default: coverage/coverage-final.json]
    #[arg(short = 'j', long)]
    coverage_json: Option<String>,

    /// Relative path to the coverage HTML root, used for artifact links [default: coverage/lcov-report]
    #[arg(short = 'H', long)]
    coverage_html: Option<String>,

    /// Base branch to compare against when not building a PR [default: master]
    #[arg(short, long)]
    branch: Option<String>,

    /// Collapse the changed-file table in the comment; `=false` overrides the config file
    #[arg(
        short,
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    collapse_changes: Option<bool>,

    /// Fail the status unless coverage is above this percent
    #[arg(long)]
    minimum_coverage: Option<f64>,

    /// Fail the status unless coverage changed by more than this (may be negative)
    #[arg(long, allow_hyphen_values = true)]
    minimum_change: Option<f64>,

    /// Coverage counter used for percentages [default: lines]
    #[arg(long)]
    metric: Option<Metric>,

    /// Hide file changes smaller than this many percent points
    #[arg(long)]
    min_file_change: Option<f64>,

    /// Post a commit status even without thresholds; `=false` overrides the config file
    #[arg(
        long,
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    status: Option<bool>,

    /// Do not post the pull request comment
    #[arg(long)]
    no_comment: bool,

    /// Context name of the commit status
    #[arg(long)]
    status_context: Option<String>,

    /// Repository root (default: current directory)
    #[arg(long)]
    root: Option<PathBuf>,

    /// Path to config file (default: coverage-reporter.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the comment and status instead of posting them
    #[arg(long)]
    dry_run: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            coverage_json: self.coverage_json.clone(),
            coverage_html: self.coverage_html.clone(),
            branch: self.branch.clone(),
            collapse_changes: self.collapse_changes,
            metric: self.metric,
            min_file_change: self.min_file_change,
            minimum_coverage: self.minimum_coverage,
            minimum_change: self.minimum_change,
            status: self.status,
            comment: self.no_comment.then_some(false),
            status_context: self.status_context.clone(),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            let code = e
                .downcast_ref::<ReporterError>()
                .map(|e| e.exit_code())
                .unwrap_or(1);
            std::process::exit(code);
        }
    }
}

#[tokio::main]
async fn run(cli: Cli) -> Result<i32> {
    let root = match cli.root {
        Some(ref root) => std::fs::canonicalize(root)
            .with_context(|| format!("Could not find repository root: {}", root.display()))?,
        None => std::env::current_dir().context("Could not determine working directory")?,
    };

    let file = FileConfig::discover(cli.config.as_deref(), &root)?;
    let settings = Settings::resolve(&root, file, cli.overrides())?;
    let ci = CiEnv::from_env()?;

    // One HTTP client for the whole run
    let http = reqwest::Client::new();
    let history = CircleCiHistory::new(http.clone(), ci.clone());
    let build = ci.build_ref();

    let outcome = if cli.dry_run {
        reporter::run(&settings, &history, &ConsolePublisher, &build).await?
    } else {
        let github = GitHubClient::new(http, &ci)?;
        reporter::run(&settings, &history, &github, &build).await?
    };

    print_outcome(&outcome);

    if outcome.report.verdict.passed() {
        Ok(0)
    } else {
        Ok(EXIT_THRESHOLD_FAILED)
    }
}

fn print_outcome(outcome: &Outcome) {
    if let Some(ref url) = outcome.comment_url {
        println!("{} {}", "Posted to".cyan(), url.green());
    }
    match outcome.report.prior_build {
        Some(ref prior) => println!(
            "  Compared to build {} of {}",
            prior.number,
            outcome.report.branch.cyan()
        ),
        None => println!(
            "  {}",
            format!("No prior coverage found on {}", outcome.report.branch).dimmed()
        ),
    }
    outcome.report.verdict.print_summary();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_flags_accept_explicit_values() {
        let cli = Cli::try_parse_from(["coverage-reporter"]).unwrap();
        assert_eq!(cli.overrides().collapse_changes, None);
        assert_eq!(cli.overrides().status, None);

        let cli = Cli::try_parse_from(["coverage-reporter", "-c", "--status"]).unwrap();
        assert_eq!(cli.overrides().collapse_changes, Some(true));
        assert_eq!(cli.overrides().status, Some(true));

        let cli = Cli::try_parse_from([
            "coverage-reporter",
            "--collapse-changes=false",
            "--status=false",
            "--minimum-change",
            "-1.5",
        ])
        .unwrap();
        assert_eq!(cli.overrides().collapse_changes, Some(false));
        assert_eq!(cli.overrides().status, Some(false));
        assert_eq!(cli.overrides().minimum_change, Some(-1.5));
    }

    #[test]
    fn test_flag_disables_config_file_setting() {
        let file: FileConfig =
            toml::from_str("[report]\ncollapse_changes = true\n\n[status]\nenabled = true\n").unwrap();
        let cli = Cli::try_parse_from([
            "coverage-reporter",
            "--collapse-changes=false",
            "--status=false",
        ])
        .unwrap();

        let settings = Settings::resolve("/repo", file, cli.overrides()).unwrap();
        assert!(!settings.collapse_changes);
        assert!(!settings.status);
    }
}
