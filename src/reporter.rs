//! End-to-end run: parse, compare, render, evaluate, publish

use tracing::info;

use crate::config::Settings;
use crate::coverage::{
    diff, evaluate, format_diff, parse_file, CoverageDiff, CoverageSnapshot, DiffOptions, Verdict,
};
use crate::error::Result;
use crate::history::{lookup_prior_build, resolve_base_branch, BuildHistory};
use crate::notifications::{publish, Publisher, StatusRequest};
use crate::report::{format_comment, BuildRef, CommentContext};

/// Everything computed for one build, before publishing
#[derive(Debug, Clone)]
pub struct Report {
    pub text: String,
    pub diff: CoverageDiff,
    pub verdict: Verdict,
    pub status: StatusRequest,
    pub branch: String,
    pub prior_build: Option<BuildRef>,
}

/// Result of a full run
#[derive(Debug, Clone)]
pub struct Outcome {
    pub report: Report,
    pub comment_url: Option<String>,
    pub status_posted: bool,
}

/// Parse the current coverage, fetch the prior build and render the report.
///
/// A parse failure aborts; a failed history lookup degrades to a report
/// without comparison.
pub async fn prepare<H: BuildHistory>(
    settings: &Settings,
    history: &H,
    build: &BuildRef,
) -> Result<Report> {
    let coverage = parse_file(&settings.root, &settings.coverage_json_path())?;
    let current = CoverageSnapshot::from_map(coverage.exclude(&settings.exclude));
    info!(files = current.files().len(), "Parsed coverage");

    let branch = resolve_base_branch(history, &settings.default_branch).await;
    let prior = lookup_prior_build(history, &branch, &settings.coverage_json, &settings.root).await;

    let prior_build = match (prior.build, prior.coverage.is_some()) {
        (Some(number), true) => Some(BuildRef {
            number: number.to_string(),
            url: history.build_url(number),
        }),
        _ => None,
    };
    let prior_snapshot = prior
        .coverage
        .map(|map| CoverageSnapshot::from_map(map.exclude(&settings.exclude)));

    let options = DiffOptions {
        metric: settings.metric,
        min_file_change: settings.min_file_change,
    };
    let diff = diff(&current, prior_snapshot.as_ref(), &options);

    let artifact_base = history.artifact_url(&settings.coverage_html);
    let formatted = format_diff(&diff, &artifact_base);
    let text = format_comment(
        &formatted,
        &CommentContext {
            artifact_base: &artifact_base,
            ci_name: history.name(),
            build,
            prior_build: prior_build.as_ref(),
            branch: &branch,
            collapse_changes: settings.collapse_changes,
        },
    );

    let current_percent = current.root().percent(settings.metric);
    let prior_percent = prior_snapshot
        .as_ref()
        .map(|p| p.root().percent(settings.metric));
    let verdict = evaluate(current_percent, prior_percent, &settings.thresholds);

    let status = StatusRequest {
        state: verdict.state,
        target_url: format!("{}/index.html", artifact_base.trim_end_matches('/')),
        description: verdict.description.clone(),
        context: settings.status_context.clone(),
    };

    Ok(Report {
        text,
        diff,
        verdict,
        status,
        branch,
        prior_build,
    })
}

/// Prepare the report and publish whatever `settings` enables
pub async fn run<H: BuildHistory, P: Publisher>(
    settings: &Settings,
    history: &H,
    publisher: &P,
    build: &BuildRef,
) -> Result<Outcome> {
    let report = prepare(settings, history, build).await?;

    let comment = settings.comment.then_some(report.text.as_str());
    let status = settings.status.then_some(&report.status);
    let published = publish(publisher, comment, status).await?;

    Ok(Outcome {
        comment_url: published.comment.and_then(|c| c.html_url),
        status_posted: published.status_posted,
        report,
    })
}
