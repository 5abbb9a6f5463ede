//! CircleCI build history

use reqwest::Url;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};

use super::{BuildHistory, PriorBuild};
use crate::ci::CiEnv;
use crate::coverage::{parse_str, CoverageMap};
use crate::error::{ReporterError, Result};

pub const CIRCLECI_API_URL: &str = "https://circleci.com/api/v1.1";

/// Successful builds inspected when looking for prior coverage
const MAX_PRIOR_BUILDS: usize = 5;

#[derive(Debug, Deserialize)]
struct BuildSummary {
    build_num: u64,
}

#[derive(Debug, Deserialize)]
struct Artifact {
    path: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct PullRequest {
    base: PullRequestBase,
}

#[derive(Debug, Deserialize)]
struct PullRequestBase {
    #[serde(rename = "ref")]
    branch: String,
}

/// Build history backed by the CircleCI v1.1 API
pub struct CircleCiHistory {
    http: reqwest::Client,
    ci: CiEnv,
    api_url: String,
}

impl CircleCiHistory {
    pub fn new(http: reqwest::Client, ci: CiEnv) -> Self {
        Self::with_api_url(http, ci, CIRCLECI_API_URL)
    }

    pub fn with_api_url(http: reqwest::Client, ci: CiEnv, api_url: &str) -> Self {
        Self {
            http,
            ci,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    /// `<api>/project/github/<owner>/<repo>/<segments...>`
    fn project_url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| ReporterError::HistoryLookup(format!("invalid CircleCI API URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ReporterError::HistoryLookup("CircleCI API URL cannot be a base".into()))?
            .extend(["project", "github", self.ci.owner.as_str(), self.ci.repo.as_str()])
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let text = self.get_text(url).await?;
        serde_json::from_str(&text)
            .map_err(|e| ReporterError::HistoryLookup(format!("unexpected CircleCI response: {}", e)))
    }

    async fn get_text(&self, url: Url) -> Result<String> {
        let mut request = self
            .http
            .get(url.clone())
            .header("Accept", "application/json")
            .header("User-Agent", "coverage-reporter");
        if let Some(ref token) = self.ci.circle_token {
            request = request.header("Circle-Token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReporterError::HistoryLookup(format!("GET {}: {}", url.path(), e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReporterError::HistoryLookup(format!(
                "GET {} failed: {} - {}",
                url.path(),
                status,
                body
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ReporterError::HistoryLookup(format!("failed to read response: {}", e)))
    }

    async fn recent_builds(&self, branch: &str) -> Result<Vec<BuildSummary>> {
        let mut url = self.project_url(&["tree", branch])?;
        url.query_pairs_mut()
            .append_pair("limit", "30")
            .append_pair("filter", "successful");
        self.get_json(url).await
    }

    async fn coverage_artifact(&self, build: u64, coverage_filename: &str) -> Result<Option<Artifact>> {
        let build_segment = build.to_string();
        let url = self.project_url(&[build_segment.as_str(), "artifacts"])?;
        let artifacts: Vec<Artifact> = self.get_json(url).await?;
        Ok(find_coverage_artifact(artifacts, coverage_filename))
    }

    /// Coverage of one build, `None` when it stored no coverage artifact
    async fn build_coverage(
        &self,
        build: u64,
        coverage_filename: &str,
        root: &Path,
    ) -> Result<Option<CoverageMap>> {
        let Some(artifact) = self.coverage_artifact(build, coverage_filename).await? else {
            return Ok(None);
        };

        let url = Url::parse(&artifact.url).map_err(|e| {
            ReporterError::HistoryLookup(format!("invalid artifact URL {}: {}", artifact.url, e))
        })?;
        let content = self.get_text(url).await?;
        let coverage = parse_str(root, &content)
            .map_err(|e| ReporterError::HistoryLookup(format!("prior coverage unusable: {}", e)))?;
        Ok(Some(coverage))
    }
}

/// Builds to inspect for prior coverage, newest first, excluding the current one
fn candidate_builds(builds: &[BuildSummary], current: Option<u64>) -> Vec<u64> {
    let mut numbers: Vec<u64> = builds
        .iter()
        .map(|b| b.build_num)
        .filter(|n| Some(*n) != current)
        .collect();
    numbers.sort_unstable_by(|a, b| b.cmp(a));
    numbers.dedup();
    numbers.truncate(MAX_PRIOR_BUILDS);
    numbers
}

/// Artifact stored at `coverage_filename`, matched on whole trailing path segments
fn find_coverage_artifact(artifacts: Vec<Artifact>, coverage_filename: &str) -> Option<Artifact> {
    let wanted = coverage_filename.trim_start_matches("./").trim_start_matches('/');
    let nested = format!("/{}", wanted);
    artifacts
        .into_iter()
        .find(|a| a.path == wanted || a.path.ends_with(&nested))
}

impl BuildHistory for CircleCiHistory {
    fn name(&self) -> &str {
        "CircleCI"
    }

    async fn base_branch(&self, default_branch: &str) -> Result<String> {
        let Some(number) = self.ci.pull_request else {
            return Ok(default_branch.to_string());
        };

        let url = format!(
            "{}/repos/{}/pulls/{}",
            self.ci.github_api_url.trim_end_matches('/'),
            self.ci.repository(),
            number
        );
        let mut request = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", "coverage-reporter");
        if let Some(ref token) = self.ci.github_token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .map_err(|e| ReporterError::HistoryLookup(format!("failed to fetch PR #{}: {}", number, e)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReporterError::HistoryLookup(format!(
                "GitHub PR #{} lookup failed: {} - {}",
                number, status, body
            )));
        }

        let pr: PullRequest = response
            .json()
            .await
            .map_err(|e| ReporterError::HistoryLookup(format!("unexpected PR response: {}", e)))?;
        debug!(pr = number, branch = %pr.base.branch, "Resolved base branch");
        Ok(pr.base.branch)
    }

    async fn prior_build(
        &self,
        branch: &str,
        coverage_filename: &str,
        root: &Path,
    ) -> Result<PriorBuild> {
        let current: Option<u64> = self.ci.build_num.parse().ok();
        let builds = self.recent_builds(branch).await?;

        for build in candidate_builds(&builds, current) {
            match self.build_coverage(build, coverage_filename, root).await {
                Ok(Some(coverage)) => {
                    debug!(build, files = coverage.len(), "Loaded prior coverage");
                    return Ok(PriorBuild {
                        build: Some(build),
                        coverage: Some(coverage),
                    });
                }
                Ok(None) => debug!(build, "Build has no coverage artifact"),
                Err(e) => warn!(build, error = %e, "Skipping build without usable coverage"),
            }
        }

        Ok(PriorBuild::default())
    }

    fn artifact_url(&self, relative_path: &str) -> String {
        format!(
            "{}/{}",
            self.ci.artifact_base_url,
            relative_path.trim_start_matches('/')
        )
    }

    fn build_url(&self, build: u64) -> String {
        self.ci.build_url_for(build)
    }
}
