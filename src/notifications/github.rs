//! GitHub comments and status checks

use serde_json::json;
use tracing::{debug, info};

use super::{CommentResult, Publisher, StatusRequest};
use crate::ci::CiEnv;
use crate::error::{ReporterError, Result};

/// Where a comment ends up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentTarget {
    PullRequest(u64),
    Commit(String),
}

/// GitHub REST client scoped to one repository and commit.
///
/// Built once per run and shared by reference.
pub struct GitHubClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
    /// `owner/repo`
    repository: String,
    sha: String,
    target: CommentTarget,
}

impl GitHubClient {
    /// Create a client for the repository and commit of the current build
    pub fn new(http: reqwest::Client, ci: &CiEnv) -> Result<Self> {
        let token = ci.github_token.clone().ok_or_else(|| {
            ReporterError::Config("GitHub token not found. Set GH_AUTH_TOKEN or GITHUB_TOKEN".into())
        })?;

        let target = match ci.pull_request {
            Some(number) => CommentTarget::PullRequest(number),
            None => CommentTarget::Commit(ci.sha.clone()),
        };

        Ok(Self {
            http,
            token,
            api_url: ci.github_api_url.trim_end_matches('/').to_string(),
            repository: ci.repository(),
            sha: ci.sha.clone(),
            target,
        })
    }

    fn comment_url(&self) -> String {
        match self.target {
            CommentTarget::PullRequest(number) => format!(
                "{}/repos/{}/issues/{}/comments",
                self.api_url, self.repository, number
            ),
            CommentTarget::Commit(ref sha) => format!(
                "{}/repos/{}/commits/{}/comments",
                self.api_url, self.repository, sha
            ),
        }
    }

    fn status_url(&self) -> String {
        format!(
            "{}/repos/{}/statuses/{}",
            self.api_url, self.repository, self.sha
        )
    }

    async fn post_json(&self, url: &str, payload: &serde_json::Value) -> Result<serde_json::Value> {
        let response = self
            .http
            .post(url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("User-Agent", "coverage-reporter")
            .header("Accept", "application/vnd.github.v3+json")
            .json(payload)
            .send()
            .await
            .map_err(|e| ReporterError::Publish(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ReporterError::Publish(format!(
                "GitHub API error {}: {}",
                status, text
            )));
        }

        if text.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| ReporterError::Publish(format!("unexpected GitHub response: {}", e)))
    }
}

impl Publisher for GitHubClient {
    async fn comment(&self, body: &str) -> Result<CommentResult> {
        let url = self.comment_url();
        debug!(url = %url, "Posting coverage comment");
        let raw = self.post_json(&url, &json!({ "body": body })).await?;
        let result = CommentResult::from_json(raw);
        info!(url = result.html_url.as_deref().unwrap_or(""), "Posted coverage comment");
        Ok(result)
    }

    async fn post_status(&self, status: &StatusRequest) -> Result<()> {
        let url = self.status_url();
        let payload = serde_json::to_value(status)
            .map_err(|e| ReporterError::Publish(format!("invalid status payload: {}", e)))?;
        self.post_json(&url, &payload).await?;
        info!(state = status.state.as_str(), sha = %self.sha, "Posted coverage status");
        Ok(())
    }
}
