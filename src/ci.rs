//! CI environment identifiers
//!
//! Everything the reporter needs to know about the running build is read
//! once into [`CiEnv`] and passed down explicitly.

use crate::error::{ReporterError, Result};
use crate::report::BuildRef;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Build and repository identifiers of the current CI job
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CiEnv {
    pub build_num: String,
    pub build_url: String,
    pub sha: String,
    pub owner: String,
    pub repo: String,
    pub pull_request: Option<u64>,
    pub github_token: Option<String>,
    pub circle_token: Option<String>,
    pub github_api_url: String,
    /// URL under which this job's artifacts are served
    pub artifact_base_url: String,
}

impl CiEnv {
    /// Read identifiers from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read identifiers through `lookup`; empty values count as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| ReporterError::Config(format!("{} not set", key)))
        };

        let artifact_base_url = match get("COVERAGE_ARTIFACT_BASE_URL") {
            Some(url) => url,
            None => {
                let job = get("CIRCLE_WORKFLOW_JOB_ID").ok_or_else(|| {
                    ReporterError::Config(
                        "COVERAGE_ARTIFACT_BASE_URL or CIRCLE_WORKFLOW_JOB_ID must be set".into(),
                    )
                })?;
                let node = get("CIRCLE_NODE_INDEX").unwrap_or_else(|| "0".to_string());
                format!(
                    "https://output.circle-artifacts.com/output/job/{}/artifacts/{}",
                    job, node
                )
            }
        };

        Ok(Self {
            build_num: require("CIRCLE_BUILD_NUM")?,
            build_url: require("CIRCLE_BUILD_URL")?,
            sha: require("CIRCLE_SHA1")?,
            owner: require("CIRCLE_PROJECT_USERNAME")?,
            repo: require("CIRCLE_PROJECT_REPONAME")?,
            pull_request: get("CIRCLE_PULL_REQUEST").and_then(|url| pull_request_number(&url)),
            github_token: get("GH_AUTH_TOKEN").or_else(|| get("GITHUB_TOKEN")),
            circle_token: get("CIRCLE_TOKEN"),
            github_api_url: get("GITHUB_API_URL")
                .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
            artifact_base_url: artifact_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// `owner/repo`
    pub fn repository(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    pub fn build_ref(&self) -> BuildRef {
        BuildRef {
            number: self.build_num.clone(),
            url: self.build_url.clone(),
        }
    }

    /// URL of another build of the same project
    pub fn build_url_for(&self, build: u64) -> String {
        replace_build_number(&self.build_url, build)
    }
}

/// Number of a pull request URL such as `https://github.com/o/r/pull/12`
pub fn pull_request_number(url: &str) -> Option<u64> {
    let mut segments = url.trim_end_matches('/').rsplit('/');
    let number = segments.next()?.parse().ok()?;
    match segments.next() {
        Some("pull") | Some("pulls") => Some(number),
        _ => None,
    }
}

/// Swap the trailing build number of a build URL
pub fn replace_build_number(url: &str, build: u64) -> String {
    let trimmed = url.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((prefix, last)) if !last.is_empty() && last.chars().all(|c| c.is_ascii_digit()) => {
            format!("{}/{}", prefix, build)
        }
        _ => format!("{}/{}", trimmed, build),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn circle_env() -> HashMap<&'static str, &'static str> {
        HashMap::from([
            ("CIRCLE_BUILD_NUM", "42"),
            ("CIRCLE_BUILD_URL", "https://circleci.com/gh/acme/web/42"),
            ("CIRCLE_SHA1", "abc123"),
            ("CIRCLE_PROJECT_USERNAME", "acme"),
            ("CIRCLE_PROJECT_REPONAME", "web"),
            ("CIRCLE_PULL_REQUEST", "https://github.com/acme/web/pull/7"),
            ("CIRCLE_WORKFLOW_JOB_ID", "job-uuid"),
            ("GITHUB_TOKEN", "ghp_test"),
        ])
    }

    fn lookup(env: HashMap<&'static str, &'static str>) -> impl Fn(&str) -> Option<String> {
        move |key| env.get(key).map(|v| v.to_string())
    }

    #[test]
    fn test_from_lookup() {
        let ci = CiEnv::from_lookup(lookup(circle_env())).unwrap();
        assert_eq!(ci.repository(), "acme/web");
        assert_eq!(ci.pull_request, Some(7));
        assert_eq!(ci.github_token.as_deref(), Some("ghp_test"));
        assert_eq!(ci.github_api_url, DEFAULT_GITHUB_API_URL);
        assert_eq!(
            ci.artifact_base_url,
            "https://output.circle-artifacts.com/output/job/job-uuid/artifacts/0"
        );
        assert_eq!(ci.build_url_for(40), "https://circleci.com/gh/acme/web/40");
    }

    #[test]
    fn test_explicit_artifact_base_and_token_precedence() {
        let mut env = circle_env();
        env.insert("COVERAGE_ARTIFACT_BASE_URL", "https://files.example.com/42/");
        env.insert("GH_AUTH_TOKEN", "gh_auth");
        let ci = CiEnv::from_lookup(lookup(env)).unwrap();
        assert_eq!(ci.artifact_base_url, "https://files.example.com/42");
        assert_eq!(ci.github_token.as_deref(), Some("gh_auth"));
    }

    #[test]
    fn test_missing_variable_is_config_error() {
        let mut env = circle_env();
        env.insert("CIRCLE_SHA1", "");
        let err = CiEnv::from_lookup(lookup(env)).unwrap_err();
        assert!(matches!(err, ReporterError::Config(_)));
        assert!(err.to_string().contains("CIRCLE_SHA1"));
    }

    #[test]
    fn test_pull_request_number() {
        assert_eq!(pull_request_number("https://github.com/o/r/pull/12"), Some(12));
        assert_eq!(pull_request_number("https://github.com/o/r/pull/12/"), Some(12));
        assert_eq!(pull_request_number("https://github.com/o/r/tree/12"), None);
        assert_eq!(pull_request_number("https://github.com/o/r/pull/abc"), None);
    }

    #[test]
    fn test_replace_build_number() {
        assert_eq!(replace_build_number("https://ci/x/42", 7), "https://ci/x/7");
        assert_eq!(replace_build_number("https://ci/x/", 7), "https://ci/x/7");
    }
}
