//! Build history module
//!
//! Provides:
//! - The base branch of the current build
//! - The prior build on that branch and its coverage
//! - Artifact URLs of the current build

mod circleci;

pub use circleci::*;

use std::path::Path;
use tracing::{info, warn};

use crate::coverage::CoverageMap;
use crate::error::Result;

/// The build compared against, and its coverage if it was found
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorBuild {
    pub build: Option<u64>,
    pub coverage: Option<CoverageMap>,
}

/// Source of prior builds for the current project
#[allow(async_fn_in_trait)]
pub trait BuildHistory {
    /// Display name of the CI service
    fn name(&self) -> &str;

    /// Branch the current change targets, or `default_branch`
    async fn base_branch(&self, default_branch: &str) -> Result<String>;

    /// Latest earlier build on `branch` that published `coverage_filename`.
    /// Coverage paths are normalized relative to `root`.
    async fn prior_build(
        &self,
        branch: &str,
        coverage_filename: &str,
        root: &Path,
    ) -> Result<PriorBuild>;

    /// Absolute URL of an artifact of the current build
    fn artifact_url(&self, relative_path: &str) -> String;

    /// URL of another build of this project
    fn build_url(&self, build: u64) -> String;
}

/// Base branch, falling back to `default_branch` when the lookup fails
pub async fn resolve_base_branch<H: BuildHistory>(history: &H, default_branch: &str) -> String {
    match history.base_branch(default_branch).await {
        Ok(branch) => branch,
        Err(e) => {
            warn!(error = %e, default_branch, "Could not determine base branch");
            default_branch.to_string()
        }
    }
}

/// Prior build, treating a failed lookup as "no prior coverage"
pub async fn lookup_prior_build<H: BuildHistory>(
    history: &H,
    branch: &str,
    coverage_filename: &str,
    root: &Path,
) -> PriorBuild {
    match history.prior_build(branch, coverage_filename, root).await {
        Ok(prior) => {
            if prior.coverage.is_none() {
                info!(branch, "No prior coverage found");
            }
            prior
        }
        Err(e) => {
            warn!(error = %e, branch, "Prior build lookup failed, continuing without prior coverage");
            PriorBuild::default()
        }
    }
}
