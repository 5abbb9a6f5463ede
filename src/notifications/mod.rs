//! Notifications module
//!
//! Provides:
//! - GitHub pull request / commit comments
//! - GitHub commit statuses
//! - A console publisher for dry runs

mod console;
mod github;

pub use console::*;
pub use github::*;

use futures::future;
use serde::Serialize;
use tracing::error;

use crate::coverage::StatusState;
use crate::error::{ReporterError, Result};

pub const DEFAULT_STATUS_CONTEXT: &str = "ci/circleci: tests/code-coverage";

/// Commit status payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusRequest {
    pub state: StatusState,
    pub target_url: String,
    pub description: String,
    pub context: String,
}

/// Response of a posted comment
#[derive(Debug, Clone, PartialEq)]
pub struct CommentResult {
    pub html_url: Option<String>,
    pub raw: serde_json::Value,
}

impl CommentResult {
    pub fn from_json(raw: serde_json::Value) -> Self {
        let html_url = raw
            .get("html_url")
            .and_then(|v| v.as_str())
            .map(str::to_string);
        Self { html_url, raw }
    }
}

/// Destination for the coverage comment and status
#[allow(async_fn_in_trait)]
pub trait Publisher {
    async fn comment(&self, body: &str) -> Result<CommentResult>;

    async fn post_status(&self, status: &StatusRequest) -> Result<()>;
}

/// What a publish run produced
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Published {
    pub comment: Option<CommentResult>,
    pub status_posted: bool,
}

/// Post the comment and the status concurrently.
///
/// Either may be skipped with `None`. Both are awaited to completion and
/// every failure is reported, so one failing never hides the other.
pub async fn publish<P: Publisher>(
    publisher: &P,
    comment: Option<&str>,
    status: Option<&StatusRequest>,
) -> Result<Published> {
    let comment_fut = async {
        match comment {
            Some(body) => publisher.comment(body).await.map(Some),
            None => Ok(None),
        }
    };
    let status_fut = async {
        match status {
            Some(request) => publisher.post_status(request).await.map(|_| true),
            None => Ok(false),
        }
    };

    let (comment_result, status_result) = future::join(comment_fut, status_fut).await;

    let mut errors = Vec::new();
    let mut published = Published::default();

    match comment_result {
        Ok(result) => published.comment = result,
        Err(e) => {
            error!(error = %e, "Posting coverage comment failed");
            errors.push(format!("comment: {}", e));
        }
    }

    match status_result {
        Ok(posted) => published.status_posted = posted,
        Err(e) => {
            error!(error = %e, "Posting coverage status failed");
            errors.push(format!("status: {}", e));
        }
    }

    if !errors.is_empty() {
        return Err(ReporterError::Publish(errors.join(", ")));
    }

    Ok(published)
}
