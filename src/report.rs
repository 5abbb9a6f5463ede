//! Pull request comment assembly

use crate::coverage::Formatted;

const FOOTER: &str = "🤖 coverage-reporter";

/// A CI build as shown in the comment footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRef {
    pub number: String,
    pub url: String,
}

/// Everything the comment needs besides the coverage fragments
#[derive(Debug, Clone)]
pub struct CommentContext<'a> {
    /// URL of the HTML coverage report root
    pub artifact_base: &'a str,
    /// Name of the CI service, e.g. `CircleCI`
    pub ci_name: &'a str,
    pub build: &'a BuildRef,
    pub prior_build: Option<&'a BuildRef>,
    /// Branch the prior build was taken from
    pub branch: &'a str,
    pub collapse_changes: bool,
}

/// Wrap `content` in a disclosure widget, or nothing when empty
pub fn collapsed(title: &str, content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    format!(
        "<details>\n<summary><strong>{}</strong></summary>\n\n{}\n</details>\n",
        title, content
    )
}

/// Build the markdown comment body
pub fn format_comment(formatted: &Formatted, ctx: &CommentContext<'_>) -> String {
    let base = ctx.artifact_base.trim_end_matches('/');

    let changes = if ctx.collapse_changes {
        collapsed("File Changes", &formatted.changed)
    } else {
        formatted.changed.clone()
    };

    let compared = match ctx.prior_build {
        Some(prior) => format!(
            " compared to [build {}]({}) (from `{}` branch)",
            prior.number, prior.url, ctx.branch
        ),
        None => String::new(),
    };

    format!(
        "**[Code Coverage]({base}/index.html): {status}**\n\
         {changes}\n\
         <details>\n\
         <summary><strong>🗂 Folder Coverage</strong></summary>\n\
         \n\
         {folders}\n\
         </details>\n\
         <p>\n\
         \n\
         From **{ci} [build {number}]({url})**{compared} – {footer}\n",
        base = base,
        status = formatted.status,
        changes = changes,
        folders = formatted.folders,
        ci = ctx.ci_name,
        number = ctx.build.number,
        url = ctx.build.url,
        compared = compared,
        footer = FOOTER,
    )
}
