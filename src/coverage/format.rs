//! Markdown rendering of a coverage diff

use reqwest::Url;

use super::{round_percent, CoverageDiff, Delta, Direction, FileChange, FolderChange};

/// Markdown fragments assembled into the final comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    /// Whole-repository percent and change, e.g. `85.00% (↑ +1.00%)`
    pub status: String,
    /// Table of changed files, empty when nothing changed
    pub changed: String,
    /// Table of every folder
    pub folders: String,
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", round_percent(value))
}

/// Signed change with a direction glyph
pub fn format_delta(delta: f64) -> String {
    let rounded = round_percent(delta);
    match Direction::of(delta) {
        Direction::Up => format!("{} +{:.2}%", Direction::Up.glyph(), rounded),
        Direction::Down => format!("{} {:.2}%", Direction::Down.glyph(), rounded),
        Direction::Flat => format!("{} {:.2}%", Direction::Flat.glyph(), 0.0),
    }
}

fn format_change(delta: &Delta) -> String {
    match delta {
        Delta::Unavailable => String::new(),
        Delta::New => "new".to_string(),
        Delta::Changed(value) => format_delta(*value),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}

/// URL of a page under the HTML report, each path segment percent-encoded
fn report_link<'a>(base: &str, segments: impl IntoIterator<Item = &'a str>) -> String {
    let segments: Vec<&str> = segments.into_iter().filter(|s| !s.is_empty()).collect();
    let mut url = match Url::parse(base) {
        Ok(url) if !url.cannot_be_a_base() => url,
        _ => return format!("{}/{}", base, segments.join("/")),
    };
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    // Parentheses are legal in a URL path but end a markdown link
    url.as_str().replace('(', "%28").replace(')', "%29")
}

fn file_link(base: &str, path: &str) -> String {
    let page = format!("{}.html", path);
    report_link(base, page.split('/'))
}

fn folder_link(base: &str, path: &str) -> String {
    report_link(base, path.split('/').chain(["index.html"]))
}

/// Render every fragment of the report.
///
/// `artifact_base` is the URL of the HTML coverage report root.
pub fn format_diff(diff: &CoverageDiff, artifact_base: &str) -> Formatted {
    let base = artifact_base.trim_end_matches('/');
    Formatted {
        status: format_status(&diff.overall),
        changed: format_changed(&diff.changed, base),
        folders: format_folders(diff, base),
    }
}

fn format_status(overall: &FolderChange) -> String {
    let percent = format_percent(overall.percent);
    match overall.delta {
        Delta::Changed(delta) => format!("{} ({})", percent, format_delta(delta)),
        _ => percent,
    }
}

fn format_changed(changed: &[FileChange], base: &str) -> String {
    if changed.is_empty() {
        return String::new();
    }

    let mut out = String::from("| File | Before | After | Change |\n|:-----|-------:|------:|-------:|\n");
    for file in changed {
        let before = file
            .before
            .map(format_percent)
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "| [{}]({}) | {} | {} | {} |\n",
            escape_cell(&file.path),
            file_link(base, &file.path),
            before,
            format_percent(file.after),
            format_change(&file.delta),
        ));
    }
    out
}

fn format_folders(diff: &CoverageDiff, base: &str) -> String {
    let mut out = if diff.has_prior {
        String::from("| Folder | Coverage | Change | Files |\n|:-------|---------:|-------:|------:|\n")
    } else {
        String::from("| Folder | Coverage | Files |\n|:-------|---------:|------:|\n")
    };

    for folder in &diff.folders {
        let link = if folder.depth == 0 {
            format!("[All files]({})", report_link(base, ["index.html"]))
        } else {
            format!(
                "{}[{}/]({})",
                "&nbsp;&nbsp;".repeat(folder.depth),
                escape_cell(&folder.path),
                folder_link(base, &folder.path)
            )
        };

        if diff.has_prior {
            out.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                link,
                format_percent(folder.percent),
                format_change(&folder.delta),
                folder.files
            ));
        } else {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                link,
                format_percent(folder.percent),
                folder.files
            ));
        }
    }
    out
}
