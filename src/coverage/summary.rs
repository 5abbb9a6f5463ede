//! Folder aggregation

use std::collections::BTreeMap;

use super::{CoverageMap, CoverageMetrics, Metric};

/// Key of the whole-repository folder
pub const ROOT_FOLDER: &str = "*";

/// Coverage summed over every file under a folder
#[derive(Debug, Clone, PartialEq)]
pub struct FolderSummary {
    /// Folder path without trailing slash, or `*` for the repository root
    pub path: String,
    pub metrics: CoverageMetrics,
    /// Number of files under this folder, at any depth
    pub files: usize,
}

impl FolderSummary {
    fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            metrics: CoverageMetrics::default(),
            files: 0,
        }
    }

    /// 0 for the root, 1 for top-level folders, and so on
    pub fn depth(&self) -> usize {
        folder_depth(&self.path)
    }

    pub fn percent(&self, metric: Metric) -> f64 {
        self.metrics.percent(metric)
    }
}

pub(crate) fn folder_depth(path: &str) -> usize {
    if path == ROOT_FOLDER {
        0
    } else {
        path.split('/').count()
    }
}

/// Folders containing `file_path`, outermost first, excluding the root
pub fn parent_folders(file_path: &str) -> Vec<String> {
    let segments: Vec<&str> = file_path.split('/').filter(|s| !s.is_empty()).collect();
    let mut folders = Vec::new();
    for depth in 1..segments.len() {
        folders.push(segments[..depth].join("/"));
    }
    folders
}

/// A coverage map plus its folder aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct CoverageSnapshot {
    files: CoverageMap,
    root: FolderSummary,
    folders: BTreeMap<String, FolderSummary>,
}

impl CoverageSnapshot {
    pub fn from_map(files: CoverageMap) -> Self {
        let mut root = FolderSummary::new(ROOT_FOLDER);
        let mut folders: BTreeMap<String, FolderSummary> = BTreeMap::new();

        for file in files.iter() {
            root.metrics += file.metrics;
            root.files += 1;

            for folder in parent_folders(&file.path) {
                let summary = folders
                    .entry(folder.clone())
                    .or_insert_with(|| FolderSummary::new(folder));
                summary.metrics += file.metrics;
                summary.files += 1;
            }
        }

        Self {
            files,
            root,
            folders,
        }
    }

    /// The `*` whole-repository summary
    pub fn root(&self) -> &FolderSummary {
        &self.root
    }

    pub fn folder(&self, path: &str) -> Option<&FolderSummary> {
        if path == ROOT_FOLDER {
            Some(&self.root)
        } else {
            self.folders.get(path)
        }
    }

    /// Root first, then every folder in path order
    pub fn folders(&self) -> impl Iterator<Item = &FolderSummary> {
        std::iter::once(&self.root).chain(self.folders.values())
    }

    pub fn files(&self) -> &CoverageMap {
        &self.files
    }
}
