//! Discovery of dataset subdirectories and the files inside them.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Information about a discovered file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    /// Full path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// Lists the two levels the orchestrator walks: subdirectories of a source
/// root, then regular files directly inside each subdirectory.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileDiscovery;

impl FileDiscovery {
    pub fn new() -> Self {
        Self
    }

    /// Immediate subdirectories of `root`, sorted by path.
    ///
    /// Non-directory entries at this level are ignored.
    pub fn subdirectories(&self, root: &Path) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = WalkDir::new(root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_dir())
            .map(|e| e.into_path())
            .collect();

        dirs.sort();
        dirs
    }

    /// Regular files directly inside `dir` (non-recursive), sorted by path.
    pub fn files(&self, dir: &Path) -> Vec<DiscoveredFile> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            match entry.metadata() {
                Ok(meta) => files.push(DiscoveredFile {
                    path: entry.into_path(),
                    size: meta.len(),
                }),
                Err(e) => tracing::warn!("Skipping {:?}: {}", entry.path(), e),
            }
        }

        // Sort by path for deterministic ordering
        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Get total size of all discovered files.
    pub fn total_size(files: &[DiscoveredFile]) -> u64 {
        files.iter().map(|f| f.size).sum()
    }
}
