//! Output directory layout.
//!
//! Each source subdirectory is mirrored under the output root, with a suspect
//! folder inside it. Directories are created before any worker writes into
//! them; existing directories are reused.

use std::path::{Path, PathBuf};

use crate::error::PipelineError;

/// Output directories for one source subdirectory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDirs {
    /// Accepted tiles land here
    pub accepted: PathBuf,
    /// Rejected originals and suspect tiles land here
    pub suspect: PathBuf,
}

/// Maps source subdirectories to their mirrored output directories.
#[derive(Debug, Clone)]
pub struct DirectoryLayout {
    output_root: PathBuf,
    suspect_dir_name: String,
}

impl DirectoryLayout {
    pub fn new(output_root: impl Into<PathBuf>, suspect_dir_name: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            suspect_dir_name: suspect_dir_name.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Create the output root itself (idempotent).
    pub fn ensure_root(&self) -> Result<(), PipelineError> {
        create_dir(&self.output_root)
    }

    /// Directories that mirror `subdir` (named by its last component).
    pub fn dirs_for(&self, subdir: &Path) -> OutputDirs {
        let accepted = match subdir.file_name() {
            Some(name) => self.output_root.join(name),
            None => self.output_root.clone(),
        };
        let suspect = accepted.join(&self.suspect_dir_name);
        OutputDirs { accepted, suspect }
    }

    /// Create the mirrored directory and its suspect folder if absent.
    pub fn prepare(&self, subdir: &Path) -> Result<OutputDirs, PipelineError> {
        let dirs = self.dirs_for(subdir);
        create_dir(&dirs.accepted)?;
        create_dir(&dirs.suspect)?;
        Ok(dirs)
    }
}

fn create_dir(path: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(path).map_err(|e| PipelineError::OutputRootUnwritable {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Root of one mission phase in the `dtype/phase-id/subdir/*` mount layout.
///
/// With no phase the data type directory itself is the root; with neither the
/// base is returned unchanged (flat labeled-image directories).
pub fn dataset_root(base: &Path, dtype: Option<&str>, phase: Option<&str>) -> PathBuf {
    let mut root = base.to_path_buf();
    if let Some(dtype) = dtype {
        root.push(dtype);
    }
    if let Some(phase) = phase {
        root.push(phase);
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_mirror_subdirectory_name() {
        let layout = DirectoryLayout::new("/out", "suspect");
        let dirs = layout.dirs_for(Path::new("/data/edr/12/NAC_0001"));
        assert_eq!(dirs.accepted, PathBuf::from("/out/NAC_0001"));
        assert_eq!(dirs.suspect, PathBuf::from("/out/NAC_0001/suspect"));
    }

    #[test]
    fn test_prepare_is_idempotent() {
        let out = tempfile::tempdir().unwrap();
        let layout = DirectoryLayout::new(out.path(), "suspect");
        let first = layout.prepare(Path::new("/src/a")).unwrap();
        std::fs::write(first.suspect.join("keep.txt"), b"x").unwrap();

        let second = layout.prepare(Path::new("/src/a")).unwrap();
        assert_eq!(first, second);
        assert!(second.suspect.join("keep.txt").exists());
    }

    #[test]
    fn test_prepare_fails_under_a_file() {
        let out = tempfile::tempdir().unwrap();
        let blocker = out.path().join("blocker");
        std::fs::write(&blocker, b"x").unwrap();

        let layout = DirectoryLayout::new(&blocker, "suspect");
        let err = layout.prepare(Path::new("/src/a")).unwrap_err();
        assert!(matches!(err, PipelineError::OutputRootUnwritable { .. }));
    }

    #[test]
    fn test_dataset_root() {
        let base = Path::new("/mnt/datasets");
        assert_eq!(
            dataset_root(base, Some("edr"), Some("12")),
            PathBuf::from("/mnt/datasets/edr/12")
        );
        assert_eq!(dataset_root(base, None, None), PathBuf::from("/mnt/datasets"));
    }
}
