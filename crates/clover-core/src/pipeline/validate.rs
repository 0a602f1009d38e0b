//! Pre-decode checks on the raw input file.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::PipelineError;

/// Validates files before decoding.
///
/// Runs the cheap checks that make decoding pointless, in order; the first
/// failure wins.
#[derive(Debug, Default, Clone, Copy)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Check that a file exists, is non-empty and can be read.
    ///
    /// Returns the file size in bytes on success.
    pub fn validate(&self, path: &Path) -> Result<u64, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read metadata: {}", e),
        })?;

        if metadata.len() == 0 {
            return Err(PipelineError::ZeroByte(path.to_path_buf()));
        }

        let mut file = File::open(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot open file: {}", e),
        })?;
        let mut first = [0u8; 1];
        file.read_exact(&mut first)
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot read file: {}", e),
            })?;

        Ok(metadata.len())
    }
}
