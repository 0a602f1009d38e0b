//! Error types for the CLOVER dataset pipeline.
//!
//! Errors are organized by stage to provide clear, actionable error messages
//! that include relevant context (file paths, stage names, specific issues).
//! Per-file pipeline errors are folded into report records by the processor;
//! only batch-level failures reach the caller as `Err`.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for CLOVER operations.
#[derive(Error, Debug)]
pub enum CloverError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline processing errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// File does not exist
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File is empty
    #[error("Zero byte size file: {0}")]
    ZeroByte(PathBuf),

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Format could not be detected from content or extension
    #[error("Unsupported format for {path}: {format}")]
    UnsupportedFormat { path: PathBuf, format: String },

    /// Writing an output tile failed
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },

    /// Copying a rejected original into the suspect directory failed
    #[error("Failed to copy {from} to {to}: {message}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        message: String,
    },

    /// A worker job died before returning records
    #[error("Worker panicked while processing {path}: {message}")]
    WorkerPanicked { path: PathBuf, message: String },

    /// The dataset source root is missing or not a directory
    #[error("Source root does not exist or is not a directory: {0}")]
    SourceRootMissing(PathBuf),

    /// The output root (or a mirrored subdirectory) cannot be created
    #[error("Cannot create output directory {path}: {message}")]
    OutputRootUnwritable { path: PathBuf, message: String },
}

/// Convenience type alias for CLOVER results.
pub type Result<T> = std::result::Result<T, CloverError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_byte_message_names_file() {
        let err = PipelineError::ZeroByte(PathBuf::from("/data/a.png"));
        assert_eq!(err.to_string(), "Zero byte size file: /data/a.png");
    }

    #[test]
    fn test_pipeline_error_wraps_into_top_level() {
        let err: CloverError = PipelineError::SourceRootMissing(PathBuf::from("/nope")).into();
        assert!(err.to_string().starts_with("Pipeline error:"));
        assert!(err.to_string().contains("/nope"));
    }
}
