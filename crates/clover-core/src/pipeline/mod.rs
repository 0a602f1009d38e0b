//! Dataset curation pipeline stages.
//!
//! - **validate**: pre-decode checks (exists, non-empty, readable)
//! - **decode**: load images into 8-bit working buffers
//! - **classify**: quality metrics and accept/reject verdicts
//! - **transform**: short-side rescaling and photobooth tiling
//! - **processor**: runs one file through every stage
//! - **discovery**: find subdirectories and files to process
//! - **layout**: mirrored output and suspect directories
//! - **batch**: bounded parallel orchestration over a source root

pub mod batch;
pub mod classify;
pub mod decode;
pub mod discovery;
pub mod layout;
pub mod processor;
pub mod transform;
pub mod validate;

// Re-exports for convenient access
pub use batch::{BatchOrchestrator, BatchOutcome, BatchPlan, BatchProgress, CancelFlag, ProcessFile};
pub use classify::{compute_metrics, Classification, ImageClassifier};
pub use decode::{DecodedImage, ImageDecoder};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use layout::{dataset_root, DirectoryLayout, OutputDirs};
pub use processor::ImageProcessor;
pub use transform::{rescale, tile, Tiles};
pub use validate::Validator;
