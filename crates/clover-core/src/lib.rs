//! Clover Core - lunar image dataset curation.
//!
//! Takes a tree of raw orbital images, rejects corrupt, distorted and
//! statistically suspect ones, and turns the rest into fixed-size square tiles
//! ready for training, with a per-output report of what happened.
//!
//! # Architecture
//!
//! ```text
//! Image → Validate → Decode → Classify → Rescale → Tile → Classify tile → JPEG
//!                                  ↘ rejected originals → suspect/
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use clover_core::{CancelFlag, Clover, Config};
//!
//! #[tokio::main]
//! async fn main() -> clover_core::Result<()> {
//!     let clover = Clover::new(Config::load()?);
//!     let outcome = clover
//!         .run("/data/edr/12".as_ref(), "/out".as_ref(), &CancelFlag::new(), |_| {})
//!         .await?;
//!     println!("Accepted tiles: {}", outcome.stats.accepted);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod math;
pub mod pipeline;
pub mod report;
pub mod types;

pub use config::Config;
pub use error::{CloverError, ConfigError, PipelineError, PipelineResult, Result};
pub use pipeline::{BatchOrchestrator, BatchOutcome, BatchProgress, CancelFlag, ImageProcessor};
pub use report::{report_file_name, write_report_file, ReportFormat, ReportName, ReportWriter};
pub use types::{BatchStats, DatasetReport, QualityMetrics, ResultRecord, Verdict};

use std::path::Path;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Entry point tying a configuration to batch runs.
pub struct Clover {
    config: Config,
}

impl Clover {
    pub fn new(config: Config) -> Self {
        tracing::debug!("Initializing Clover v{}", VERSION);
        Self { config }
    }

    /// Create a new instance with the configuration from the default location.
    pub fn with_defaults() -> Result<Self> {
        Ok(Self::new(Config::load()?))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Orchestrator writing into `output_root`.
    pub fn orchestrator(&self, output_root: &Path) -> BatchOrchestrator {
        BatchOrchestrator::from_config(&self.config, output_root)
    }

    /// Curate every subdirectory of `source_root` into `output_root`.
    pub async fn run<F>(
        &self,
        source_root: &Path,
        output_root: &Path,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> Result<BatchOutcome>
    where
        F: Fn(&BatchProgress<'_>),
    {
        let outcome = self
            .orchestrator(output_root)
            .run(source_root, cancel, on_progress)
            .await?;
        Ok(outcome)
    }
}
