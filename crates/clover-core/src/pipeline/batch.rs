//! Batch orchestration over a source root.
//!
//! Subdirectories are visited one at a time, in sorted order. Inside a
//! subdirectory, files are handed to a bounded pool of blocking workers and
//! their records are collected in dispatch order, so the report is
//! deterministic regardless of completion order. A subdirectory is fully
//! drained before the next one starts.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{BatchStats, DatasetReport, ResultRecord};

use super::discovery::{DiscoveredFile, FileDiscovery};
use super::layout::{DirectoryLayout, OutputDirs};
use super::processor::ImageProcessor;

/// Per-file work unit run on a blocking worker.
///
/// Implementations must turn every failure into records; a panic is caught by
/// the orchestrator and recorded as a corrupt input.
pub trait ProcessFile: Send + Sync + 'static {
    fn process(&self, path: &Path, dirs: &OutputDirs) -> Vec<ResultRecord>;
}

impl ProcessFile for ImageProcessor {
    fn process(&self, path: &Path, dirs: &OutputDirs) -> Vec<ResultRecord> {
        ImageProcessor::process(self, path, dirs)
    }
}

/// Shared cancellation signal. Once set, no new files are dispatched;
/// files already running finish and are recorded.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One subdirectory and the files that will be dispatched from it.
#[derive(Debug, Clone)]
pub struct PlannedDir {
    pub dir: PathBuf,
    pub files: Vec<DiscoveredFile>,
}

/// Everything a run will touch, discovered up front.
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub subdirectories: Vec<PlannedDir>,
}

impl BatchPlan {
    pub fn total_files(&self) -> usize {
        self.subdirectories.iter().map(|d| d.files.len()).sum()
    }

    pub fn total_bytes(&self) -> u64 {
        self.subdirectories
            .iter()
            .map(|d| FileDiscovery::total_size(&d.files))
            .sum()
    }
}

/// Progress snapshot passed to the caller after each file completes.
#[derive(Debug, Clone)]
pub struct BatchProgress<'a> {
    pub subdirectory: &'a Path,
    pub completed_files: usize,
    pub total_files: usize,
    pub records: usize,
}

/// Outcome of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    pub report: DatasetReport,
    pub stats: BatchStats,
}

/// Walks a source root and runs every file through a [`ProcessFile`] worker.
pub struct BatchOrchestrator {
    processor: Arc<dyn ProcessFile>,
    layout: DirectoryLayout,
    discovery: FileDiscovery,
    parallel_workers: usize,
    max_images: Option<usize>,
}

impl BatchOrchestrator {
    pub fn new(
        processor: Arc<dyn ProcessFile>,
        layout: DirectoryLayout,
        parallel_workers: usize,
    ) -> Self {
        Self {
            processor,
            layout,
            discovery: FileDiscovery::new(),
            parallel_workers: parallel_workers.max(1),
            max_images: None,
        }
    }

    /// Orchestrator backed by an [`ImageProcessor`] built from `config`.
    pub fn from_config(config: &Config, output_root: impl Into<PathBuf>) -> Self {
        let layout = DirectoryLayout::new(output_root, config.output.suspect_dir_name.clone());
        Self::new(
            Arc::new(ImageProcessor::new(config)),
            layout,
            config.processing.parallel_workers,
        )
        .with_max_images(config.processing.max_images)
    }

    /// Cap the number of files dispatched across the whole run.
    pub fn with_max_images(mut self, max_images: Option<usize>) -> Self {
        self.max_images = max_images;
        self
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    /// Discover subdirectories and files, applying the `max_images` cap in
    /// traversal order. Subdirectories past the cap are still listed so their
    /// output directories get mirrored.
    pub fn plan(&self, source_root: &Path) -> PipelineResult<BatchPlan> {
        if !source_root.is_dir() {
            return Err(PipelineError::SourceRootMissing(source_root.to_path_buf()));
        }

        let mut remaining = self.max_images.unwrap_or(usize::MAX);
        let subdirectories = self
            .discovery
            .subdirectories(source_root)
            .into_iter()
            .map(|dir| {
                let mut files = self.discovery.files(&dir);
                files.truncate(remaining);
                remaining -= files.len();
                PlannedDir { dir, files }
            })
            .collect();

        Ok(BatchPlan { subdirectories })
    }

    /// Process every file under `source_root`.
    ///
    /// Fails only for run-level problems: a missing source root or an output
    /// directory that cannot be created. Per-file failures become records.
    pub async fn run<F>(
        &self,
        source_root: &Path,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> PipelineResult<BatchOutcome>
    where
        F: Fn(&BatchProgress<'_>),
    {
        let plan = self.plan(source_root)?;
        self.run_plan(plan, cancel, on_progress).await
    }

    /// Process a plan produced by [`plan`](Self::plan).
    pub async fn run_plan<F>(
        &self,
        plan: BatchPlan,
        cancel: &CancelFlag,
        on_progress: F,
    ) -> PipelineResult<BatchOutcome>
    where
        F: Fn(&BatchProgress<'_>),
    {
        let start = Instant::now();
        self.layout.ensure_root()?;

        let total_files = plan.total_files();
        let semaphore = Arc::new(Semaphore::new(self.parallel_workers));
        let mut report = DatasetReport::new();
        let mut visited = 0usize;
        let mut dispatched = 0usize;
        let mut completed = 0usize;

        tracing::info!(
            "Processing {} files in {} subdirectories with {} workers",
            total_files,
            plan.subdirectories.len(),
            self.parallel_workers
        );

        for planned in plan.subdirectories {
            if cancel.is_cancelled() {
                break;
            }
            let dirs = self.layout.prepare(&planned.dir)?;
            visited += 1;
            tracing::debug!("Subdirectory {:?}: {} files", planned.dir, planned.files.len());

            let mut pending: VecDeque<(PathBuf, JoinHandle<Vec<ResultRecord>>)> =
                VecDeque::with_capacity(planned.files.len());

            let mut record = |path: PathBuf,
                              result: Result<Vec<ResultRecord>, tokio::task::JoinError>,
                              report: &mut DatasetReport| {
                report.extend(records_or_panic(path, result));
                completed += 1;
                on_progress(&BatchProgress {
                    subdirectory: &planned.dir,
                    completed_files: completed,
                    total_files,
                    records: report.len(),
                });
            };

            for file in &planned.files {
                let permit = match semaphore.clone().acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        tracing::warn!("Worker semaphore closed unexpectedly, stopping batch");
                        break;
                    }
                };
                if cancel.is_cancelled() {
                    tracing::info!("Cancellation requested, no further files will be dispatched");
                    break;
                }

                let processor = Arc::clone(&self.processor);
                let dirs = dirs.clone();
                let path = file.path.clone();
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    processor.process(&path, &dirs)
                });
                pending.push_back((file.path.clone(), handle));
                dispatched += 1;

                // Collect finished work from the front without breaking order.
                while pending.front().is_some_and(|(_, h)| h.is_finished()) {
                    if let Some((path, handle)) = pending.pop_front() {
                        record(path, handle.await, &mut report);
                    }
                }
            }

            while let Some((path, handle)) = pending.pop_front() {
                record(path, handle.await, &mut report);
            }
        }

        report.cancelled = dispatched < total_files;
        if report.cancelled {
            tracing::warn!(
                "Run cancelled after {} of {} files",
                dispatched,
                total_files
            );
        }

        let stats = BatchStats::from_report(&report, visited, dispatched, start.elapsed());
        tracing::info!(
            "Finished: {} records ({} accepted, {} suspect) in {:.1}s",
            stats.records,
            stats.accepted,
            stats.suspect,
            stats.total_seconds
        );

        Ok(BatchOutcome { report, stats })
    }
}

/// A worker that panicked still yields exactly one record for its input.
fn records_or_panic(
    path: PathBuf,
    result: Result<Vec<ResultRecord>, tokio::task::JoinError>,
) -> Vec<ResultRecord> {
    match result {
        Ok(records) => records,
        Err(e) => {
            let err = PipelineError::WorkerPanicked {
                path: path.clone(),
                message: e.to_string(),
            };
            tracing::error!("{}", err);
            vec![ResultRecord::corrupt(path.clone(), &path, err.to_string())]
        }
    }
}
