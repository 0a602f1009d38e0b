//! Core data types for the CLOVER pipeline.
//!
//! These types carry the per-image classification outcome and the aggregated
//! report of a batch run.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};

/// Classification outcome for one image or one tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Passed every check; written to the accepted output directory
    Accepted,
    /// Unreadable, zero-byte, or undecodable
    RejectedCorrupt,
    /// Failed the statistical thresholds
    RejectedQuality,
    /// Extreme aspect ratio
    RejectedDistorted,
}

impl Verdict {
    /// Whether this verdict routes the output to the suspect directory.
    pub fn is_suspect(self) -> bool {
        !matches!(self, Verdict::Accepted)
    }

    /// Stable snake_case label, matching the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accepted => "accepted",
            Verdict::RejectedCorrupt => "rejected_corrupt",
            Verdict::RejectedQuality => "rejected_quality",
            Verdict::RejectedDistorted => "rejected_distorted",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics computed over a decoded pixel grid.
///
/// Recomputed independently for the whole image and for each tile, since
/// cropping changes local statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Population standard deviation of all channel intensities, rounded to 5 places
    pub stddev: f64,

    /// Fraction of channel intensities below the low-intensity threshold
    pub low_freq_prop: f64,

    /// Variance of the discrete Laplacian over all channels
    pub lap_var: f64,

    /// Longer side divided by shorter side (unrounded)
    pub aspect_ratio: f64,
}

/// One row of the dataset report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Where the output landed: accepted tile, suspect tile, or suspect copy.
    /// Falls back to the source path when nothing could be written.
    #[serde(serialize_with = "serialize_path_lossy")]
    pub path: PathBuf,

    /// Metrics for the image or tile; `None` when the input was corrupt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<QualityMetrics>,

    pub verdict: Verdict,

    /// Human-readable rejection reason; `None` for accepted outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// True when the output was routed to the suspect directory
    pub suspect: bool,

    /// The input file this record was derived from
    #[serde(serialize_with = "serialize_path_lossy")]
    pub source: PathBuf,
}

/// Paths that are not valid UTF-8 serialize with replacement characters
/// instead of failing the whole report.
fn serialize_path_lossy<P, S>(path: &P, serializer: S) -> Result<S::Ok, S::Error>
where
    P: AsRef<Path>,
    S: Serializer,
{
    let path = path.as_ref();
    match path.to_str() {
        Some(s) => serializer.serialize_str(s),
        None => {
            tracing::warn!("Path {:?} is not valid UTF-8, writing it lossily", path);
            serializer.serialize_str(&path.to_string_lossy())
        }
    }
}

impl ResultRecord {
    /// Record for an output written into the accepted directory.
    pub fn accepted(path: PathBuf, source: &Path, metrics: QualityMetrics) -> Self {
        Self {
            path,
            metrics: Some(metrics),
            verdict: Verdict::Accepted,
            reason: None,
            suspect: false,
            source: source.to_path_buf(),
        }
    }

    /// Record for an output routed to the suspect directory.
    pub fn rejected(
        path: PathBuf,
        source: &Path,
        verdict: Verdict,
        metrics: Option<QualityMetrics>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            path,
            metrics,
            verdict,
            reason: Some(reason.into()),
            suspect: true,
            source: source.to_path_buf(),
        }
    }

    /// Record for a file whose processing failed outright.
    pub fn corrupt(path: PathBuf, source: &Path, reason: impl Into<String>) -> Self {
        Self::rejected(path, source, Verdict::RejectedCorrupt, None, reason)
    }
}

/// Ordered, append-only collection of result records for one batch run.
///
/// Only the orchestrator appends; workers hand back owned record lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetReport {
    records: Vec<ResultRecord>,

    /// Set when the run was cancelled before every file was dispatched
    pub cancelled: bool,
}

impl DatasetReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append all records produced for one input file, keeping them contiguous.
    pub fn extend(&mut self, records: Vec<ResultRecord>) {
        self.records.extend(records);
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of tiles written to accepted output directories.
    pub fn accepted_count(&self) -> usize {
        self.count(Verdict::Accepted)
    }

    /// Number of records routed to suspect directories.
    pub fn suspect_count(&self) -> usize {
        self.records.iter().filter(|r| r.suspect).count()
    }

    /// Number of records carrying the given verdict.
    pub fn count(&self, verdict: Verdict) -> usize {
        self.records.iter().filter(|r| r.verdict == verdict).count()
    }

    pub fn into_records(self) -> Vec<ResultRecord> {
        self.records
    }
}

/// Processing statistics for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BatchStats {
    /// Subdirectories visited
    pub subdirectories: usize,

    /// Input files dispatched to workers
    pub files: usize,

    /// Total records in the report
    pub records: usize,

    /// Tiles written to accepted directories
    pub accepted: usize,

    /// Records routed to suspect directories
    pub suspect: usize,

    /// Records for corrupt or failed inputs
    pub corrupt: usize,

    /// Processing rate in input files per second
    pub files_per_second: f64,

    /// Total processing time in seconds
    pub total_seconds: f64,
}

impl BatchStats {
    /// Derive record counts from a finished report.
    pub fn from_report(
        report: &DatasetReport,
        subdirectories: usize,
        files: usize,
        elapsed: std::time::Duration,
    ) -> Self {
        let total_seconds = elapsed.as_secs_f64();
        let files_per_second = if total_seconds > 0.0 {
            files as f64 / total_seconds
        } else {
            0.0
        };
        Self {
            subdirectories,
            files,
            records: report.len(),
            accepted: report.accepted_count(),
            suspect: report.suspect_count(),
            corrupt: report.count(Verdict::RejectedCorrupt),
            files_per_second,
            total_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics() -> QualityMetrics {
        QualityMetrics {
            stddev: 42.5,
            low_freq_prop: 0.1,
            lap_var: 120.0,
            aspect_ratio: 2.0,
        }
    }

    #[test]
    fn test_verdict_serializes_snake_case() {
        let json = serde_json::to_string(&Verdict::RejectedDistorted).unwrap();
        assert_eq!(json, "\"rejected_distorted\"");
        assert_eq!(Verdict::RejectedDistorted.to_string(), "rejected_distorted");
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_path_serializes_lossily() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let path = PathBuf::from(OsStr::from_bytes(b"/out/A/suspect/bad\xffname.png"));
        let record = ResultRecord::corrupt(path.clone(), &path, "Zero byte size file.");
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("bad\u{FFFD}name.png"));
    }

    #[test]
    fn test_only_accepted_is_not_suspect() {
        assert!(!Verdict::Accepted.is_suspect());
        assert!(Verdict::RejectedCorrupt.is_suspect());
        assert!(Verdict::RejectedQuality.is_suspect());
        assert!(Verdict::RejectedDistorted.is_suspect());
    }

    #[test]
    fn test_corrupt_record_has_no_metrics() {
        let rec = ResultRecord::corrupt(
            PathBuf::from("/out/suspect/a.png"),
            Path::new("/in/a.png"),
            "Zero byte size file.",
        );
        assert!(rec.metrics.is_none());
        assert!(rec.suspect);
        assert_eq!(rec.verdict, Verdict::RejectedCorrupt);

        let json = serde_json::to_string(&rec).unwrap();
        assert!(!json.contains("metrics"));
        assert!(json.contains("\"verdict\":\"rejected_corrupt\""));
    }

    #[test]
    fn test_report_counts() {
        let mut report = DatasetReport::new();
        report.extend(vec![
            ResultRecord::accepted(PathBuf::from("a_0.jpg"), Path::new("a.png"), metrics()),
            ResultRecord::rejected(
                PathBuf::from("suspect/a_1.jpg"),
                Path::new("a.png"),
                Verdict::RejectedQuality,
                Some(metrics()),
                "low detail tile",
            ),
        ]);
        report.extend(vec![ResultRecord::corrupt(
            PathBuf::from("suspect/b.png"),
            Path::new("b.png"),
            "bad",
        )]);

        assert_eq!(report.len(), 3);
        assert_eq!(report.accepted_count(), 1);
        assert_eq!(report.suspect_count(), 2);
        assert_eq!(report.count(Verdict::RejectedCorrupt), 1);

        let stats = BatchStats::from_report(&report, 1, 2, std::time::Duration::from_secs(2));
        assert_eq!(stats.records, 3);
        assert_eq!(stats.corrupt, 1);
        assert!((stats.files_per_second - 1.0).abs() < 1e-9);
    }
}
