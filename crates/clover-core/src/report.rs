//! Dataset report serialization.
//!
//! CSV is the default tabular form; JSON and JSON Lines carry the same
//! records for downstream tooling.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use crate::error::Result;
use crate::types::{DatasetReport, ResultRecord};

/// CSV header. The first six columns are the historical report layout.
pub const CSV_HEADER: [&str; 8] = [
    "path",
    "stddev",
    "low_freq_prop",
    "lap_var",
    "reason",
    "suspect",
    "verdict",
    "source",
];

/// Report format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// Header row plus one comma-separated row per record
    #[default]
    Csv,
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl ReportFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::JsonLines => "jsonl",
        }
    }
}

/// Destination for report rows.
enum Sink<W: Write> {
    Csv(csv::Writer<W>),
    Json(W),
}

/// A writer that serializes result records in the chosen format.
///
/// CSV paths are written as their raw bytes so every row names a file that
/// exists on disk, even when the name is not valid UTF-8.
pub struct ReportWriter<W: Write> {
    sink: Sink<W>,
    format: ReportFormat,
    header_written: bool,
    rows_written: usize,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(writer: W, format: ReportFormat) -> Self {
        let sink = match format {
            ReportFormat::Csv => Sink::Csv(csv::Writer::from_writer(writer)),
            ReportFormat::Json | ReportFormat::JsonLines => Sink::Json(writer),
        };
        Self {
            sink,
            format,
            header_written: false,
            rows_written: 0,
        }
    }

    /// Write a single record as a CSV row or JSON line.
    ///
    /// For `Json`, use [`write_report`](Self::write_report); single records
    /// are written as standalone objects.
    pub fn write_record(&mut self, record: &ResultRecord) -> io::Result<()> {
        self.write_header()?;
        match &mut self.sink {
            Sink::Csv(writer) => writer.write_record(csv_row(record))?,
            Sink::Json(writer) => {
                serde_json::to_writer(&mut *writer, record).map_err(io::Error::other)?;
                writeln!(writer)?;
            }
        }
        self.rows_written += 1;
        Ok(())
    }

    /// Write a whole report.
    ///
    /// CSV always gets a header row, even for an empty report.
    pub fn write_report(&mut self, report: &DatasetReport) -> io::Result<()> {
        if let (Sink::Json(writer), ReportFormat::Json) = (&mut self.sink, self.format) {
            serde_json::to_writer_pretty(&mut *writer, report).map_err(io::Error::other)?;
            writeln!(writer)?;
            self.rows_written += report.len();
            return Ok(());
        }
        self.write_header()?;
        for record in report.records() {
            self.write_record(record)?;
        }
        Ok(())
    }

    fn write_header(&mut self) -> io::Result<()> {
        if let (Sink::Csv(writer), false) = (&mut self.sink, self.header_written) {
            writer.write_record(CSV_HEADER)?;
            self.header_written = true;
        }
        Ok(())
    }

    pub fn rows_written(&self) -> usize {
        self.rows_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::Csv(writer) => writer.flush(),
            Sink::Json(writer) => writer.flush(),
        }
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> io::Result<W> {
        match self.sink {
            Sink::Csv(writer) => writer.into_inner().map_err(|e| e.into_error()),
            Sink::Json(mut writer) => {
                writer.flush()?;
                Ok(writer)
            }
        }
    }
}

/// CSV fields for a record. Missing metrics or reason become empty fields.
pub fn csv_row(record: &ResultRecord) -> [Vec<u8>; 8] {
    let number = |value: Option<f64>| value.map(|v| v.to_string()).unwrap_or_default().into_bytes();
    let metrics = record.metrics.as_ref();
    [
        record.path.as_os_str().as_encoded_bytes().to_vec(),
        number(metrics.map(|m| m.stddev)),
        number(metrics.map(|m| m.low_freq_prop)),
        number(metrics.map(|m| m.lap_var)),
        record.reason.clone().unwrap_or_default().into_bytes(),
        record.suspect.to_string().into_bytes(),
        record.verdict.as_str().as_bytes().to_vec(),
        record.source.as_os_str().as_encoded_bytes().to_vec(),
    ]
}

/// Components of a report file name.
#[derive(Debug, Clone, Copy)]
pub struct ReportName<'a> {
    pub dataset: &'a str,
    pub dtype: Option<&'a str>,
    pub phase: Option<&'a str>,
    pub target_short_side: u32,
    pub tiles: usize,
}

/// File name encoding the run parameters, e.g. `lroc_edr_12_256px_4096tiles.csv`.
pub fn report_file_name(name: &ReportName<'_>, format: ReportFormat) -> String {
    let mut parts = vec![name.dataset.to_string()];
    parts.extend(name.dtype.map(str::to_string));
    parts.extend(name.phase.map(str::to_string));
    parts.push(format!("{}px", name.target_short_side));
    parts.push(format!("{}tiles", name.tiles));
    format!("{}.{}", parts.join("_"), format.extension())
}

/// Write a report to `path`, creating parent directories as needed.
pub fn write_report_file(path: &Path, report: &DatasetReport, format: ReportFormat) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = ReportWriter::new(BufWriter::new(file), format);
    writer.write_report(report)?;
    writer.flush()?;
    tracing::info!("Wrote {} report rows to {:?}", writer.rows_written(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{QualityMetrics, Verdict};
    use std::path::PathBuf;

    fn metrics() -> QualityMetrics {
        QualityMetrics {
            stddev: 31.5,
            low_freq_prop: 0.5,
            lap_var: 1200.25,
            aspect_ratio: 2.0,
        }
    }

    fn sample_report() -> DatasetReport {
        let mut report = DatasetReport::new();
        report.extend(vec![
            ResultRecord::accepted(
                PathBuf::from("/out/A/img_0.jpg"),
                Path::new("/src/A/img.png"),
                metrics(),
            ),
            ResultRecord::corrupt(
                PathBuf::from("/out/A/suspect/empty.png"),
                Path::new("/src/A/empty.png"),
                "Zero byte size file.",
            ),
        ]);
        report
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(ReportFormat::parse("csv"), Some(ReportFormat::Csv));
        assert_eq!(ReportFormat::parse("JSON"), Some(ReportFormat::Json));
        assert_eq!(ReportFormat::parse("ndjson"), Some(ReportFormat::JsonLines));
        assert_eq!(ReportFormat::parse("xlsx"), None);
    }

    fn render(report: &DatasetReport, format: ReportFormat) -> Vec<u8> {
        let mut writer = ReportWriter::new(Vec::new(), format);
        writer.write_report(report).unwrap();
        writer.into_inner().unwrap()
    }

    #[test]
    fn test_csv_report() {
        let mut writer = ReportWriter::new(Vec::new(), ReportFormat::Csv);
        writer.write_report(&sample_report()).unwrap();
        assert_eq!(writer.rows_written(), 2);

        let output = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "path,stddev,low_freq_prop,lap_var,reason,suspect,verdict,source"
        );
        assert_eq!(
            lines[1],
            "/out/A/img_0.jpg,31.5,0.5,1200.25,,false,accepted,/src/A/img.png"
        );
        assert_eq!(
            lines[2],
            "/out/A/suspect/empty.png,,,,Zero byte size file.,true,rejected_corrupt,/src/A/empty.png"
        );
    }

    #[test]
    fn test_csv_empty_report_has_header() {
        let output = render(&DatasetReport::new(), ReportFormat::Csv);
        assert_eq!(String::from_utf8(output).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_csv_quotes_reason() {
        let mut report = DatasetReport::new();
        report.extend(vec![ResultRecord::rejected(
            PathBuf::from("/out/x.jpg"),
            Path::new("/src/x.png"),
            Verdict::RejectedQuality,
            Some(metrics()),
            "Suspect image statistics: a, \"b\"",
        )]);
        let output = String::from_utf8(render(&report, ReportFormat::Csv)).unwrap();
        assert!(output.contains(",\"Suspect image statistics: a, \"\"b\"\"\","));
    }

    #[cfg(unix)]
    #[test]
    fn test_csv_keeps_non_utf8_path_bytes() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let name = OsStr::from_bytes(b"/out/A/suspect/bad\xffname.png");
        let mut report = DatasetReport::new();
        report.extend(vec![ResultRecord::corrupt(
            PathBuf::from(name),
            Path::new(name),
            "Zero byte size file.",
        )]);

        let output = render(&report, ReportFormat::Csv);
        let row = output.split(|&b| b == b'\n').nth(1).unwrap();
        assert!(row.starts_with(b"/out/A/suspect/bad\xffname.png,"));
        assert!(row.ends_with(b",rejected_corrupt,/out/A/suspect/bad\xffname.png"));
    }

    #[test]
    fn test_jsonl_report() {
        let output = String::from_utf8(render(&sample_report(), ReportFormat::JsonLines)).unwrap();
        let lines: Vec<&str> = output.trim().split('\n').collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["verdict"], "accepted");
        assert_eq!(first["metrics"]["stddev"], 31.5);
    }

    #[test]
    fn test_json_report_document() {
        let output = render(&sample_report(), ReportFormat::Json);
        let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(value["records"].as_array().unwrap().len(), 2);
        assert_eq!(value["cancelled"], false);
    }

    #[test]
    fn test_report_file_name() {
        let name = ReportName {
            dataset: "lroc",
            dtype: Some("edr"),
            phase: Some("12"),
            target_short_side: 256,
            tiles: 4096,
        };
        assert_eq!(
            report_file_name(&name, ReportFormat::Csv),
            "lroc_edr_12_256px_4096tiles.csv"
        );

        let flat = ReportName {
            dtype: None,
            phase: None,
            ..name
        };
        assert_eq!(
            report_file_name(&flat, ReportFormat::JsonLines),
            "lroc_256px_4096tiles.jsonl"
        );
    }

    #[test]
    fn test_write_report_file_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.csv");
        write_report_file(&path, &sample_report(), ReportFormat::Csv).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
    }
}
