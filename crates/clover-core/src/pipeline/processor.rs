//! Per-image pipeline: validate → decode → classify → rescale → tile → write.
//!
//! Every outcome, including I/O failures, comes back as result records so one
//! bad file never disturbs the rest of a batch.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ResultRecord, Verdict};

use super::classify::{Classification, ImageClassifier};
use super::decode::ImageDecoder;
use super::layout::OutputDirs;
use super::transform::{rescale, tile, tile_count};
use super::validate::Validator;

/// Extension forced on every emitted tile regardless of the source format.
const TILE_EXTENSION: &str = "jpg";

/// Runs the full per-image pipeline for one file at a time.
///
/// Holds only immutable configuration, so one instance is shared by all workers.
#[derive(Debug, Clone)]
pub struct ImageProcessor {
    validator: Validator,
    decoder: ImageDecoder,
    classifier: ImageClassifier,
    target_short_side: u32,
    jpeg_quality: u8,
}

impl ImageProcessor {
    /// Create a new image processor with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            validator: Validator::new(),
            decoder: ImageDecoder::new(),
            classifier: ImageClassifier::new(config.quality.clone()),
            target_short_side: config.processing.target_short_side,
            jpeg_quality: config.output.jpeg_quality,
        }
    }

    pub fn classifier(&self) -> &ImageClassifier {
        &self.classifier
    }

    pub fn target_short_side(&self) -> u32 {
        self.target_short_side
    }

    /// Process one input file, writing outputs into `dirs`.
    ///
    /// Rejected inputs are copied verbatim to the suspect directory and yield
    /// one record. Accepted inputs are rescaled and tiled; each tile is
    /// re-classified on its own pixels and yields one record.
    pub fn process(&self, path: &Path, dirs: &OutputDirs) -> Vec<ResultRecord> {
        let start = Instant::now();
        tracing::debug!("Processing: {:?}", path);

        let decoded = match self
            .validator
            .validate(path)
            .and_then(|_| self.decoder.decode(path))
        {
            Ok(decoded) => decoded,
            Err(e) => {
                let classification = self.classifier.classify(Err(&e));
                tracing::warn!("Corrupt input {:?}: {}", path, e);
                return vec![self.quarantine(path, dirs, &classification)];
            }
        };
        let decode_time = start.elapsed();
        tracing::trace!("  Decode: {:?}", decode_time);

        let classify_start = Instant::now();
        let classification = self.classifier.classify(Ok(&decoded.image));
        tracing::trace!("  Classify: {:?}", classify_start.elapsed());

        let records = match classification {
            Classification::Accepted(_) => self.emit_tiles(path, &decoded.image, dirs),
            rejected => {
                tracing::debug!(
                    "Rejected {:?} ({}): {}",
                    path,
                    rejected.verdict(),
                    rejected.reason().unwrap_or_default()
                );
                vec![self.quarantine(path, dirs, &rejected)]
            }
        };

        tracing::debug!(
            "Processed {:?} in {:?} ({}x{}, {} record(s))",
            path,
            start.elapsed(),
            decoded.width,
            decoded.height,
            records.len()
        );
        records
    }

    /// Copy a rejected original into the suspect directory.
    fn quarantine(
        &self,
        path: &Path,
        dirs: &OutputDirs,
        classification: &Classification,
    ) -> ResultRecord {
        let reason = classification.reason().unwrap_or("rejected");
        match copy_into(path, &dirs.suspect) {
            Ok(dest) => ResultRecord::rejected(
                dest,
                path,
                classification.verdict(),
                classification.metrics(),
                reason,
            ),
            Err(e) => {
                tracing::warn!("{}", e);
                ResultRecord::rejected(
                    path.to_path_buf(),
                    path,
                    Verdict::RejectedCorrupt,
                    classification.metrics(),
                    format!("{}; {}", reason, e),
                )
            }
        }
    }

    /// Rescale, cut into tiles and route each tile by its own statistics.
    fn emit_tiles(&self, path: &Path, image: &DynamicImage, dirs: &OutputDirs) -> Vec<ResultRecord> {
        let resize_start = Instant::now();
        let rescaled = rescale(image, self.target_short_side);
        tracing::trace!("  Rescale: {:?}", resize_start.elapsed());

        let (width, height) = rescaled.dimensions();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());

        let mut records = Vec::with_capacity(tile_count(width, height));
        for (index, tile_image) in tile(&rescaled).enumerate() {
            let file_name = format!("{}_{}.{}", stem, index, TILE_EXTENSION);
            records.push(self.emit_tile(path, &tile_image, &file_name, dirs));
        }

        if records.is_empty() {
            records.push(ResultRecord::corrupt(
                path.to_path_buf(),
                path,
                format!("Rescaled image {}x{} produced no tiles", width, height),
            ));
        }
        records
    }

    fn emit_tile(
        &self,
        source: &Path,
        tile_image: &DynamicImage,
        file_name: &str,
        dirs: &OutputDirs,
    ) -> ResultRecord {
        let metrics = match self.classifier.metrics(tile_image) {
            Ok(m) => m,
            Err(e) => {
                return ResultRecord::corrupt(dirs.suspect.join(file_name), source, e.to_string())
            }
        };

        let classification = self.classifier.classify_tile(metrics);
        let dest = if classification.verdict().is_suspect() {
            dirs.suspect.join(file_name)
        } else {
            dirs.accepted.join(file_name)
        };

        if let Err(e) = write_jpeg(tile_image, &dest, self.jpeg_quality) {
            tracing::warn!("{}", e);
            return ResultRecord::rejected(
                dest,
                source,
                Verdict::RejectedCorrupt,
                Some(metrics),
                e.to_string(),
            );
        }

        match classification {
            Classification::Accepted(m) => ResultRecord::accepted(dest, source, m),
            rejected => ResultRecord::rejected(
                dest,
                source,
                rejected.verdict(),
                rejected.metrics(),
                rejected.reason().unwrap_or_default(),
            ),
        }
    }
}

/// Copy a file verbatim into `dir`, keeping its name.
fn copy_into(path: &Path, dir: &Path) -> PipelineResult<PathBuf> {
    let name = path.file_name().ok_or_else(|| PipelineError::Copy {
        from: path.to_path_buf(),
        to: dir.to_path_buf(),
        message: "source has no file name".to_string(),
    })?;
    let dest = dir.join(name);
    std::fs::copy(path, &dest).map_err(|e| PipelineError::Copy {
        from: path.to_path_buf(),
        to: dest.clone(),
        message: e.to_string(),
    })?;
    Ok(dest)
}

/// Encode an 8-bit image as JPEG at `dest`.
fn write_jpeg(image: &DynamicImage, dest: &Path, quality: u8) -> PipelineResult<()> {
    let write_err = |message: String| PipelineError::Write {
        path: dest.to_path_buf(),
        message,
    };
    let file = File::create(dest).map_err(|e| write_err(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    let encoder = JpegEncoder::new_with_quality(&mut writer, quality);
    image
        .write_with_encoder(encoder)
        .map_err(|e| write_err(e.to_string()))?;
    writer.flush().map_err(|e| write_err(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::layout::DirectoryLayout;
    use image::{GrayImage, ImageFormat, Luma};

    /// Blocky dark/mid pattern that passes the whole-image checks.
    fn textured(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
            if ((x / 8) + (y / 8)) % 2 == 0 {
                Luma([10])
            } else {
                Luma([70])
            }
        }))
    }

    fn setup() -> (tempfile::TempDir, tempfile::TempDir, OutputDirs, ImageProcessor) {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let dirs = DirectoryLayout::new(out.path(), "suspect")
            .prepare(Path::new("/src/sub"))
            .unwrap();
        let processor = ImageProcessor::new(&Config::default());
        (src, out, dirs, processor)
    }

    #[test]
    fn test_zero_byte_file_is_quarantined() {
        let (src, _out, dirs, processor) = setup();
        let path = src.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();

        let records = processor.process(&path, &dirs);
        assert_eq!(records.len(), 1);
        let rec = &records[0];
        assert_eq!(rec.verdict, Verdict::RejectedCorrupt);
        assert!(rec.metrics.is_none());
        assert!(rec.suspect);
        assert_eq!(rec.reason.as_deref(), Some("Zero byte size file."));
        assert_eq!(rec.path, dirs.suspect.join("empty.png"));
        assert!(dirs.suspect.join("empty.png").exists());
    }

    #[test]
    fn test_undecodable_file_is_quarantined() {
        let (src, _out, dirs, processor) = setup();
        let path = src.path().join("notes.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let records = processor.process(&path, &dirs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, Verdict::RejectedCorrupt);
        assert_eq!(
            std::fs::read(dirs.suspect.join("notes.png")).unwrap(),
            b"not really a png"
        );
    }

    #[test]
    fn test_quality_rejection_copies_original_verbatim() {
        let (src, _out, dirs, processor) = setup();
        let path = src.path().join("snow.png");
        GrayImage::from_pixel(64, 64, Luma([200]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let records = processor.process(&path, &dirs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, Verdict::RejectedQuality);
        assert!(records[0].metrics.is_some());
        assert_eq!(
            std::fs::read(dirs.suspect.join("snow.png")).unwrap(),
            std::fs::read(&path).unwrap()
        );
    }

    #[test]
    fn test_distorted_image_is_quarantined() {
        let (src, _out, dirs, processor) = setup();
        let path = src.path().join("strip.png");
        textured(800, 16).save_with_format(&path, ImageFormat::Png).unwrap();

        let records = processor.process(&path, &dirs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].verdict, Verdict::RejectedDistorted);
        assert!(dirs.suspect.join("strip.png").exists());
    }

    #[test]
    fn test_accepted_image_is_tiled() {
        let (src, _out, dirs, processor) = setup();
        let path = src.path().join("scene.png");
        textured(1024, 256).save_with_format(&path, ImageFormat::Png).unwrap();

        let records = processor.process(&path, &dirs);
        assert_eq!(records.len(), 4);
        for (i, rec) in records.iter().enumerate() {
            assert_eq!(rec.verdict, Verdict::Accepted);
            assert!(!rec.suspect);
            assert_eq!(rec.path, dirs.accepted.join(format!("scene_{}.jpg", i)));
            let written = image::open(&rec.path).unwrap();
            assert_eq!(written.dimensions(), (256, 256));
        }
    }

    #[test]
    fn test_flat_tile_goes_to_suspect() {
        let (src, _out, dirs, processor) = setup();
        let path = src.path().join("half.png");
        // Left square is textured, right square is flat dark.
        let img = GrayImage::from_fn(512, 256, |x, y| {
            if x < 256 && ((x / 8) + (y / 8)) % 2 == 0 {
                Luma([70])
            } else {
                Luma([10])
            }
        });
        img.save_with_format(&path, ImageFormat::Png).unwrap();

        let records = processor.process(&path, &dirs);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].verdict, Verdict::Accepted);
        assert_eq!(records[1].verdict, Verdict::RejectedQuality);
        assert_eq!(records[1].path, dirs.suspect.join("half_1.jpg"));
        assert!(dirs.suspect.join("half_1.jpg").exists());
    }

    #[test]
    fn test_tile_names_are_deterministic() {
        let (src, _out, dirs, processor) = setup();
        let path = src.path().join("twice.png");
        textured(600, 256).save_with_format(&path, ImageFormat::Png).unwrap();

        let first = processor.process(&path, &dirs);
        let second = processor.process(&path, &dirs);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_suspect_dir_becomes_record() {
        let (src, out, _dirs, processor) = setup();
        let path = src.path().join("empty.png");
        std::fs::write(&path, b"").unwrap();
        let dirs = OutputDirs {
            accepted: out.path().join("gone"),
            suspect: out.path().join("gone/suspect"),
        };

        let records = processor.process(&path, &dirs);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].path, path);
        assert!(records[0].reason.as_deref().unwrap().contains("Failed to copy"));
    }
}
