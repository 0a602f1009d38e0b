//! Image classification: quality metrics and accept/reject thresholds.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. decodability (corrupt, zero-byte, undecodable)
//! 2. aspect ratio (distorted)
//! 3. pixel statistics (low-intensity proportion, Laplacian variance)
//!
//! The classifier does no I/O; routing files is the processor's job.

use image::DynamicImage;
use ndarray::ArrayView3;

use crate::config::QualityConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::math::{laplacian_variance, round_decimals, variance_from_sums};
use crate::types::{QualityMetrics, Verdict};

use super::decode::to_working_image;

/// Outcome of classifying one image, carrying whatever payload the verdict has.
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Accepted(QualityMetrics),
    RejectedCorrupt {
        reason: String,
    },
    RejectedQuality {
        metrics: QualityMetrics,
        reason: String,
    },
    RejectedDistorted {
        metrics: QualityMetrics,
        reason: String,
    },
}

impl Classification {
    pub fn verdict(&self) -> Verdict {
        match self {
            Classification::Accepted(_) => Verdict::Accepted,
            Classification::RejectedCorrupt { .. } => Verdict::RejectedCorrupt,
            Classification::RejectedQuality { .. } => Verdict::RejectedQuality,
            Classification::RejectedDistorted { .. } => Verdict::RejectedDistorted,
        }
    }

    pub fn metrics(&self) -> Option<QualityMetrics> {
        match self {
            Classification::Accepted(m)
            | Classification::RejectedQuality { metrics: m, .. }
            | Classification::RejectedDistorted { metrics: m, .. } => Some(*m),
            Classification::RejectedCorrupt { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Classification::Accepted(_) => None,
            Classification::RejectedCorrupt { reason }
            | Classification::RejectedQuality { reason, .. }
            | Classification::RejectedDistorted { reason, .. } => Some(reason),
        }
    }
}

/// Applies the configured thresholds to decoded images and tiles.
#[derive(Debug, Clone)]
pub struct ImageClassifier {
    config: QualityConfig,
}

impl ImageClassifier {
    pub fn new(config: QualityConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Classify a decode result.
    ///
    /// A failed decode, or a metric computation that fails, is `RejectedCorrupt`
    /// with the error text as the reason.
    pub fn classify(&self, decoded: Result<&DynamicImage, &PipelineError>) -> Classification {
        let image = match decoded {
            Ok(image) => image,
            Err(e) => {
                return Classification::RejectedCorrupt {
                    reason: corrupt_reason(e),
                }
            }
        };
        match self.metrics(image) {
            Ok(metrics) => self.classify_metrics(metrics),
            Err(e) => Classification::RejectedCorrupt {
                reason: corrupt_reason(&e),
            },
        }
    }

    /// Apply the geometry and statistics checks to precomputed metrics.
    pub fn classify_metrics(&self, metrics: QualityMetrics) -> Classification {
        let ratio = metrics.aspect_ratio.round_ties_even();
        if ratio >= f64::from(self.config.distortion_ratio) {
            return Classification::RejectedDistorted {
                metrics,
                reason: format!(
                    "Aspect ratio {:.1} reaches distortion threshold {}",
                    metrics.aspect_ratio, self.config.distortion_ratio
                ),
            };
        }

        let mut problems = Vec::new();
        if metrics.low_freq_prop < self.config.low_freq_prop_min {
            problems.push(format!(
                "low-intensity proportion {:.4} < {}",
                metrics.low_freq_prop, self.config.low_freq_prop_min
            ));
        }
        if metrics.lap_var > self.config.laplacian_var_max {
            problems.push(format!(
                "Laplacian variance {:.1} > {}",
                metrics.lap_var, self.config.laplacian_var_max
            ));
        }
        if !problems.is_empty() {
            return Classification::RejectedQuality {
                metrics,
                reason: format!("Suspect image statistics: {}", problems.join(", ")),
            };
        }

        Classification::Accepted(metrics)
    }

    /// Per-tile check: only the low-detail rule applies to tiles.
    pub fn classify_tile(&self, metrics: QualityMetrics) -> Classification {
        if metrics.stddev < self.config.tile_stddev_min {
            Classification::RejectedQuality {
                metrics,
                reason: format!(
                    "Low-detail tile: standard deviation {:.2} < {}",
                    metrics.stddev, self.config.tile_stddev_min
                ),
            }
        } else {
            Classification::Accepted(metrics)
        }
    }

    /// Compute quality metrics over the flattened `H × W × C` pixel array.
    pub fn metrics(&self, image: &DynamicImage) -> PipelineResult<QualityMetrics> {
        compute_metrics(image, self.config.low_intensity)
    }
}

/// Reason text for a corrupt input, matching the wording used in reports.
fn corrupt_reason(err: &PipelineError) -> String {
    match err {
        PipelineError::ZeroByte(_) => "Zero byte size file.".to_string(),
        other => other.to_string(),
    }
}

/// Compute quality metrics for an image.
pub fn compute_metrics(image: &DynamicImage, low_intensity: u8) -> PipelineResult<QualityMetrics> {
    match image {
        DynamicImage::ImageLuma8(buf) => {
            metrics_from_raw(buf.as_raw(), buf.height(), buf.width(), 1, low_intensity)
        }
        DynamicImage::ImageRgb8(buf) => {
            metrics_from_raw(buf.as_raw(), buf.height(), buf.width(), 3, low_intensity)
        }
        other => compute_metrics(&to_working_image(other.clone()), low_intensity),
    }
}

fn metrics_from_raw(
    raw: &[u8],
    height: u32,
    width: u32,
    channels: usize,
    low_intensity: u8,
) -> PipelineResult<QualityMetrics> {
    let shape = (height as usize, width as usize, channels);
    let pixels = ArrayView3::from_shape(shape, raw).map_err(|e| PipelineError::Decode {
        path: Default::default(),
        message: format!("Pixel buffer does not match {}x{}x{}: {}", height, width, channels, e),
    })?;
    if pixels.is_empty() {
        return Err(PipelineError::Decode {
            path: Default::default(),
            message: "Image produces empty pixel grid".to_string(),
        });
    }

    let total = pixels.len() as f64;
    let (sum, sum_sq, low_count) =
        pixels
            .iter()
            .fold((0i128, 0i128, 0usize), |(sum, sum_sq, low), &v| {
                let v = i128::from(v);
                (sum + v, sum_sq + v * v, low + usize::from(v < i128::from(low_intensity)))
            });
    let stddev = round_decimals(variance_from_sums(pixels.len(), sum, sum_sq).sqrt(), 5);
    let lap_var = laplacian_variance(pixels);

    let long = height.max(width) as f64;
    let short = height.min(width) as f64;

    Ok(QualityMetrics {
        stddev,
        low_freq_prop: low_count as f64 / total,
        lap_var,
        aspect_ratio: long / short,
    })
}
