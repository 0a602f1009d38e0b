//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings: where datasets come from and where they go.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root of the mounted source archives
    pub data_source: PathBuf,

    /// Root under which processed datasets are created
    pub out_path: PathBuf,

    /// Dataset name used as the report file prefix
    pub dataset_name: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_source: PathBuf::from("~/clover_shared/datasets"),
            out_path: PathBuf::from("~/datasets/clover_processed"),
            dataset_name: "lroc".to_string(),
        }
    }
}

/// Processing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    /// Number of parallel workers (defaults to available CPU parallelism)
    pub parallel_workers: usize,

    /// Short side, in pixels, that accepted images are rescaled to
    pub target_short_side: u32,

    /// Stop dispatching after this many input files
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_images: Option<usize>,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            parallel_workers: default_parallelism(),
            target_short_side: 256,
            max_images: None,
        }
    }
}

/// Number of hardware threads, or 4 when it cannot be determined.
pub fn default_parallelism() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Accept/reject thresholds for the image classifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QualityConfig {
    /// Intensity (0-255) below which a value counts as "low frequency"
    pub low_intensity: u8,

    /// Images with a smaller low-intensity proportion are suspect
    pub low_freq_prop_min: f64,

    /// Images with a larger Laplacian variance are suspect
    pub laplacian_var_max: f64,

    /// Rounded long/short side ratio at or above which an image is distorted
    pub distortion_ratio: u32,

    /// Tiles with a smaller standard deviation are suspect
    pub tile_stddev_min: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            low_intensity: 25,
            low_freq_prop_min: 0.02,
            laplacian_var_max: 4000.0,
            distortion_ratio: 25,
            tile_stddev_min: 10.0,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Report format: "csv", "json" or "jsonl"
    pub format: String,

    /// JPEG quality for emitted tiles (1-100)
    pub jpeg_quality: u8,

    /// Name of the quarantine folder created inside each output subdirectory
    pub suspect_dir_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "csv".to_string(),
            jpeg_quality: 95,
            suspect_dir_name: "suspect".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
