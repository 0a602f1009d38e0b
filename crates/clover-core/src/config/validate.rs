//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::report::ReportFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.parallel_workers == 0 {
            return Err(ConfigError::ValidationError(
                "processing.parallel_workers must be > 0".into(),
            ));
        }
        if self.processing.target_short_side == 0 {
            return Err(ConfigError::ValidationError(
                "processing.target_short_side must be > 0".into(),
            ));
        }
        if self.processing.max_images == Some(0) {
            return Err(ConfigError::ValidationError(
                "processing.max_images must be > 0 when set".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.quality.low_freq_prop_min) {
            return Err(ConfigError::ValidationError(
                "quality.low_freq_prop_min must be between 0.0 and 1.0".into(),
            ));
        }
        if self.quality.laplacian_var_max.is_nan() || self.quality.laplacian_var_max < 0.0 {
            return Err(ConfigError::ValidationError(
                "quality.laplacian_var_max must be >= 0".into(),
            ));
        }
        if self.quality.distortion_ratio < 1 {
            return Err(ConfigError::ValidationError(
                "quality.distortion_ratio must be >= 1".into(),
            ));
        }
        if self.quality.tile_stddev_min.is_nan() || self.quality.tile_stddev_min < 0.0 {
            return Err(ConfigError::ValidationError(
                "quality.tile_stddev_min must be >= 0".into(),
            ));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(ConfigError::ValidationError(
                "output.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if ReportFormat::parse(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be one of csv, json, jsonl (got {:?})",
                self.output.format
            )));
        }
        let suspect = self.output.suspect_dir_name.trim();
        if suspect.is_empty() || suspect.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(
                "output.suspect_dir_name must be a single non-empty path component".into(),
            ));
        }
        Ok(())
    }
}
