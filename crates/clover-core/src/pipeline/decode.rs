//! Image decoding with content-based format detection.

use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

use crate::error::PipelineError;

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// 8-bit working image: `Rgb8` for colour input, `Luma8` for grayscale
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
}

/// Decodes image files into 8-bit working images.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl ImageDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Read and decode an image file.
    pub fn decode(&self, path: &Path) -> Result<DecodedImage, PipelineError> {
        let bytes = std::fs::read(path).map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: format!("Cannot read file: {}", e),
        })?;
        Self::decode_bytes(bytes, path)
    }

    /// Decode an in-memory byte buffer. `path` is used for the extension
    /// fallback and error context only.
    pub fn decode_bytes(bytes: Vec<u8>, path: &Path) -> Result<DecodedImage, PipelineError> {
        if bytes.is_empty() {
            return Err(PipelineError::ZeroByte(path.to_path_buf()));
        }

        let mut reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        let format = match reader.format() {
            Some(f) => f,
            None => ImageFormat::from_path(path).map_err(|_| PipelineError::UnsupportedFormat {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_string(),
            })?,
        };
        reader.set_format(format);
        let decoded = reader.decode().map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let (width, height) = decoded.dimensions();
        if width == 0 || height == 0 {
            return Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: "Image produces empty pixel grid".to_string(),
            });
        }

        Ok(DecodedImage {
            image: to_working_image(decoded),
            format,
            width,
            height,
        })
    }
}

/// Normalise to 8 bits per channel, dropping alpha.
pub fn to_working_image(image: DynamicImage) -> DynamicImage {
    if image.color().has_color() {
        match image {
            DynamicImage::ImageRgb8(_) => image,
            other => DynamicImage::ImageRgb8(other.to_rgb8()),
        }
    } else {
        match image {
            DynamicImage::ImageLuma8(_) => image,
            other => DynamicImage::ImageLuma8(other.to_luma8()),
        }
    }
}
