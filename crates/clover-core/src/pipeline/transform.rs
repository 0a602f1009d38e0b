//! Rescaling and photobooth-cut tiling of accepted images.
//!
//! Accepted images are rescaled so their short side equals the target size,
//! then the long axis is sliced into consecutive square tiles whose edge is the
//! short side. A remainder shorter than one tile is dropped.

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, Luma, Rgb, RgbImage};

use super::decode::to_working_image;

/// Output dimensions that bring the short side to `target_short_side`,
/// preserving aspect ratio (long side rounded to the nearest pixel).
pub fn scaled_dimensions(width: u32, height: u32, target_short_side: u32) -> (u32, u32) {
    let short = u64::from(width.min(height));
    if short == 0 {
        return (width, height);
    }
    let target = u64::from(target_short_side);
    let scale_long = |long: u32| ((u64::from(long) * target + short / 2) / short) as u32;
    if width <= height {
        (target_short_side, scale_long(height).max(target_short_side))
    } else {
        (scale_long(width).max(target_short_side), target_short_side)
    }
}

/// Resize so the short side equals `target_short_side`.
///
/// Downscaling averages source pixels by covered area; upscaling falls back to
/// bilinear interpolation. An image already at the target size is returned as is.
pub fn rescale(image: &DynamicImage, target_short_side: u32) -> DynamicImage {
    let (width, height) = image.dimensions();
    let (new_width, new_height) = scaled_dimensions(width, height, target_short_side);

    if (new_width, new_height) == (width, height) {
        return image.clone();
    }
    if new_width > width || new_height > height {
        return image.resize_exact(new_width, new_height, FilterType::Triangle);
    }

    match image {
        DynamicImage::ImageLuma8(buf) => {
            let out = area_resize(buf.as_raw(), width, height, 1, new_width, new_height);
            let row = new_width as usize;
            DynamicImage::ImageLuma8(GrayImage::from_fn(new_width, new_height, |x, y| {
                Luma([out[y as usize * row + x as usize]])
            }))
        }
        DynamicImage::ImageRgb8(buf) => {
            let out = area_resize(buf.as_raw(), width, height, 3, new_width, new_height);
            let row = new_width as usize * 3;
            DynamicImage::ImageRgb8(RgbImage::from_fn(new_width, new_height, |x, y| {
                let i = y as usize * row + x as usize * 3;
                Rgb([out[i], out[i + 1], out[i + 2]])
            }))
        }
        other => rescale(&to_working_image(other.clone()), target_short_side),
    }
}

/// Per-output-sample source indices and normalised coverage weights.
fn area_weights(src_len: u32, dst_len: u32) -> Vec<Vec<(usize, f64)>> {
    let scale = f64::from(src_len) / f64::from(dst_len);
    (0..dst_len)
        .map(|d| {
            let start = f64::from(d) * scale;
            let end = f64::from(d + 1) * scale;
            let mut weights = Vec::with_capacity(scale.ceil() as usize + 1);
            let mut s = start.floor() as usize;
            while (s as f64) < end && s < src_len as usize {
                let covered = end.min(s as f64 + 1.0) - start.max(s as f64);
                if covered > 1e-12 {
                    weights.push((s, covered / scale));
                }
                s += 1;
            }
            weights
        })
        .collect()
}

/// Separable area-average downscale of an interleaved 8-bit buffer.
fn area_resize(
    raw: &[u8],
    width: u32,
    height: u32,
    channels: usize,
    new_width: u32,
    new_height: u32,
) -> Vec<u8> {
    let (w, h, nw) = (width as usize, height as usize, new_width as usize);
    let x_weights = area_weights(width, new_width);
    let y_weights = area_weights(height, new_height);

    // Horizontal pass: h × nw × channels
    let mut horizontal = vec![0f64; h * nw * channels];
    for y in 0..h {
        let src_row = &raw[y * w * channels..(y + 1) * w * channels];
        let dst_row = &mut horizontal[y * nw * channels..(y + 1) * nw * channels];
        for (x, weights) in x_weights.iter().enumerate() {
            for &(sx, wgt) in weights {
                for c in 0..channels {
                    dst_row[x * channels + c] += wgt * f64::from(src_row[sx * channels + c]);
                }
            }
        }
    }

    // Vertical pass: new_height × nw × channels
    let row_len = nw * channels;
    let mut out = Vec::with_capacity(new_height as usize * row_len);
    for weights in &y_weights {
        let mut acc = vec![0f64; row_len];
        for &(sy, wgt) in weights {
            let src_row = &horizontal[sy * row_len..(sy + 1) * row_len];
            for (a, &v) in acc.iter_mut().zip(src_row) {
                *a += wgt * v;
            }
        }
        out.extend(acc.into_iter().map(|v| v.round().clamp(0.0, 255.0) as u8));
    }
    out
}

/// Square windows `(x, y, edge)` covering the long axis, in slice order.
pub fn tile_windows(width: u32, height: u32) -> Vec<(u32, u32, u32)> {
    let edge = width.min(height);
    if edge == 0 {
        return Vec::new();
    }
    let count = width.max(height) / edge;
    (0..count)
        .map(|i| {
            if width >= height {
                (i * edge, 0, edge)
            } else {
                (0, i * edge, edge)
            }
        })
        .collect()
}

/// Number of tiles the photobooth cut yields for an image of this size.
pub fn tile_count(width: u32, height: u32) -> usize {
    let edge = width.min(height);
    if edge == 0 {
        0
    } else {
        (width.max(height) / edge) as usize
    }
}

/// Ordered, single-pass sequence of square tiles cut from an image.
pub struct Tiles<'a> {
    image: &'a DynamicImage,
    windows: std::vec::IntoIter<(u32, u32, u32)>,
}

impl Iterator for Tiles<'_> {
    type Item = DynamicImage;

    fn next(&mut self) -> Option<Self::Item> {
        let (x, y, edge) = self.windows.next()?;
        let (width, height) = self.image.dimensions();
        if width == height {
            return Some(self.image.clone());
        }
        Some(self.image.crop_imm(x, y, edge, edge))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.windows.size_hint()
    }
}

impl ExactSizeIterator for Tiles<'_> {}

/// Photobooth cut: slice the long axis into consecutive `L × L` tiles where
/// `L` is the short side. A square image yields itself as the only tile.
pub fn tile(image: &DynamicImage) -> Tiles<'_> {
    let (width, height) = image.dimensions();
    Tiles {
        image,
        windows: tile_windows(width, height).into_iter(),
    }
}
