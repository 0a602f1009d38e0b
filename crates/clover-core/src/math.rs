//! Shared math utilities.

use ndarray::{Array3, ArrayView3};

/// Round to a fixed number of decimal places.
pub fn round_decimals(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Reflect an out-of-range index back into `0..len` without repeating the edge
/// sample (`-1 -> 1`, `len -> len - 2`).
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let len = len as isize;
    let mut i = index.abs();
    if i >= len {
        i = 2 * len - 2 - i;
    }
    i as usize
}

/// Laplacian response at one sample, reflecting out-of-range neighbours.
fn laplacian_at(pixels: &ArrayView3<'_, u8>, y: usize, x: usize, c: usize) -> i32 {
    let (height, width, _) = pixels.dim();
    let (yi, xi) = (y as isize, x as isize);
    let up = reflect_101(yi - 1, height);
    let down = reflect_101(yi + 1, height);
    let left = reflect_101(xi - 1, width);
    let right = reflect_101(xi + 1, width);

    let at = |row: usize, col: usize| i32::from(pixels[[row, col, c]]);
    at(up, x) + at(down, x) + at(y, left) + at(y, right) - 4 * at(y, x)
}

/// Discrete Laplacian of an `H × W × C` pixel grid, applied per channel.
///
/// Kernel:
/// ```text
/// [ 0  1  0 ]
/// [ 1 -4  1 ]
/// [ 0  1  0 ]
/// ```
/// Borders are reflected (reflect-101) so the output has the input's shape.
pub fn laplacian(pixels: ArrayView3<'_, u8>) -> Array3<f64> {
    Array3::from_shape_fn(pixels.dim(), |(y, x, c)| {
        f64::from(laplacian_at(&pixels, y, x, c))
    })
}

/// Population variance of [`laplacian`] without materialising the filtered grid.
///
/// Responses are integers, so the sums are exact and the result does not
/// depend on traversal order.
pub fn laplacian_variance(pixels: ArrayView3<'_, u8>) -> f64 {
    let (height, width, channels) = pixels.dim();
    let mut sum = 0i128;
    let mut sum_sq = 0i128;
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let v = i128::from(laplacian_at(&pixels, y, x, c));
                sum += v;
                sum_sq += v * v;
            }
        }
    }
    variance_from_sums(pixels.len(), sum, sum_sq)
}

/// Mean-free population variance from exact sums: `(n·Σv² − (Σv)²) / n²`.
pub fn variance_from_sums(count: usize, sum: i128, sum_sq: i128) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as i128;
    let numerator = n * sum_sq - sum * sum;
    numerator as f64 / (n * n) as f64
}
