//! Fixed-width windowing of a 1-D series into a 2-D "image".

use crate::data::DataError;
use ndarray::Array2;

/// Split `values` into consecutive non-overlapping windows of `window` points.
///
/// Row `i` holds `values[i * window..(i + 1) * window]`. A trailing chunk
/// shorter than `window` is dropped, so fewer than `window` points gives an
/// empty array of shape `(0, window)`.
pub fn split_into_windows(values: &[f64], window: usize) -> Result<Array2<f64>, DataError> {
    if window == 0 {
        return Err(DataError::InvalidWindow);
    }

    let rows = values.len() / window;
    Ok(Array2::from_shape_fn((rows, window), |(i, j)| {
        values[i * window + j]
    }))
}

/// Maximum of the series, ignoring NaN. `-inf` for an empty or all-NaN series.
pub fn peak(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Divide every value by the series maximum.
///
/// Returns `None` when there is no finite, non-zero peak to divide by.
pub fn peak_normalize(values: &[f64]) -> Option<(Vec<f64>, f64)> {
    let peak = peak(values);
    if !peak.is_finite() || peak == 0.0 {
        return None;
    }

    Some((values.iter().map(|v| v / peak).collect(), peak))
}
