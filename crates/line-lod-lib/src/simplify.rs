//! Uniform polyline decimation
//!
//! A polyline of `n` points is reduced to `max(2, ceil(n * factor))` points picked at
//! an even stride. The first and last points are always kept so that lines meeting at
//! tile or feature boundaries keep meeting after simplification. No point is ever
//! moved or invented: the output is a subsequence of the input.

use crate::Polyline;

/// Map any factor onto `[0, 1]`; NaN means "keep everything"
#[inline]
fn sanitize_factor(factor: f64) -> f64 {
    if factor.is_nan() {
        1.0
    } else {
        factor.clamp(0.0, 1.0)
    }
}

/// Number of points to keep for a polyline of `len` points
///
/// Never below 2, so a simplified line always keeps both endpoints.
#[inline]
pub fn target_point_count(len: usize, factor: f64) -> usize {
    let factor = sanitize_factor(factor);
    ((len as f64 * factor).ceil() as usize).max(2)
}

/// Indices of the points kept for a polyline of `len` points
///
/// Strictly increasing, starting at 0 and ending at `len - 1` whenever `len > 0`.
pub fn simplified_indices(len: usize, factor: f64) -> Vec<usize> {
    let target = target_point_count(len, factor);
    if len <= 2 || target >= len {
        return (0..len).collect();
    }

    let last = len - 1;
    let step = last as f64 / (target - 1) as f64;

    (0..target)
        .map(|i| {
            if i == 0 {
                0
            } else if i == target - 1 {
                last
            } else {
                ((i as f64 * step).round() as usize).min(last)
            }
        })
        .collect()
}

/// Simplify a polyline for the given LOD factor
///
/// Deterministic, and a no-op when the factor keeps every point or the polyline has
/// at most two points.
pub fn simplify_polyline(polyline: &Polyline, factor: f64) -> Polyline {
    let points = polyline.points();
    let indices = simplified_indices(points.len(), factor);
    if indices.len() == points.len() {
        return polyline.clone();
    }

    Polyline::from_non_empty(indices.into_iter().map(|i| points[i]).collect())
}
