//! Feature count reduction
//!
//! At coarse LOD whole features are dropped instead of (or on top of) thinning their
//! points. Retained features are borrowed untouched from the source set.

use crate::Polyline;

/// Number of features to keep out of `total`
///
/// At least one feature survives whenever there is one to keep.
#[inline]
pub fn target_feature_count(total: usize, factor: f64) -> usize {
    if total == 0 {
        return 0;
    }
    let factor = if factor.is_nan() {
        1.0
    } else {
        factor.clamp(0.0, 1.0)
    };
    ((total as f64 * factor).floor() as usize).clamp(1, total)
}

/// Evenly spaced subset of `features` for the given LOD factor
///
/// Walks the features from index 0 with a fixed stride of `total / target` and stops
/// once `target` features are collected or the input is exhausted.
pub fn filter_features(features: &[Polyline], factor: f64) -> Vec<&Polyline> {
    let target = target_feature_count(features.len(), factor);
    if target == 0 {
        return Vec::new();
    }

    let stride = (features.len() / target).max(1);
    features.iter().step_by(stride).take(target).collect()
}
