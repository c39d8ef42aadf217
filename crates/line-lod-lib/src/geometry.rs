//! Geometry primitives shared by the whole pipeline
//!
//! This module provides the `Point3`, `Polyline` and `FeatureSet` types. A feature set
//! is the immutable source-of-truth geometry of one tile: it is computed once at load
//! time and every frame derives its simplified overlay from it without mutating it.

use crate::{LodError, Result};
use geo::{Coord, Rect};
use std::sync::Arc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A coordinate in the model's local reference frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Footprint of the point on the model's x/y plane
    #[inline]
    pub fn xy(&self) -> Coord<f64> {
        Coord {
            x: self.x,
            y: self.y,
        }
    }
}

impl From<[f64; 3]> for Point3 {
    #[inline]
    fn from([x, y, z]: [f64; 3]) -> Self {
        Self { x, y, z }
    }
}

impl From<(f64, f64, f64)> for Point3 {
    #[inline]
    fn from((x, y, z): (f64, f64, f64)) -> Self {
        Self { x, y, z }
    }
}

/// An ordered, non-empty path of points
///
/// Identity is positional: two polylines are only ever compared by content.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(try_from = "Vec<Point3>", into = "Vec<Point3>")
)]
pub struct Polyline {
    points: Vec<Point3>,
}

impl Polyline {
    /// Create a polyline, failing if `points` is empty
    pub fn new(points: Vec<Point3>) -> Result<Self> {
        if points.is_empty() {
            return Err(LodError::EmptyPolyline);
        }
        Ok(Self { points })
    }

    /// Two-point polyline (a single line segment)
    #[inline]
    pub fn segment(a: Point3, b: Point3) -> Self {
        Self { points: vec![a, b] }
    }

    /// Build from points already known to be non-empty
    #[inline]
    pub(crate) fn from_non_empty(points: Vec<Point3>) -> Self {
        debug_assert!(!points.is_empty());
        Self { points }
    }

    #[inline]
    pub fn points(&self) -> &[Point3] {
        &self.points
    }

    #[inline]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn first(&self) -> Point3 {
        self.points[0]
    }

    #[inline]
    pub fn last(&self) -> Point3 {
        self.points[self.points.len() - 1]
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Point3> {
        self.points.iter()
    }
}

impl TryFrom<Vec<Point3>> for Polyline {
    type Error = LodError;

    fn try_from(points: Vec<Point3>) -> Result<Self> {
        Self::new(points)
    }
}

impl From<Polyline> for Vec<Point3> {
    fn from(polyline: Polyline) -> Self {
        polyline.points
    }
}

impl<'a> IntoIterator for &'a Polyline {
    type Item = &'a Point3;
    type IntoIter = std::slice::Iter<'a, Point3>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

/// The ordered polylines extracted from one tile
///
/// Cloning is O(1): the features are shared and never mutated after extraction.
#[derive(Clone, Debug, Default)]
pub struct FeatureSet {
    features: Arc<[Polyline]>,
    /// Cached total number of points (computed once during construction)
    cached_vertex_count: usize,
    /// Cached x/y footprint (None if empty)
    cached_bounding_box: Option<Rect<f64>>,
}

impl FeatureSet {
    pub fn new(features: Vec<Polyline>) -> Self {
        let mut vertex_count = 0;
        let mut min = Coord {
            x: f64::INFINITY,
            y: f64::INFINITY,
        };
        let mut max = Coord {
            x: f64::NEG_INFINITY,
            y: f64::NEG_INFINITY,
        };

        for polyline in &features {
            vertex_count += polyline.point_count();
            for point in polyline {
                min.x = min.x.min(point.x);
                min.y = min.y.min(point.y);
                max.x = max.x.max(point.x);
                max.y = max.y.max(point.y);
            }
        }

        let bounding_box = (min.x <= max.x && min.y <= max.y).then(|| Rect::new(min, max));

        Self {
            features: features.into(),
            cached_vertex_count: vertex_count,
            cached_bounding_box: bounding_box,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    #[inline]
    pub fn features(&self) -> &[Polyline] {
        &self.features
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Polyline> {
        self.features.iter()
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Polyline> {
        self.features.get(index)
    }

    /// Total number of points across all features
    ///
    /// This is O(1) as the value is cached during construction.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.cached_vertex_count
    }

    /// Bounding box of all points on the x/y plane
    #[inline]
    pub fn bounding_box(&self) -> Option<Rect<f64>> {
        self.cached_bounding_box
    }
}

impl From<Vec<Polyline>> for FeatureSet {
    fn from(features: Vec<Polyline>) -> Self {
        Self::new(features)
    }
}

impl<'a> IntoIterator for &'a FeatureSet {
    type Item = &'a Polyline;
    type IntoIter = std::slice::Iter<'a, Polyline>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
