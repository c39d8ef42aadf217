//! Per-tile overlay ownership and the per-frame rebuild
//!
//! [`OverlayStore`] is the single owner of every tile's source features and of the
//! overlay primitive currently built from them. Each frame the overlays of the selected
//! tiles are replaced (never appended) using one shared [`FrameContext`], and evicted
//! tiles release their overlay exactly once.

use crate::{
    FeatureSet, LodController, Polyline, Result, WidthConfig, filter_features, simplify_polyline,
};
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default overlay color (opaque yellow, RGBA)
pub const DEFAULT_OVERLAY_COLOR: [u8; 4] = [255, 255, 0, 255];

/// Renderable geometry of one tile's overlay
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayGeometry {
    pub lines: Vec<Polyline>,
    /// Line width in pixels
    pub width: f32,
    /// RGBA color
    pub color: [u8; 4],
}

impl OverlayGeometry {
    /// Total number of points across all lines
    pub fn vertex_count(&self) -> usize {
        self.lines.iter().map(Polyline::point_count).sum()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Render-side collaborator that owns the actual primitives
///
/// Handles returned by [`OverlayScene::add_overlay`] are passed back to
/// [`OverlayScene::remove_overlay`] exactly once.
pub trait OverlayScene {
    type Handle;

    /// Build and add a primitive for `geometry`
    fn add_overlay(&mut self, geometry: OverlayGeometry) -> Result<Self::Handle>;

    /// Remove and free a primitive previously added
    fn remove_overlay(&mut self, handle: Self::Handle);
}

/// Which reduction stages run when building overlays
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PipelineConfig {
    /// Drop whole features according to the LOD factor
    pub filter_features: bool,
    /// Thin the points of every kept feature according to the LOD factor
    pub simplify_lines: bool,
    /// Overlay color (RGBA)
    pub color: [u8; 4],
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            filter_features: true,
            simplify_lines: true,
            color: DEFAULT_OVERLAY_COLOR,
        }
    }
}

/// Values computed once per frame and shared by every tile of that frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameContext {
    pub lod_factor: f64,
    /// Line width in pixels
    pub line_width: f32,
}

impl FrameContext {
    /// Resolve this frame's LOD factor and line width from the camera height
    pub fn resolve(camera_height: f64, lod: &mut LodController, width: &WidthConfig) -> Self {
        Self {
            lod_factor: lod.resolve(camera_height),
            line_width: width.width_for_height(camera_height),
        }
    }

    /// Reduce a tile's features into overlay geometry for this frame
    pub fn build_geometry(
        &self,
        features: &FeatureSet,
        pipeline: &PipelineConfig,
    ) -> OverlayGeometry {
        let kept: Vec<&Polyline> = if pipeline.filter_features {
            filter_features(features.features(), self.lod_factor)
        } else {
            features.iter().collect()
        };

        let lines = kept
            .into_iter()
            .map(|polyline| {
                if pipeline.simplify_lines {
                    simplify_polyline(polyline, self.lod_factor)
                } else {
                    polyline.clone()
                }
            })
            .collect();

        OverlayGeometry {
            lines,
            width: self.line_width,
            color: pipeline.color,
        }
    }
}

/// Aggregate counters of one rebuilt frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameStats {
    /// Tiles whose overlay was rebuilt this frame
    pub tiles_rendered: usize,
    /// Features drawn after filtering
    pub features_rendered: usize,
    /// Points drawn after filtering and simplification
    pub vertices_rendered: usize,
    /// Features available in the rebuilt tiles
    pub source_features: usize,
    /// Points available in the rebuilt tiles
    pub source_vertices: usize,
    /// Tiles whose overlay could not be added to the scene
    pub failed_tiles: usize,
}

impl FrameStats {
    /// Share of source points that was not drawn, in `[0, 1]`
    pub fn vertex_reduction(&self) -> f64 {
        if self.source_vertices == 0 {
            return 0.0;
        }
        1.0 - self.vertices_rendered as f64 / self.source_vertices as f64
    }
}

/// Everything the store keeps for one loaded tile
#[derive(Debug)]
pub struct TileOverlayState<H> {
    features: FeatureSet,
    overlay: Option<H>,
}

impl<H> TileOverlayState<H> {
    fn new(features: FeatureSet) -> Self {
        Self {
            features,
            overlay: None,
        }
    }

    #[inline]
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    #[inline]
    pub fn overlay(&self) -> Option<&H> {
        self.overlay.as_ref()
    }

    #[inline]
    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    /// Release the current overlay, if any. The handle is taken so it cannot be
    /// released twice.
    fn release<S: OverlayScene<Handle = H>>(&mut self, scene: &mut S) {
        if let Some(handle) = self.overlay.take() {
            scene.remove_overlay(handle);
        }
    }
}

/// Ownership table from tile id to its features and overlay
#[derive(Debug)]
pub struct OverlayStore<K, H> {
    tiles: HashMap<K, TileOverlayState<H>>,
}

impl<K, H> Default for OverlayStore<K, H> {
    fn default() -> Self {
        Self {
            tiles: HashMap::new(),
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<K: Eq + Hash + Debug, H> OverlayStore<K, H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the features of a freshly loaded tile
    ///
    /// If the tile was already known its previous overlay is released first.
    pub fn insert_tile<S: OverlayScene<Handle = H>>(
        &mut self,
        id: K,
        features: FeatureSet,
        scene: &mut S,
    ) {
        tracing::debug!(
            "Tile {:?} loaded with {} features ({} vertices)",
            id,
            features.len(),
            features.vertex_count()
        );
        if let Some(mut previous) = self.tiles.insert(id, TileOverlayState::new(features)) {
            previous.release(scene);
        }
    }

    /// Forget an unloaded tile and release its overlay
    ///
    /// Returns `false` if the tile was not known.
    pub fn evict<S: OverlayScene<Handle = H>>(&mut self, id: &K, scene: &mut S) -> bool {
        match self.tiles.remove(id) {
            Some(mut state) => {
                state.release(scene);
                tracing::debug!("Tile {:?} evicted", id);
                true
            }
            None => false,
        }
    }

    /// Rebuild the overlays of the selected tiles for this frame
    ///
    /// Selected tiles that have not been loaded are skipped, and tiles that are not
    /// selected keep their state untouched. A tile whose overlay cannot be added ends
    /// the frame without overlay; the remaining tiles are still rebuilt.
    pub fn rebuild_frame<'a, S, I>(
        &mut self,
        selected: I,
        frame: &FrameContext,
        pipeline: &PipelineConfig,
        scene: &mut S,
    ) -> FrameStats
    where
        K: 'a,
        S: OverlayScene<Handle = H>,
        I: IntoIterator<Item = &'a K>,
    {
        profiling::scope!("rebuild_frame");

        let mut stats = FrameStats::default();

        for id in selected {
            let Some(state) = self.tiles.get_mut(id) else {
                continue;
            };

            state.release(scene);

            let geometry = frame.build_geometry(&state.features, pipeline);
            let features_rendered = geometry.lines.len();
            let vertices_rendered = geometry.vertex_count();

            match scene.add_overlay(geometry) {
                Ok(handle) => {
                    state.overlay = Some(handle);
                    stats.tiles_rendered += 1;
                    stats.features_rendered += features_rendered;
                    stats.vertices_rendered += vertices_rendered;
                    stats.source_features += state.features.len();
                    stats.source_vertices += state.features.vertex_count();
                }
                Err(e) => {
                    tracing::warn!("Failed to build overlay for tile {:?}: {}", id, e);
                    stats.failed_tiles += 1;
                }
            }
        }

        tracing::trace!(
            "Frame rebuilt: lod={:.2} width={:.1} {:?}",
            frame.lod_factor,
            frame.line_width,
            stats
        );

        stats
    }

    /// Release every overlay and forget all tiles
    pub fn clear<S: OverlayScene<Handle = H>>(&mut self, scene: &mut S) {
        for (_, mut state) in self.tiles.drain() {
            state.release(scene);
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn contains(&self, id: &K) -> bool {
        self.tiles.contains_key(id)
    }

    #[inline]
    pub fn get(&self, id: &K) -> Option<&TileOverlayState<H>> {
        self.tiles.get(id)
    }

    /// Number of tiles currently holding an overlay
    pub fn overlay_count(&self) -> usize {
        self.tiles.values().filter(|state| state.has_overlay()).count()
    }

    /// Total number of source points across all loaded tiles
    pub fn total_vertices(&self) -> usize {
        self.tiles.values().map(|state| state.features.vertex_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LodConfig, LodError, Point3};
    use std::collections::HashSet;

    /// Scene that records every primitive it hands out
    #[derive(Default)]
    struct MockScene {
        next_handle: u64,
        live: HashMap<u64, OverlayGeometry>,
        removed: Vec<u64>,
        /// Reject overlays with exactly this many lines
        reject_line_count: Option<usize>,
    }

    impl OverlayScene for MockScene {
        type Handle = u64;

        fn add_overlay(&mut self, geometry: OverlayGeometry) -> Result<u64> {
            if self.reject_line_count == Some(geometry.lines.len()) {
                return Err(LodError::Scene("rejected".to_string()));
            }
            let handle = self.next_handle;
            self.next_handle += 1;
            self.live.insert(handle, geometry);
            Ok(handle)
        }

        fn remove_overlay(&mut self, handle: u64) {
            assert!(self.live.remove(&handle).is_some(), "double release");
            self.removed.push(handle);
        }
    }

    fn feature_set(features: usize, points: usize) -> FeatureSet {
        FeatureSet::new(
            (0..features)
                .map(|f| {
                    Polyline::new(
                        (0..points)
                            .map(|p| Point3::new(p as f64, f as f64, 0.0))
                            .collect(),
                    )
                    .unwrap()
                })
                .collect(),
        )
    }

    fn frame(lod_factor: f64) -> FrameContext {
        FrameContext {
            lod_factor,
            line_width: 5.0,
        }
    }

    #[test]
    fn test_rebuild_replaces_instead_of_appending() {
        let mut scene = MockScene::default();
        let mut store = OverlayStore::new();
        store.insert_tile(1u32, feature_set(4, 10), &mut scene);
        store.insert_tile(2u32, feature_set(2, 10), &mut scene);

        let pipeline = PipelineConfig::default();
        for _ in 0..100 {
            store.rebuild_frame([1, 2].iter(), &frame(0.5), &pipeline, &mut scene);
        }

        assert_eq!(scene.live.len(), 2);
        assert_eq!(scene.removed.len(), 198);
        assert_eq!(store.overlay_count(), 2);
    }

    #[test]
    fn test_frame_stats_filter_and_simplify() {
        let mut scene = MockScene::default();
        let mut store = OverlayStore::new();
        store.insert_tile("a", feature_set(10, 9), &mut scene);

        let pipeline = PipelineConfig::default();
        let stats = store.rebuild_frame(["a"].iter(), &frame(0.5), &pipeline, &mut scene);

        assert_eq!(stats.tiles_rendered, 1);
        assert_eq!(stats.features_rendered, 5);
        assert_eq!(stats.vertices_rendered, 5 * 5);
        assert_eq!(stats.source_features, 10);
        assert_eq!(stats.source_vertices, 90);
        assert!((stats.vertex_reduction() - (1.0 - 25.0 / 90.0)).abs() < 1e-12);
    }

    #[test]
    fn test_pipeline_stage_toggles() {
        let mut scene = MockScene::default();
        let mut store = OverlayStore::new();
        store.insert_tile(0u8, feature_set(10, 9), &mut scene);

        let simplify_only = PipelineConfig {
            filter_features: false,
            ..PipelineConfig::default()
        };
        let stats = store.rebuild_frame([0].iter(), &frame(0.5), &simplify_only, &mut scene);
        assert_eq!((stats.features_rendered, stats.vertices_rendered), (10, 50));

        let filter_only = PipelineConfig {
            simplify_lines: false,
            ..PipelineConfig::default()
        };
        let stats = store.rebuild_frame([0].iter(), &frame(0.5), &filter_only, &mut scene);
        assert_eq!((stats.features_rendered, stats.vertices_rendered), (5, 45));

        let none = PipelineConfig {
            filter_features: false,
            simplify_lines: false,
            ..PipelineConfig::default()
        };
        let stats = store.rebuild_frame([0].iter(), &frame(0.5), &none, &mut scene);
        assert_eq!((stats.features_rendered, stats.vertices_rendered), (10, 90));
    }

    #[test]
    fn test_empty_tile_builds_empty_overlay() {
        let mut scene = MockScene::default();
        let mut store = OverlayStore::new();
        store.insert_tile(7u32, FeatureSet::default(), &mut scene);

        let pipeline = PipelineConfig::default();
        let stats = store.rebuild_frame([7].iter(), &frame(1.0), &pipeline, &mut scene);

        assert_eq!(stats.tiles_rendered, 1);
        assert_eq!(stats.features_rendered, 0);
        assert_eq!(stats.vertices_rendered, 0);
        assert_eq!(stats.failed_tiles, 0);
        assert_eq!(scene.live.len(), 1);
        assert!(scene.live.values().all(OverlayGeometry::is_empty));
    }

    #[test]
    fn test_evict_releases_exactly_once() {
        let mut scene = MockScene::default();
        let mut store = OverlayStore::new();
        store.insert_tile(1u32, feature_set(3, 3), &mut scene);
        store.rebuild_frame([1].iter(), &frame(1.0), &PipelineConfig::default(), &mut scene);
        assert_eq!(scene.live.len(), 1);

        assert!(store.evict(&1, &mut scene));
        assert!(!store.evict(&1, &mut scene));
        assert!(scene.live.is_empty());
        assert_eq!(scene.removed.len(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_evict_without_overlay() {
        let mut scene = MockScene::default();
        let mut store: OverlayStore<u32, u64> = OverlayStore::new();
        store.insert_tile(1, feature_set(3, 3), &mut scene);
        assert!(store.evict(&1, &mut scene));
        assert!(scene.removed.is_empty());
    }

    #[test]
    fn test_unselected_and_unknown_tiles_are_skipped() {
        let mut scene = MockScene::default();
        let mut store = OverlayStore::new();
        store.insert_tile(1u32, feature_set(2, 4), &mut scene);
        store.insert_tile(2u32, feature_set(2, 4), &mut scene);
        let pipeline = PipelineConfig::default();
        store.rebuild_frame([1, 2].iter(), &frame(1.0), &pipeline, &mut scene);
        let stale = *store.get(&2).unwrap().overlay().unwrap();

        let stats = store.rebuild_frame([1, 99].iter(), &frame(1.0), &pipeline, &mut scene);

        assert_eq!(stats.tiles_rendered, 1);
        // The unselected tile keeps its previous overlay until it is evicted
        assert_eq!(store.get(&2).unwrap().overlay(), Some(&stale));
        assert!(scene.live.contains_key(&stale));
    }

    #[test]
    fn test_scene_failure_does_not_abort_frame() {
        let mut scene = MockScene {
            reject_line_count: Some(3),
            ..MockScene::default()
        };
        let mut store = OverlayStore::new();
        store.insert_tile(1u32, feature_set(2, 4), &mut scene);
        store.insert_tile(2u32, feature_set(3, 4), &mut scene);
        store.insert_tile(3u32, feature_set(4, 4), &mut scene);

        let none = PipelineConfig {
            filter_features: false,
            simplify_lines: false,
            ..PipelineConfig::default()
        };
        let stats = store.rebuild_frame([1, 2, 3].iter(), &frame(1.0), &none, &mut scene);

        assert_eq!(stats.failed_tiles, 1);
        assert_eq!(stats.tiles_rendered, 2);
        assert!(!store.get(&2).unwrap().has_overlay());
        assert!(store.get(&3).unwrap().has_overlay());
    }

    #[test]
    fn test_reinsert_releases_previous_overlay() {
        let mut scene = MockScene::default();
        let mut store = OverlayStore::new();
        store.insert_tile(1u32, feature_set(2, 4), &mut scene);
        store.rebuild_frame([1].iter(), &frame(1.0), &PipelineConfig::default(), &mut scene);

        store.insert_tile(1u32, feature_set(5, 4), &mut scene);

        assert!(scene.live.is_empty());
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(&1).unwrap().features().len(), 5);
        assert_eq!(store.total_vertices(), 5 * 4);
    }

    #[test]
    fn test_clear_releases_everything() {
        let mut scene = MockScene::default();
        let mut store = OverlayStore::new();
        let ids: HashSet<u32> = (0..5).collect();
        for id in &ids {
            store.insert_tile(*id, feature_set(1, 2), &mut scene);
        }
        store.rebuild_frame(ids.iter(), &frame(1.0), &PipelineConfig::default(), &mut scene);
        assert_eq!(scene.live.len(), 5);

        store.clear(&mut scene);
        assert!(scene.live.is_empty());
        assert!(store.is_empty());
    }

    #[test]
    fn test_frame_context_resolve() {
        let mut lod = LodController::new(LodConfig::default());
        let width = WidthConfig::default();

        let low = FrameContext::resolve(500.0, &mut lod, &width);
        assert_eq!(low.lod_factor, 1.0);
        assert_eq!(low.line_width, 5.0);

        let high = FrameContext::resolve(4_000_000.0, &mut lod, &width);
        assert_eq!(high.lod_factor, 0.05);
        assert_eq!(high.line_width, 18.0);
    }

    #[test]
    fn test_build_geometry_uses_frame_values() {
        let pipeline = PipelineConfig {
            color: [1, 2, 3, 4],
            ..PipelineConfig::default()
        };
        let geometry = frame(1.0).build_geometry(&feature_set(2, 3), &pipeline);
        assert_eq!(geometry.width, 5.0);
        assert_eq!(geometry.color, [1, 2, 3, 4]);
        assert_eq!(geometry.vertex_count(), 6);
    }
}
