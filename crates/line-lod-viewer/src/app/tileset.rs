//! Procedural tileset streamed from a background loader
//!
//! Tiles form a square grid on the ground plane. Each tile decodes into a
//! [`DecodedModel`] holding wavy line strips, a border drawn as indexed line segments
//! and a point marker. Generation runs on tokio's blocking pool and the results come
//! back to the UI thread as [`TileEvent`]s.

use geo::{Coord, Intersects, Rect};
use line_lod_lib::{DecodedModel, Mesh, Primitive, PrimitiveMode, SceneNode};
use lru::LruCache;
use std::collections::HashSet;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId {
    pub x: u32,
    pub y: u32,
}

impl TileId {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TileError {
    #[error("Tile {id} is outside the {grid_size}x{grid_size} grid")]
    OutOfBounds { id: TileId, grid_size: u32 },

    #[error("Tile loader stopped")]
    LoaderClosed,

    #[error("Tile generation failed: {0}")]
    Generation(String),
}

/// Outcome of one tile request
#[derive(Debug)]
pub enum TileEvent {
    Loaded { id: TileId, model: DecodedModel },
    Failed { id: TileId, error: TileError },
}

/// Geometry and content parameters of the procedural tileset
#[derive(Clone, Debug, PartialEq)]
pub struct TilesetLayout {
    /// Tiles per side
    pub grid_size: u32,
    /// Tile side length in meters
    pub tile_size: f64,
    pub features_per_tile: usize,
    pub points_per_feature: usize,
    pub seed: u64,
}

impl TilesetLayout {
    /// Ground rectangle covered by the whole tileset
    pub fn bounds(&self) -> Rect<f64> {
        let side = f64::from(self.grid_size) * self.tile_size;
        Rect::new(Coord { x: 0.0, y: 0.0 }, Coord { x: side, y: side })
    }

    pub fn contains(&self, id: TileId) -> bool {
        id.x < self.grid_size && id.y < self.grid_size
    }

    pub fn tile_bounds(&self, id: TileId) -> Rect<f64> {
        let min = Coord {
            x: f64::from(id.x) * self.tile_size,
            y: f64::from(id.y) * self.tile_size,
        };
        Rect::new(
            min,
            Coord {
                x: min.x + self.tile_size,
                y: min.y + self.tile_size,
            },
        )
    }

    /// Tiles whose bounds intersect `view`, row by row
    pub fn tiles_in(&self, view: Rect<f64>) -> Vec<TileId> {
        if self.grid_size == 0 || !self.bounds().intersects(&view) {
            return Vec::new();
        }

        let last = self.grid_size - 1;
        let index = |v: f64| ((v / self.tile_size).floor().max(0.0) as u32).min(last);
        let (min, max) = (view.min(), view.max());

        let mut tiles = Vec::new();
        for y in index(min.y)..=index(max.y) {
            for x in index(min.x)..=index(max.x) {
                let id = TileId::new(x, y);
                if self.tile_bounds(id).intersects(&view) {
                    tiles.push(id);
                }
            }
        }
        tiles
    }

    /// Decode the content of one tile
    ///
    /// Line strips of horizontally adjacent tiles join up because their shape only
    /// depends on the global row and the world x coordinate.
    pub fn generate_model(&self, id: TileId) -> Result<DecodedModel, TileError> {
        if !self.contains(id) {
            return Err(TileError::OutOfBounds {
                id,
                grid_size: self.grid_size,
            });
        }

        let bounds = self.tile_bounds(id);
        let (min, max) = (bounds.min(), bounds.max());
        let rows = self.features_per_tile.max(1) as f64;
        let amplitude = self.tile_size / (rows * 3.0);
        let samples = self.points_per_feature.max(2);

        let strips = (0..self.features_per_tile)
            .map(|feature| {
                let row = u64::from(id.y) * self.features_per_tile as u64 + feature as u64;
                let wave = Wave::for_row(self.seed, row, self.tile_size);
                let base_y = min.y + (feature as f64 + 0.5) / rows * self.tile_size;
                let positions = (0..samples)
                    .flat_map(|i| {
                        let x = min.x + self.tile_size * i as f64 / (samples - 1) as f64;
                        let y = base_y + amplitude * wave.at(x);
                        [x as f32, y as f32, 0.0]
                    })
                    .collect();
                Primitive::line_strip(positions)
            })
            .collect();

        #[rustfmt::skip]
        let corners = vec![
            min.x as f32, min.y as f32, 0.0,
            max.x as f32, min.y as f32, 0.0,
            max.x as f32, max.y as f32, 0.0,
            min.x as f32, max.y as f32, 0.0,
        ];
        let border = Primitive::lines(corners).with_indices(vec![0, 1, 1, 2, 2, 3, 3, 0]);
        let center = bounds.center();
        let marker = Primitive::new(
            PrimitiveMode::Points,
            vec![center.x as f32, center.y as f32, 0.0],
        );

        let root = SceneNode::default()
            .with_mesh(Mesh::new(strips))
            .with_child(SceneNode::default().with_mesh(Mesh::new(vec![border, marker])));
        Ok(DecodedModel::new(root))
    }
}

/// Two overlaid sines with per-row frequencies and phases
struct Wave {
    frequencies: [f64; 2],
    phases: [f64; 2],
}

impl Wave {
    fn for_row(seed: u64, row: u64, tile_size: f64) -> Self {
        let r = |salt: u64| unit(seed ^ salt, row);
        let tau = std::f64::consts::TAU;
        Self {
            frequencies: [
                tau / (tile_size * (0.4 + r(1))),
                tau / (tile_size * (0.05 + 0.1 * r(2))),
            ],
            phases: [tau * r(3), tau * r(4)],
        }
    }

    /// Offset in `[-1, 1]`
    fn at(&self, x: f64) -> f64 {
        0.8 * (x * self.frequencies[0] + self.phases[0]).sin()
            + 0.2 * (x * self.frequencies[1] + self.phases[1]).sin()
    }
}

fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Deterministic value in `[0, 1)`
fn unit(seed: u64, value: u64) -> f64 {
    (mix(seed ^ mix(value)) >> 11) as f64 / (1u64 << 53) as f64
}

/// Bookkeeping of which tiles are loaded, in flight or broken
///
/// Loaded tiles are kept in LRU order. Once more tiles are loaded than the capacity
/// allows, the least recently selected ones are evicted, but never a tile of the
/// current selection: a selection larger than the capacity grows the cache instead.
pub struct TileCache {
    capacity: NonZeroUsize,
    loaded: LruCache<TileId, ()>,
    selected: HashSet<TileId>,
    pending: HashSet<TileId>,
    failed: HashSet<TileId>,
}

impl TileCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            loaded: LruCache::unbounded(),
            selected: HashSet::new(),
            pending: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    /// Make `selected` the current selection and return the tiles that must be requested
    ///
    /// Selected tiles are marked as recently used. Returned tiles are marked pending,
    /// so they are requested only once.
    pub fn request_missing<'a, I>(&mut self, selected: I) -> Vec<TileId>
    where
        I: IntoIterator<Item = &'a TileId>,
    {
        self.selected.clear();
        let mut missing = Vec::new();
        for id in selected {
            self.selected.insert(*id);
            if self.loaded.get(id).is_some() {
                continue;
            }
            if self.pending.contains(id) || self.failed.contains(id) {
                continue;
            }
            self.pending.insert(*id);
            missing.push(*id);
        }
        missing
    }

    /// Record a loaded tile, returning the tiles evicted to make room for it
    pub fn on_loaded(&mut self, id: TileId) -> Vec<TileId> {
        self.pending.remove(&id);
        self.loaded.put(id, ());
        self.evict_over_capacity()
    }

    /// Evict unselected tiles, oldest first, until the cache fits its capacity
    pub fn evict_over_capacity(&mut self) -> Vec<TileId> {
        let mut evicted = Vec::new();
        while self.loaded.len() > self.capacity.get() {
            let Some(oldest) = self.loaded.peek_lru().map(|(id, ())| *id) else {
                break;
            };
            // Selected tiles are the most recently used, so the rest are too
            if self.selected.contains(&oldest) {
                break;
            }
            self.loaded.pop_lru();
            evicted.push(oldest);
        }
        evicted
    }

    /// Record a failed tile; it will not be requested again
    pub fn on_failed(&mut self, id: TileId) {
        self.pending.remove(&id);
        self.failed.insert(id);
    }

    /// Forget a pending request that never reached the loader
    pub fn cancel(&mut self, id: TileId) {
        self.pending.remove(&id);
    }

    pub fn loaded_len(&self) -> usize {
        self.loaded.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn failed_len(&self) -> usize {
        self.failed.len()
    }
}

/// Tileset whose tiles are generated in the background on demand
pub struct DemoTileset {
    layout: Arc<TilesetLayout>,
    requests: mpsc::UnboundedSender<TileId>,
    events: mpsc::UnboundedReceiver<TileEvent>,
    cache: TileCache,
}

impl DemoTileset {
    /// Start the loader task on `runtime`
    ///
    /// The loader stops once the tileset is dropped.
    pub fn spawn(
        layout: TilesetLayout,
        cache_capacity: usize,
        runtime: &tokio::runtime::Handle,
    ) -> Self {
        let layout = Arc::new(layout);
        let (requests, mut request_rx) = mpsc::unbounded_channel::<TileId>();
        let (event_tx, events) = mpsc::unbounded_channel();

        let loader_layout = layout.clone();
        runtime.spawn(async move {
            while let Some(id) = request_rx.recv().await {
                let layout = loader_layout.clone();
                let event_tx = event_tx.clone();
                tokio::spawn(async move {
                    let result = tokio::task::spawn_blocking(move || layout.generate_model(id));
                    let event = match result.await {
                        Ok(Ok(model)) => TileEvent::Loaded { id, model },
                        Ok(Err(error)) => TileEvent::Failed { id, error },
                        Err(e) => TileEvent::Failed {
                            id,
                            error: TileError::Generation(e.to_string()),
                        },
                    };
                    if let TileEvent::Failed { id, error } = &event {
                        tracing::error!("Tile {} failed to load: {}", id, error);
                    }
                    // The receiver is gone only during shutdown
                    let _ = event_tx.send(event);
                });
            }
            tracing::debug!("Tile loader stopped");
        });

        Self {
            layout,
            requests,
            events,
            cache: TileCache::new(cache_capacity),
        }
    }

    #[inline]
    pub fn layout(&self) -> &TilesetLayout {
        &self.layout
    }

    #[inline]
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Request every selected tile that is neither loaded nor in flight
    ///
    /// Returns the tiles evicted because the selection shrank.
    pub fn request(&mut self, selected: &[TileId]) -> Vec<TileId> {
        for id in self.cache.request_missing(selected) {
            if self.requests.send(id).is_err() {
                tracing::error!("Cannot request tile {}: {}", id, TileError::LoaderClosed);
                self.cache.cancel(id);
            }
        }
        self.cache.evict_over_capacity()
    }

    /// Take all events that arrived since the last call
    pub fn drain_events(&mut self) -> Vec<TileEvent> {
        let mut drained = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            drained.push(event);
        }
        drained
    }

    /// Record a loaded tile, returning the tiles it evicted
    pub fn on_loaded(&mut self, id: TileId) -> Vec<TileId> {
        self.cache.on_loaded(id)
    }

    pub fn on_failed(&mut self, id: TileId) {
        self.cache.on_failed(id);
    }
}
