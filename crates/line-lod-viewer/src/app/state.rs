//! Application state management
//!
//! This module owns everything the viewer keeps between frames: the LOD controller,
//! the camera, the streamed tileset and the overlay store with its scene.

use crate::app::camera::Camera;
use crate::app::scene::{OverlayHandle, PainterScene};
use crate::app::settings::Settings;
use crate::app::tileset::{DemoTileset, TileEvent, TileId};
use line_lod_lib::{
    FrameContext, FrameStats, LodConfig, LodController, OverlayStore, PipelineConfig,
    WidthConfig, extract_many,
};
use std::time::Duration;

/// Main application state
pub struct AppState {
    /// Owner of the LOD factor (auto or manual)
    pub lod: LodController,

    /// Camera height to line width
    pub width: WidthConfig,

    /// Enabled reduction stages
    pub pipeline: PipelineConfig,

    pub camera: Camera,

    /// Streamed tiles and their cache bookkeeping
    pub tileset: DemoTileset,

    /// Per-tile features and overlay handles
    pub store: OverlayStore<TileId, OverlayHandle>,

    /// Retained overlay primitives
    pub scene: PainterScene,

    /// Tiles intersecting the viewport this frame
    pub selected: Vec<TileId>,

    /// Values resolved for the last rebuilt frame
    pub frame: FrameContext,

    /// Counters of the last rebuilt frame
    pub last_stats: FrameStats,

    /// Once-per-second counters shown in the sidebar
    pub display: DisplayStats,

    pub counter: FrameCounter,

    pub ui_settings: UiSettings,
}

/// UI-specific settings that can be adjusted at runtime
#[derive(Clone, Debug)]
pub struct UiSettings {
    /// Text of the manual LOD input
    pub lod_input: String,

    /// Whether sidebar is open
    pub sidebar_open: bool,

    /// Current active tab in sidebar
    pub active_tab: SidebarTab,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            lod_input: format_factor(1.0),
            sidebar_open: true,
            active_tab: SidebarTab::Overlay,
        }
    }
}

/// Sidebar tabs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SidebarTab {
    Overlay,
    Statistics,
}

/// Counters published once per second
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DisplayStats {
    pub fps: u32,
    pub vertices: usize,
    pub features: usize,
    pub tiles_rendered: usize,
    /// Share of source points not drawn, in `[0, 1]`
    pub vertex_reduction: f64,
}

impl DisplayStats {
    pub fn format_vertices(&self) -> String {
        format_number_with_commas(self.vertices)
    }

    pub fn format_features(&self) -> String {
        format_number_with_commas(self.features)
    }

    pub fn format_reduction(&self) -> String {
        format!("{:.1}%", self.vertex_reduction * 100.0)
    }
}

/// Frame rate counter with a fixed publishing cadence
#[derive(Debug, Default)]
pub struct FrameCounter {
    window_start: Option<instant::Instant>,
    frames: u32,
}

impl FrameCounter {
    pub const PUBLISH_INTERVAL: Duration = Duration::from_secs(1);

    /// Count one finished frame
    ///
    /// Once a full interval has passed since the last publication, returns the
    /// counters of `latest` together with the frame rate of that interval.
    pub fn tick(&mut self, now: instant::Instant, latest: &FrameStats) -> Option<DisplayStats> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };

        self.frames += 1;
        let elapsed = now.saturating_duration_since(start);
        if elapsed < Self::PUBLISH_INTERVAL {
            return None;
        }

        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        let fps = (f64::from(self.frames) * 1000.0 / elapsed_ms).round() as u32;
        self.frames = 0;
        self.window_start = Some(now);

        Some(DisplayStats {
            fps,
            vertices: latest.vertices_rendered,
            features: latest.features_rendered,
            tiles_rendered: latest.tiles_rendered,
            vertex_reduction: latest.vertex_reduction(),
        })
    }
}

impl AppState {
    /// Build the state from command line settings and start the tile loader
    pub fn new(settings: &Settings, runtime: &tokio::runtime::Handle) -> Self {
        let lod_config = settings.lod_config();
        let lod_config = match lod_config.validate() {
            Ok(()) => lod_config,
            Err(e) => {
                tracing::error!("{}, using default LOD settings", e);
                LodConfig::default()
            }
        };
        let width = settings.width_config();
        let width = match width.validate() {
            Ok(()) => width,
            Err(e) => {
                tracing::error!("{}, using default line widths", e);
                WidthConfig::default()
            }
        };

        let mut lod = LodController::new(lod_config);
        if let Some(factor) = settings.lod {
            lod = lod.with_manual_factor(factor);
        }

        let layout = settings.tileset_layout();
        let center = layout.bounds().center();
        tracing::info!(
            "Starting {}x{} tileset ({} features x {} points per tile)",
            layout.grid_size,
            layout.grid_size,
            layout.features_per_tile,
            layout.points_per_feature
        );
        let tileset = DemoTileset::spawn(layout, settings.tile_cache_capacity, runtime);

        let ui_settings = UiSettings {
            lod_input: format_factor(lod.manual_factor()),
            ..UiSettings::default()
        };

        Self {
            frame: FrameContext {
                lod_factor: lod.current(),
                line_width: width.min_width,
            },
            lod,
            width,
            pipeline: settings.pipeline_config(),
            camera: Camera::looking_at(center, Camera::default().height),
            tileset,
            store: OverlayStore::new(),
            scene: PainterScene::new(),
            selected: Vec::new(),
            last_stats: FrameStats::default(),
            display: DisplayStats::default(),
            counter: FrameCounter::default(),
            ui_settings,
        }
    }

    /// Move finished tile loads into the overlay store
    ///
    /// Loaded models are extracted in parallel; tiles pushed out of the cache by the
    /// new ones are evicted from the store.
    pub fn process_tile_events(&mut self) {
        let events = self.tileset.drain_events();
        if events.is_empty() {
            return;
        }
        profiling::scope!("process_tile_events");

        let mut models = Vec::with_capacity(events.len());
        for event in events {
            match event {
                TileEvent::Loaded { id, model } => models.push((id, model)),
                TileEvent::Failed { id, .. } => self.tileset.on_failed(id),
            }
        }

        for (id, features) in extract_many(models) {
            self.store.insert_tile(id, features, &mut self.scene);
            for evicted in self.tileset.on_loaded(id) {
                self.store.evict(&evicted, &mut self.scene);
            }
        }
    }

    /// Select the tiles under `viewport` and request the missing ones
    pub fn update_selection(&mut self, viewport: egui::Rect) {
        let bounds = self.camera.visible_bounds(viewport);
        self.selected = self.tileset.layout().tiles_in(bounds);
        for evicted in self.tileset.request(&self.selected) {
            self.store.evict(&evicted, &mut self.scene);
        }
    }

    /// Resolve this frame's LOD factor and line width from the camera height
    ///
    /// Runs before any panel is drawn, so the sidebar shows the values the overlays
    /// are rebuilt with.
    pub fn begin_frame(&mut self) {
        self.frame = FrameContext::resolve(self.camera.height, &mut self.lod, &self.width);
    }

    /// Rebuild the selected overlays with the values resolved for this frame
    pub fn rebuild_overlays(&mut self) -> FrameStats {
        self.last_stats = self.store.rebuild_frame(
            self.selected.iter(),
            &self.frame,
            &self.pipeline,
            &mut self.scene,
        );
        self.last_stats
    }

    /// Count the finished frame and publish the counters when due
    pub fn end_frame(&mut self, now: instant::Instant) {
        if let Some(display) = self.counter.tick(now, &self.last_stats) {
            self.display = display;
        }
    }

    /// Apply the manual LOD input text, ignoring text that is not a number
    pub fn apply_lod_input(&mut self) {
        if self.lod.set_manual_input(&self.ui_settings.lod_input).is_ok() {
            self.lod.set_auto(false);
        }
    }

    /// Mirror the controller's manual factor into the input text
    pub fn sync_lod_input(&mut self) {
        self.ui_settings.lod_input = format_factor(self.lod.manual_factor());
    }
}

/// LOD factor as shown in the text input
pub fn format_factor(factor: f64) -> String {
    format!("{:.2}", factor)
}

/// Helper to format numbers with comma separators
pub fn format_number_with_commas(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result.chars().rev().collect()
}
