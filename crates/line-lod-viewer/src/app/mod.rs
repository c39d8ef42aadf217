//! Application module
//!
//! This module provides the main application structure:
//! - Full-screen top-down view of the streamed tileset with drag/scroll navigation
//! - Per-frame LOD overlay rebuild for the visible tiles
//! - Toggleable sidebar with LOD controls and statistics
//! - Responsive layout (sidebar from bottom on portrait displays)

mod camera;
mod scene;
pub(crate) mod settings;
mod state;
mod tileset;
mod ui_panels;

use crate::app::settings::Settings;
use crate::app::state::{AppState, SidebarTab};
use eframe::egui;

const PERSISTED_SETTINGS_KEY: &str = "persisted_settings";

/// Persisted settings (lightweight, no geometry)
#[derive(serde::Serialize, serde::Deserialize)]
struct PersistedSettings {
    auto_lod: bool,
    manual_lod: f64,
    filter_features: bool,
    simplify_lines: bool,
    sidebar_open: bool,
    active_tab: String,
}

/// Main application structure
pub struct LineLodViewerApp {
    /// Application state (LOD, camera, tiles, overlays)
    state: AppState,
}

impl LineLodViewerApp {
    /// Create the app; tiles are generated on `runtime`
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: Settings,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let mut state = AppState::new(&settings, &runtime);

        if settings.ignore_persisted {
            tracing::info!("Ignoring persisted state (--ignore-persisted flag)");
        } else if let Some(storage) = cc.storage {
            Self::restore_persisted_settings(storage, &settings, &mut state);
        }

        Self { state }
    }

    /// Apply persisted UI settings on top of the command line defaults
    ///
    /// An explicit `--lod` or `--auto-lod` wins over the persisted LOD mode.
    fn restore_persisted_settings(
        storage: &dyn eframe::Storage,
        settings: &Settings,
        state: &mut AppState,
    ) {
        let Some(json) = storage.get_string(PERSISTED_SETTINGS_KEY) else {
            tracing::info!("No persisted settings found, starting fresh");
            return;
        };
        let persisted = match serde_json::from_str::<PersistedSettings>(&json) {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!("Discarding unreadable persisted settings: {}", e);
                return;
            }
        };

        if settings.lod.is_none() && !settings.auto_lod {
            if state.lod.set_manual_factor(persisted.manual_lod).is_err() {
                tracing::warn!("Ignoring persisted LOD factor {}", persisted.manual_lod);
            }
            state.lod.set_auto(persisted.auto_lod);
            state.sync_lod_input();
        }
        state.pipeline.filter_features = persisted.filter_features && !settings.no_filter;
        state.pipeline.simplify_lines = persisted.simplify_lines && !settings.no_simplify;
        state.ui_settings.sidebar_open = persisted.sidebar_open;
        state.ui_settings.active_tab = match persisted.active_tab.as_str() {
            "Statistics" => SidebarTab::Statistics,
            _ => SidebarTab::Overlay,
        };

        tracing::info!("Restored persisted settings");
    }

    /// Apply drag and scroll input to the camera
    fn handle_navigation(&mut self, ui: &egui::Ui, response: &egui::Response) {
        let viewport = response.rect;
        if response.dragged() {
            self.state.camera.pan(response.drag_delta(), viewport);
        }
        if response.hovered() {
            // Ctrl + scroll already arrives as a zoom delta
            let (scroll, zoom) = ui.input(|i| {
                let scroll = if i.modifiers.ctrl { 0.0 } else { i.raw_scroll_delta.y };
                (scroll, i.zoom_delta())
            });
            if scroll != 0.0 {
                self.state.camera.zoom(scroll);
            }
            if zoom != 1.0 {
                let height = self.state.camera.height / f64::from(zoom);
                self.state.camera.set_height(height);
            }
        }
    }
}

#[profiling::all_functions]
impl eframe::App for LineLodViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Finished tile loads become available to this frame
        self.state.process_tile_events();
        self.state.begin_frame();

        ui_panels::render_sidebar(ctx, &mut self.state);

        // Central panel: overlay view (full screen)
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE.fill(egui::Color32::from_gray(24)))
            .show(ctx, |ui| {
                profiling::scope!("overlay_panel");

                let (response, painter) =
                    ui.allocate_painter(ui.available_size(), egui::Sense::drag());
                self.handle_navigation(ui, &response);

                let viewport = response.rect;
                self.state.update_selection(viewport);
                self.state.rebuild_overlays();
                self.state.scene.paint(&painter, &self.state.camera, viewport);

                ui_panels::sidebar_toggle_button(ui, &mut self.state);
            });

        self.state.end_frame(instant::Instant::now());

        // Tiles stream in and the FPS counter needs continuous frames
        ctx.request_repaint();
    }

    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        let settings = PersistedSettings {
            auto_lod: self.state.lod.is_auto(),
            manual_lod: self.state.lod.manual_factor(),
            filter_features: self.state.pipeline.filter_features,
            simplify_lines: self.state.pipeline.simplify_lines,
            sidebar_open: self.state.ui_settings.sidebar_open,
            active_tab: format!("{:?}", self.state.ui_settings.active_tab),
        };

        match serde_json::to_string(&settings) {
            Ok(json) => {
                storage.set_string(PERSISTED_SETTINGS_KEY, json);
                tracing::debug!("Saved settings");
            }
            Err(e) => tracing::warn!("Failed to serialize settings: {}", e),
        }
    }
}
