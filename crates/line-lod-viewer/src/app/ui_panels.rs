//! UI panels for the application
//!
//! The sidebar holds the LOD controls and the live statistics; the toggle button is
//! overlaid on the top-right corner of the view.

use crate::app::state::{AppState, SidebarTab, format_number_with_commas};
use egui::{Color32, RichText, Ui};
use line_lod_lib::LodMode;

/// Render the sidebar toggle button (overlaid on top-right of the view)
pub fn sidebar_toggle_button(ui: &mut Ui, state: &mut AppState) {
    let button_size = egui::vec2(40.0, 40.0);
    let margin = 10.0;

    let rect = ui.max_rect();
    let button_pos = rect.right_top() + egui::vec2(-button_size.x - margin, margin);
    let button_rect = egui::Rect::from_min_size(button_pos, button_size);

    let response = ui.allocate_rect(button_rect, egui::Sense::click());

    if response.clicked() {
        state.ui_settings.sidebar_open = !state.ui_settings.sidebar_open;
    }

    let bg_color = if response.hovered() {
        ui.visuals().widgets.hovered.bg_fill
    } else {
        ui.visuals().widgets.inactive.bg_fill
    };

    ui.painter().rect_filled(button_rect, 5.0, bg_color);

    let icon = if state.ui_settings.sidebar_open {
        "✕"
    } else {
        "☰"
    };

    ui.painter().text(
        button_rect.center(),
        egui::Align2::CENTER_CENTER,
        icon,
        egui::FontId::proportional(20.0),
        ui.visuals().text_color(),
    );
}

/// Render the main sidebar (responsive: side on landscape, bottom on portrait)
pub fn render_sidebar(ctx: &egui::Context, state: &mut AppState) {
    if !state.ui_settings.sidebar_open {
        return;
    }

    let screen_size = ctx.viewport_rect().size();
    if screen_size.y > screen_size.x {
        egui::TopBottomPanel::bottom("main_sidebar")
            .default_height(280.0)
            .min_height(180.0)
            .max_height(ctx.viewport_rect().height() * 0.6)
            .resizable(true)
            .show(ctx, |ui| render_sidebar_content(ui, state));
    } else {
        egui::SidePanel::right("main_sidebar")
            .default_width(300.0)
            .min_width(260.0)
            .max_width(450.0)
            .resizable(true)
            .show(ctx, |ui| render_sidebar_content(ui, state));
    }
}

fn render_sidebar_content(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui| {
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Overlay,
            "📐 Overlay",
        );
        ui.selectable_value(
            &mut state.ui_settings.active_tab,
            SidebarTab::Statistics,
            "📊 Statistics",
        );
    });

    ui.separator();

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| match state.ui_settings.active_tab {
            SidebarTab::Overlay => render_overlay_tab(ui, state),
            SidebarTab::Statistics => render_statistics_tab(ui, state),
        });
}

/// Render the Overlay tab (LOD controls and pipeline stages)
fn render_overlay_tab(ui: &mut Ui, state: &mut AppState) {
    ui.label(RichText::new("📐 Level of Detail").strong());
    ui.add_space(6.0);

    let mut auto = state.lod.is_auto();
    if ui
        .checkbox(&mut auto, "Automatic (from camera height)")
        .changed()
    {
        state.lod.set_auto(auto);
    }

    ui.add_space(4.0);

    egui::Grid::new("lod_grid")
        .num_columns(2)
        .spacing([12.0, 8.0])
        .show(ui, |ui| {
            ui.label("Current LOD:");
            ui.label(RichText::new(format_current_lod(state)).strong());
            ui.end_row();

            ui.label("LOD Factor:");
            let response = ui.add(
                egui::TextEdit::singleline(&mut state.ui_settings.lod_input).desired_width(60.0),
            );
            if response.changed() {
                state.apply_lod_input();
            }
            if !response.has_focus() {
                state.sync_lod_input();
            }
            ui.end_row();

            ui.label("");
            let min_factor = state.lod.config().min_factor;
            let mut factor = state.lod.manual_factor();
            let slider = ui.add_enabled(
                !state.lod.is_auto(),
                egui::Slider::new(&mut factor, min_factor..=1.0).fixed_decimals(2),
            );
            if slider.changed() && state.lod.set_manual_factor(factor).is_ok() {
                state.sync_lod_input();
            }
            ui.end_row();
        });

    ui.add_space(4.0);
    ui.label(
        RichText::new("Typing a factor switches to manual mode")
            .small()
            .weak(),
    );

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("🎨 Reduction Stages").strong());
    ui.add_space(6.0);

    ui.checkbox(
        &mut state.pipeline.filter_features,
        "Filter features (drop whole lines)",
    );
    ui.checkbox(
        &mut state.pipeline.simplify_lines,
        "Simplify lines (drop points)",
    );

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("ℹ About").strong());
    ui.add_space(4.0);
    ui.label(RichText::new("Line LOD Viewer").small());
    ui.label(
        RichText::new("Camera-dependent simplification of streamed line overlays")
            .small()
            .weak(),
    );
    ui.add_space(4.0);
    ui.label(RichText::new("  Drag - Pan").small().weak());
    ui.label(RichText::new("  Scroll - Zoom").small().weak());
}

/// Render the Statistics tab
fn render_statistics_tab(ui: &mut Ui, state: &AppState) {
    ui.label(RichText::new("🎥 Current Frame").strong());
    ui.add_space(4.0);

    egui::Grid::new("frame_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("LOD:");
            ui.label(RichText::new(format!("{:.2}", state.frame.lod_factor)).strong());
            ui.end_row();

            ui.label("Line Width:");
            ui.label(RichText::new(format!("{:.1} px", state.frame.line_width)).strong());
            ui.end_row();

            ui.label("Camera Height:");
            ui.label(RichText::new(format_height(state.camera.height)).strong());
            ui.end_row();
        });

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("📊 Rendered (updated every second)").strong());
    ui.add_space(4.0);

    let display = &state.display;
    egui::Grid::new("stats_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("FPS:");
            let fps_color = if display.fps >= 55 {
                Color32::GREEN
            } else if display.fps >= 25 {
                Color32::YELLOW
            } else {
                Color32::RED
            };
            ui.label(RichText::new(format!("{}", display.fps)).color(fps_color));
            ui.end_row();

            ui.label("Vertices:");
            ui.label(
                RichText::new(format!(
                    "{} ({} reduced)",
                    display.format_vertices(),
                    display.format_reduction()
                ))
                .strong(),
            );
            ui.end_row();

            ui.label("Features:");
            ui.label(RichText::new(display.format_features()).strong());
            ui.end_row();

            ui.label("Tiles Drawn:");
            ui.label(RichText::new(format!("{}", display.tiles_rendered)).strong());
            ui.end_row();
        });

    ui.add_space(12.0);
    ui.separator();
    ui.add_space(8.0);

    ui.label(RichText::new("🗺 Tiles").strong());
    ui.add_space(4.0);

    let cache = state.tileset.cache();
    egui::Grid::new("tiles_grid")
        .num_columns(2)
        .spacing([12.0, 4.0])
        .show(ui, |ui| {
            ui.label("Selected:");
            ui.label(RichText::new(format!("{}", state.selected.len())).strong());
            ui.end_row();

            ui.label("Loaded:");
            ui.label(RichText::new(format!("{}", cache.loaded_len())).strong());
            ui.end_row();

            ui.label("Overlays:");
            ui.label(RichText::new(format!("{}", state.scene.len())).strong());
            ui.end_row();

            ui.label("Loaded Points:");
            ui.label(
                RichText::new(format_number_with_commas(state.store.total_vertices())).strong(),
            );
            ui.end_row();

            ui.label("Loading:");
            ui.label(RichText::new(format!("{}", cache.pending_len())).strong());
            ui.end_row();

            if cache.failed_len() > 0 {
                ui.label("Failed:");
                ui.label(
                    RichText::new(format!("{}", cache.failed_len()))
                        .color(ui.visuals().warn_fg_color),
                );
                ui.end_row();
            }
        });
}

/// LOD factor of this frame together with the mode that decided it
fn format_current_lod(state: &AppState) -> String {
    let mode = match state.lod.mode() {
        LodMode::Auto => "auto",
        LodMode::Manual => "manual",
    };
    format!("{:.2} ({})", state.frame.lod_factor, mode)
}

/// Format a height in meters as human-readable string
fn format_height(meters: f64) -> String {
    if meters < 1_000.0 {
        format!("{:.0} m", meters)
    } else if meters < 100_000.0 {
        format!("{:.2} km", meters / 1_000.0)
    } else {
        format!("{:.0} km", meters / 1_000.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_current_lod_names_mode() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .build()
            .unwrap();
        let settings = crate::app::settings::Settings::parse_from(["line-lod-viewer"]);
        let mut state = AppState::new(&settings, runtime.handle());
        state.camera.set_height(100.0);
        state.begin_frame();
        assert_eq!(format_current_lod(&state), "1.00 (auto)");

        state.ui_settings.lod_input = "0.4".to_string();
        state.apply_lod_input();
        state.begin_frame();
        assert_eq!(format_current_lod(&state), "0.40 (manual)");
    }

    #[test]
    fn test_format_height() {
        assert_eq!(format_height(512.4), "512 m");
        assert_eq!(format_height(2_500.0), "2.50 km");
        assert_eq!(format_height(4_000_000.0), "4000 km");
    }
}
