#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // hide console window on Windows in release

use line_lod_viewer::{LineLodViewerApp, Settings, logging};

fn main() {
    logging::setup_logging();

    let settings = Settings::from_cli();

    // Tile loading runs on the runtime while eframe owns the main thread
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };
    let handle = rt.handle().clone();

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_title("Line LOD Viewer"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Line LOD Viewer",
        native_options,
        Box::new(move |cc| Ok(Box::new(LineLodViewerApp::new(cc, settings, handle)))),
    );

    if let Err(e) = result {
        tracing::error!("Viewer exited with error: {}", e);
        std::process::exit(1);
    }
}
