//! Logging setup for the viewer
//!
//! Installs a `tracing` subscriber filtered by `RUST_LOG`. When the variable is not
//! set a sensible default is used instead. With the `profiling` feature the
//! `profiling` scopes of both crates are emitted as tracing spans.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Default filter for debug builds
const DEBUG_FILTER: &str = "debug,eframe=warn,egui=warn,wgpu=warn,naga=warn,line_lod_lib=info";

/// Default filter for release builds
const RELEASE_FILTER: &str = "info,eframe=warn,egui=warn,wgpu=warn,naga=warn";

/// Initialize the global tracing subscriber
///
/// Safe to call more than once; later calls are ignored.
pub fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cfg!(debug_assertions) {
            DEBUG_FILTER
        } else {
            RELEASE_FILTER
        })
    });

    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter);

    if tracing_subscriber::registry().with(fmt_layer).try_init().is_err() {
        tracing::debug!("Logging already initialized");
        return;
    }

    tracing::info!("Logging initialized");
}
