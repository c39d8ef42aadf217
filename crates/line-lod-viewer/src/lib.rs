//! Line LOD Viewer - Application Library
//!
//! This is the application crate that drives the LOD pipeline of `line-lod-lib`
//! every frame: it streams tiles from a tileset, keeps their features in an overlay
//! store and paints the simplified overlays under a movable camera.

mod app;
pub mod logging;

pub use app::LineLodViewerApp;
pub use app::settings::Settings;
