use clap::{Parser, ValueEnum};
use line_lod_lib::{LodConfig, LodCurve, PipelineConfig, WidthConfig};

use crate::app::tileset::TilesetLayout;

/// Interpolation curve of the automatic LOD
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurveArg {
    Linear,
    Logarithmic,
}

impl From<CurveArg> for LodCurve {
    fn from(curve: CurveArg) -> Self {
        match curve {
            CurveArg::Linear => LodCurve::Linear,
            CurveArg::Logarithmic => LodCurve::Logarithmic,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Line LOD Viewer - Streams a tileset and draws camera-dependent simplified line overlays
pub struct Settings {
    /// Number of tiles along each side of the demo tileset
    #[clap(long, default_value = "16")]
    pub grid_size: u32,

    /// Side length of a tile in meters
    #[clap(long, default_value = "50000")]
    pub tile_size: f64,

    /// Line features generated per tile
    #[clap(long, default_value = "40")]
    pub features_per_tile: usize,

    /// Points per generated line feature
    #[clap(long, default_value = "200")]
    pub points_per_feature: usize,

    /// Seed for the generated line shapes
    #[clap(long, default_value = "7")]
    pub seed: u64,

    /// Maximum number of loaded tiles kept in memory
    #[clap(long, default_value = "512")]
    pub tile_cache_capacity: usize,

    /// Camera height (meters) at or below which full detail is drawn
    #[clap(long, default_value = "2000")]
    pub lod_near_height: f64,

    /// Camera height (meters) at or above which the minimum LOD factor is used
    #[clap(long, default_value = "4000000")]
    pub lod_far_height: f64,

    /// Lowest LOD factor (range: 0-1]
    #[clap(long, default_value = "0.05")]
    pub lod_min_factor: f64,

    /// LOD interpolation curve between the near and far heights
    #[clap(long, value_enum, default_value = "linear")]
    pub lod_curve: CurveArg,

    /// Start in manual LOD mode with this factor
    #[clap(long, value_name = "FACTOR", conflicts_with = "auto_lod")]
    pub lod: Option<f64>,

    /// Start in automatic LOD mode, even if manual mode was persisted
    #[clap(long, default_value = "false")]
    pub auto_lod: bool,

    /// Line width in pixels close to the ground
    #[clap(long, default_value = "5.0")]
    pub min_line_width: f32,

    /// Line width in pixels at high altitude
    #[clap(long, default_value = "18.0")]
    pub max_line_width: f32,

    /// Camera height (meters) below which the minimum line width is used
    #[clap(long, default_value = "2000")]
    pub width_near_height: f64,

    /// Camera height (meters) above which the maximum line width is used
    #[clap(long, default_value = "4000000")]
    pub width_far_height: f64,

    /// Draw every feature instead of an evenly spaced subset
    #[clap(long, default_value = "false")]
    pub no_filter: bool,

    /// Draw features with all their points
    #[clap(long, default_value = "false")]
    pub no_simplify: bool,

    /// Ignore previously persisted state and start fresh
    #[clap(long, default_value = "false")]
    pub ignore_persisted: bool,
}

impl Settings {
    /// Parse the command line, exiting with usage on error
    pub fn from_cli() -> Self {
        match Settings::try_parse() {
            Ok(args) => args,
            Err(e) => e.exit(),
        }
    }

    pub fn lod_config(&self) -> LodConfig {
        LodConfig {
            near_height: self.lod_near_height,
            far_height: self.lod_far_height,
            min_factor: self.lod_min_factor,
            max_factor: 1.0,
            curve: self.lod_curve.into(),
        }
    }

    pub fn width_config(&self) -> WidthConfig {
        WidthConfig {
            near_height: self.width_near_height,
            far_height: self.width_far_height,
            min_width: self.min_line_width,
            max_width: self.max_line_width,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            filter_features: !self.no_filter,
            simplify_lines: !self.no_simplify,
            ..PipelineConfig::default()
        }
    }

    pub fn tileset_layout(&self) -> TilesetLayout {
        TilesetLayout {
            grid_size: self.grid_size,
            tile_size: self.tile_size,
            features_per_tile: self.features_per_tile,
            points_per_feature: self.points_per_feature,
            seed: self.seed,
        }
    }
}
