//! Camera-dependent line width

use crate::{LodError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Mapping from camera height to overlay line width
///
/// Lines get thicker as the camera climbs so that sparse, simplified overlays stay
/// visible from far away.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WidthConfig {
    /// Below this height (meters) the width is `min_width`
    pub near_height: f64,
    /// Above this height (meters) the width is `max_width`
    pub far_height: f64,
    /// Width in pixels close to the ground
    pub min_width: f32,
    /// Width in pixels at high altitude
    pub max_width: f32,
}

impl Default for WidthConfig {
    fn default() -> Self {
        Self {
            near_height: 2_000.0,
            far_height: 4_000_000.0,
            min_width: 5.0,
            max_width: 18.0,
        }
    }
}

impl WidthConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.min_width > 0.0 && self.min_width <= self.max_width) {
            return Err(LodError::InvalidConfig(format!(
                "Line widths must satisfy 0 < min <= max (got min={}, max={})",
                self.min_width, self.max_width
            )));
        }
        if !(self.near_height < self.far_height) {
            return Err(LodError::InvalidConfig(format!(
                "Width heights must satisfy near < far (got near={}, far={})",
                self.near_height, self.far_height
            )));
        }
        Ok(())
    }

    /// Line width in pixels for the given camera height
    ///
    /// Clamped linear interpolation, non-decreasing in height.
    pub fn width_for_height(&self, height: f64) -> f32 {
        if height.is_nan() || height < self.near_height {
            return self.min_width;
        }
        if height > self.far_height {
            return self.max_width;
        }

        let t = (height - self.near_height) / (self.far_height - self.near_height);
        let width = self.min_width as f64 + t * (self.max_width - self.min_width) as f64;
        (width as f32).max(self.min_width).min(self.max_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_thresholds() {
        let config = WidthConfig::default();
        assert_eq!(config.width_for_height(1_000.0), 5.0);
        assert_eq!(config.width_for_height(4_000_000.0), 18.0);
        assert_eq!(config.width_for_height(1.0e9), 18.0);
        assert_eq!(config.width_for_height(f64::NAN), 5.0);
    }

    #[test]
    fn test_width_midpoint() {
        let config = WidthConfig {
            near_height: 0.0,
            far_height: 100.0,
            min_width: 2.0,
            max_width: 4.0,
        };
        assert!((config.width_for_height(50.0) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_width_monotone_and_clamped() {
        let config = WidthConfig::default();
        let mut previous = 0.0f32;
        let mut height = 1.0;
        while height < 1.0e8 {
            let width = config.width_for_height(height);
            assert!(width >= previous);
            assert!((config.min_width..=config.max_width).contains(&width));
            previous = width;
            height *= 1.1;
        }
    }

    #[test]
    fn test_validate() {
        assert!(WidthConfig::default().validate().is_ok());
        let inverted = WidthConfig {
            min_width: 10.0,
            max_width: 1.0,
            ..WidthConfig::default()
        };
        assert!(inverted.validate().is_err());
    }
}
