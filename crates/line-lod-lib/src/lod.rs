//! LOD factor calculation and the manual/automatic LOD controller
//!
//! The LOD factor is the share of geometric detail to keep, in `[min_factor, max_factor]`.
//! [`LodConfig::factor_for_height`] is a pure function of the camera height so it can be
//! tested in isolation; [`LodController`] owns the current factor and decides, once per
//! frame, whether the calculator or the user is authoritative.

use crate::{LodError, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Interpolation curve between the near and far thresholds
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LodCurve {
    /// Linear in height
    #[default]
    Linear,
    /// Linear in log(height), dropping detail faster close to the ground
    Logarithmic,
}

/// Mapping from camera height to LOD factor
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LodConfig {
    /// At or below this height (meters) the factor is `max_factor`
    pub near_height: f64,
    /// At or above this height (meters) the factor is `min_factor`
    pub far_height: f64,
    /// Lowest factor ever produced
    pub min_factor: f64,
    /// Highest factor ever produced
    pub max_factor: f64,
    pub curve: LodCurve,
}

impl Default for LodConfig {
    fn default() -> Self {
        Self {
            near_height: 2_000.0,
            far_height: 4_000_000.0,
            min_factor: 0.05,
            max_factor: 1.0,
            curve: LodCurve::Linear,
        }
    }
}

impl LodConfig {
    /// Check that the thresholds and factors describe a valid decreasing mapping
    pub fn validate(&self) -> Result<()> {
        if !(self.min_factor > 0.0 && self.min_factor <= self.max_factor && self.max_factor <= 1.0)
        {
            return Err(LodError::InvalidConfig(format!(
                "LOD factors must satisfy 0 < min <= max <= 1 (got min={}, max={})",
                self.min_factor, self.max_factor
            )));
        }
        if !(self.near_height >= 0.0 && self.near_height < self.far_height) {
            return Err(LodError::InvalidConfig(format!(
                "LOD heights must satisfy 0 <= near < far (got near={}, far={})",
                self.near_height, self.far_height
            )));
        }
        if self.curve == LodCurve::Logarithmic && self.near_height <= 0.0 {
            return Err(LodError::InvalidConfig(
                "Logarithmic LOD curve needs a positive near height".to_string(),
            ));
        }
        Ok(())
    }

    /// LOD factor for the given camera height in meters
    ///
    /// Non-increasing in height: full detail up to `near_height`, `min_factor` from
    /// `far_height` on, strictly decreasing in between. A NaN height keeps full detail.
    pub fn factor_for_height(&self, height: f64) -> f64 {
        if height.is_nan() || height <= self.near_height {
            return self.max_factor;
        }
        if height >= self.far_height {
            return self.min_factor;
        }

        let t = match self.curve {
            LodCurve::Linear => {
                (height - self.near_height) / (self.far_height - self.near_height)
            }
            LodCurve::Logarithmic => {
                (height / self.near_height).ln() / (self.far_height / self.near_height).ln()
            }
        };

        let factor = self.max_factor - t * (self.max_factor - self.min_factor);
        factor.max(self.min_factor).min(self.max_factor)
    }

    /// Clamp a user-supplied factor into the valid range
    #[inline]
    pub fn clamp_factor(&self, factor: f64) -> f64 {
        factor.max(self.min_factor).min(1.0)
    }
}

/// Which source decides the LOD factor for the current frame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LodMode {
    /// Derived from the camera height every frame
    #[default]
    Auto,
    /// Fixed by the user
    Manual,
}

/// Owner of the current LOD factor
///
/// Exactly one mode is authoritative per frame, so manual input and the automatic
/// path never interleave within a frame.
#[derive(Clone, Debug)]
pub struct LodController {
    config: LodConfig,
    mode: LodMode,
    /// Value shown in (and edited through) the manual input
    manual_factor: f64,
    /// Factor used by the last resolved frame
    current: f64,
}

impl LodController {
    pub fn new(config: LodConfig) -> Self {
        let max = config.max_factor;
        Self {
            config,
            mode: LodMode::Auto,
            manual_factor: max,
            current: max,
        }
    }

    /// Start in manual mode with the given factor (clamped)
    pub fn with_manual_factor(mut self, factor: f64) -> Self {
        // Non-finite values keep the default factor
        let _ = self.set_manual_factor(factor);
        self.mode = LodMode::Manual;
        self
    }

    #[inline]
    pub fn config(&self) -> &LodConfig {
        &self.config
    }

    #[inline]
    pub fn mode(&self) -> LodMode {
        self.mode
    }

    #[inline]
    pub fn is_auto(&self) -> bool {
        self.mode == LodMode::Auto
    }

    /// Toggle automatic mode
    pub fn set_auto(&mut self, auto: bool) {
        let mode = if auto { LodMode::Auto } else { LodMode::Manual };
        if mode != self.mode {
            tracing::debug!("LOD mode changed to {:?}", mode);
            self.mode = mode;
        }
    }

    /// Factor of the last resolved frame
    #[inline]
    pub fn current(&self) -> f64 {
        self.current
    }

    /// Factor currently held by the manual input
    #[inline]
    pub fn manual_factor(&self) -> f64 {
        self.manual_factor
    }

    /// Set the manual factor, clamped to `[min_factor, 1]`
    ///
    /// Non-finite values are rejected and the previous factor is kept.
    pub fn set_manual_factor(&mut self, factor: f64) -> Result<f64> {
        if !factor.is_finite() {
            return Err(LodError::InvalidLodInput(factor.to_string()));
        }
        self.manual_factor = self.config.clamp_factor(factor);
        if self.mode == LodMode::Manual {
            self.current = self.manual_factor;
        }
        Ok(self.manual_factor)
    }

    /// Parse and apply a textual manual factor
    pub fn set_manual_input(&mut self, input: &str) -> Result<f64> {
        let factor = input
            .trim()
            .parse::<f64>()
            .map_err(|_| LodError::InvalidLodInput(input.to_string()));
        match factor {
            Ok(factor) => self.set_manual_factor(factor),
            Err(e) => {
                tracing::debug!("Ignoring LOD input: {}", e);
                Err(e)
            }
        }
    }

    /// Decide the factor for this frame
    ///
    /// In automatic mode the calculator output also becomes the manual value, so
    /// switching to manual continues from what was on screen.
    pub fn resolve(&mut self, camera_height: f64) -> f64 {
        if self.mode == LodMode::Auto {
            let factor = self.config.factor_for_height(camera_height);
            self.manual_factor = factor;
            self.current = factor;
        } else {
            self.current = self.manual_factor;
        }
        self.current
    }
}

impl Default for LodController {
    fn default() -> Self {
        Self::new(LodConfig::default())
    }
}
