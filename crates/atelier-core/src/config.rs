//! Editor configuration.
//!
//! Everything the interaction model treats as a tunable constant lives
//! here so the web shell, the CLI, and tests can agree on one set of
//! numbers. Missing JSON fields fall back to the defaults.

use serde::{Deserialize, Serialize};

use crate::resample::ResampleFilter;
use crate::types::StudioError;

/// Configuration for an [`EditorSession`](crate::session::EditorSession).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Smallest allowed zoom factor.
    pub min_zoom: f64,

    /// Largest allowed zoom factor.
    pub max_zoom: f64,

    /// Zoom change per unit of wheel `deltaY`. A wheel step scales the
    /// zoom by `1 - delta_y * wheel_sensitivity`.
    pub wheel_sensitivity: f64,

    /// Multiplicative step of the zoom-in / zoom-out buttons.
    pub zoom_step: f64,

    /// Maximum hover parallax offset in screen pixels.
    pub parallax_amplitude: f64,

    /// Initial brush diameter in screen pixels.
    pub brush_size: f64,

    /// Resampling filter used for resize commits.
    pub resample_filter: ResampleFilter,

    /// Maximum number of undo snapshots. `None` keeps every snapshot.
    pub history_limit: Option<usize>,

    /// Largest drawing surface (`width * height`) the compositor will
    /// allocate.
    pub max_surface_pixels: u64,
}

impl EditorConfig {
    pub const DEFAULT_MIN_ZOOM: f64 = 0.5;
    pub const DEFAULT_MAX_ZOOM: f64 = 5.0;
    pub const DEFAULT_WHEEL_SENSITIVITY: f64 = 0.001;
    pub const DEFAULT_ZOOM_STEP: f64 = 1.2;
    pub const DEFAULT_PARALLAX_AMPLITUDE: f64 = 15.0;
    pub const DEFAULT_BRUSH_SIZE: f64 = 40.0;
    /// 16384 x 16384, the canvas limit of most desktop browsers.
    pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 16_384 * 16_384;

    /// Parse a configuration from JSON and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::InvalidConfig`] if the JSON is malformed or
    /// the values fail [`validate`](Self::validate).
    pub fn from_json(json: &str) -> Result<Self, StudioError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| StudioError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants between fields.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::InvalidConfig`] describing the first
    /// violated constraint.
    pub fn validate(&self) -> Result<(), StudioError> {
        let invalid = |msg: &str| Err(StudioError::InvalidConfig(msg.to_owned()));
        if !(self.min_zoom.is_finite() && self.min_zoom > 0.0) {
            return invalid("min_zoom must be a positive number");
        }
        if !(self.max_zoom.is_finite() && self.max_zoom >= self.min_zoom) {
            return invalid("max_zoom must be at least min_zoom");
        }
        if !(self.zoom_step.is_finite() && self.zoom_step > 1.0) {
            return invalid("zoom_step must be greater than 1");
        }
        if !(self.wheel_sensitivity.is_finite() && self.wheel_sensitivity >= 0.0) {
            return invalid("wheel_sensitivity must be non-negative");
        }
        if !(self.parallax_amplitude.is_finite() && self.parallax_amplitude >= 0.0) {
            return invalid("parallax_amplitude must be non-negative");
        }
        if !(self.brush_size.is_finite() && self.brush_size >= 1.0) {
            return invalid("brush_size must be at least 1");
        }
        if self.history_limit == Some(0) {
            return invalid("history_limit must be at least 1 when set");
        }
        if self.max_surface_pixels == 0 {
            return invalid("max_surface_pixels must be positive");
        }
        Ok(())
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            min_zoom: Self::DEFAULT_MIN_ZOOM,
            max_zoom: Self::DEFAULT_MAX_ZOOM,
            wheel_sensitivity: Self::DEFAULT_WHEEL_SENSITIVITY,
            zoom_step: Self::DEFAULT_ZOOM_STEP,
            parallax_amplitude: Self::DEFAULT_PARALLAX_AMPLITUDE,
            brush_size: Self::DEFAULT_BRUSH_SIZE,
            resample_filter: ResampleFilter::default(),
            history_limit: None,
            max_surface_pixels: Self::DEFAULT_MAX_SURFACE_PIXELS,
        }
    }
}
