//! Tunable knobs for the tracking pipeline.
//!
//! All values are plain numbers; the core owns no file format. Hosts can
//! build a config in code, or decode one from JSON with
//! [`TrackerConfig::from_json`].

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};

/// Configuration for the live tracking pipeline and route detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
#[serde(default)]
pub struct TrackerConfig {
    /// Fixes with a horizontal accuracy worse than this are dropped.
    /// Default: 60.0 meters
    pub max_accuracy: f64,

    /// Fixes with an altitude accuracy worse than this are dropped.
    /// Default: 40.0 meters
    pub max_altitude_accuracy: f64,

    /// Half-width of the altitude window and length of the speed look-back.
    /// Default: 8 points
    pub smoothing_half_width: u32,

    /// Smoothed speeds below this count as standing still.
    /// Default: 1.0 km/h
    pub rest_speed: f64,

    /// Squared planar distance (degrees²) under which a live point counts as
    /// being on the reference track. Default: 1e-7 (roughly 30 m)
    pub proximity_threshold: f64,

    /// Samples farther than `scan_multiplier * proximity_threshold` trigger
    /// a skip-ahead. Default: 10
    pub scan_multiplier: f64,

    /// Number of strides covered by one skip-ahead. Default: 5
    pub scan_skip: u32,

    /// Target number of reference samples per scan direction. The stride
    /// is rounded, so a scan may visit up to about 1.5x this many.
    /// Default: 2000
    pub max_samples: u32,

    /// Route detection runs on every Nth admitted point. Default: 3
    pub check_interval: u32,

    /// Whether route detection runs at all when a reference is loaded.
    /// Default: true
    pub route_checking: bool,

    /// Noise threshold of the steady-reference elevation filter used for
    /// bulk imports. Default: 2.5 meters
    pub steady_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            max_accuracy: 60.0,
            max_altitude_accuracy: 40.0,
            smoothing_half_width: 8,
            rest_speed: 1.0,
            proximity_threshold: 1e-7,
            scan_multiplier: 10.0,
            scan_skip: 5,
            max_samples: 2000,
            check_interval: 3,
            route_checking: true,
            steady_threshold: 2.5,
        }
    }
}

impl TrackerConfig {
    /// Decode a config from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: TrackerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Encode the config as JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Check that every knob is usable.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("max_accuracy", self.max_accuracy),
            ("max_altitude_accuracy", self.max_altitude_accuracy),
            ("rest_speed", self.rest_speed),
            ("proximity_threshold", self.proximity_threshold),
            ("scan_multiplier", self.scan_multiplier),
            ("steady_threshold", self.steady_threshold),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(field, format!("must be finite and positive, got {}", value)));
            }
        }

        let at_least_one = [
            ("smoothing_half_width", self.smoothing_half_width),
            ("scan_skip", self.scan_skip),
            ("max_samples", self.max_samples),
            ("check_interval", self.check_interval),
        ];
        for (field, value) in at_least_one {
            if value == 0 {
                return Err(invalid(field, "must be at least 1".to_string()));
            }
        }

        Ok(())
    }

    /// Smoothing half-width as an index offset.
    pub(crate) fn half_width(&self) -> usize {
        self.smoothing_half_width as usize
    }
}

fn invalid(field: &str, message: String) -> TrackError {
    TrackError::InvalidConfig {
        field: field.to_string(),
        message,
    }
}
