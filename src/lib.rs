//! # Live Tracker
//!
//! Incremental processing of a live GPS fix stream with off-route detection.
//!
//! This library provides:
//! - Fix admission by accuracy and altitude validity
//! - Local rollback of out-of-order fixes
//! - Cursor-driven cumulative distance, altitude smoothing, speed smoothing
//!   and motion statistics (amortized O(1) per fix)
//! - Bounded-cost on-route / off-route classification against a reference
//!   track, with edge-triggered alerts
//! - A channel-fed recorder thread for hosts that deliver fixes from
//!   callbacks
//!
//! ## Features
//!
//! - **`ffi`** - Enable FFI bindings for mobile platforms (iOS/Android)
//!
//! ## Quick Start
//!
//! ```rust
//! use live_tracker::{Fix, Session, TrackerConfig};
//!
//! let mut session = Session::new(TrackerConfig::default());
//! for i in 0..3 {
//!     let fix = Fix::new(7.4474 + i as f64 * 1e-4, 46.9480, 540.0, i * 1000);
//!     session.push(&fix);
//! }
//!
//! let track = session.stop().unwrap();
//! assert_eq!(track.len(), 3);
//! println!("{:.3} km at {:.1} km/h", track.properties.total_distance, track.properties.average_speed);
//! ```

use geo::Coord;
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrackError};

// Tunable knobs
pub mod config;
pub use config::TrackerConfig;

// Geographic utilities (haversine, planar distance)
pub mod geo_utils;

// Pipeline stages, in processing order
pub mod gate;
pub use gate::{AdmittedFix, Fix};

pub mod order;

pub mod track;
pub use track::{Cursors, LiveTrack, PointData, TrackProperties};

pub mod distance;

pub mod altitude;
pub use altitude::{ElevationMode, ElevationTotals};

pub mod speed;

pub mod motion;

// Route deviation detection
pub mod route;
pub use route::{
    Classification, ReferenceTrack, RouteAlert, RouteDeviationDetector, RouteState,
};

// Recording session (owns track, reference, route state and cursors)
pub mod session;
pub use session::{FixOutcome, Session};

// Whole-recording processing for imported files
pub mod import;
pub use import::{process_recorded, RecordedPoint};

// Channel-fed recorder thread
pub mod recorder;
pub use recorder::{Recorder, SessionObserver};

// FFI bindings for mobile platforms (iOS/Android)
#[cfg(feature = "ffi")]
pub mod ffi;

#[cfg(feature = "ffi")]
uniffi::setup_scaffolding!();

/// Initialize logging for Android (only used in FFI)
#[cfg(all(feature = "ffi", target_os = "android"))]
pub(crate) fn init_logging() {
    use android_logger::Config;
    use log::LevelFilter;

    android_logger::init_once(
        Config::default()
            .with_max_level(LevelFilter::Debug)
            .with_tag("LiveTrackerRust"),
    );
}

#[cfg(all(feature = "ffi", not(target_os = "android")))]
pub(crate) fn init_logging() {
    // No-op on non-Android platforms
}

// ============================================================================
// Core Types
// ============================================================================

/// A position as (longitude, latitude) in degrees, GeoJSON order.
///
/// # Example
/// ```
/// use live_tracker::Coordinate;
/// let bern = Coordinate::new(7.4474, 46.9480);
/// assert!(bern.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Check if the coordinate is finite and within WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

impl From<Coordinate> for Coord<f64> {
    fn from(c: Coordinate) -> Self {
        Coord {
            x: c.longitude,
            y: c.latitude,
        }
    }
}

/// Axis-aligned bounding box; x is longitude, y is latitude.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Degenerate box around a single coordinate.
    pub fn from_coordinate(c: &Coordinate) -> Self {
        Self {
            min_x: c.longitude,
            min_y: c.latitude,
            max_x: c.longitude,
            max_y: c.latitude,
        }
    }

    /// Grow the box to include `c`. O(1).
    pub fn extend(&mut self, c: &Coordinate) {
        self.min_x = self.min_x.min(c.longitude);
        self.min_y = self.min_y.min(c.latitude);
        self.max_x = self.max_x.max(c.longitude);
        self.max_y = self.max_y.max(c.latitude);
    }

    /// Whether `c` lies inside the box expanded by `margin` on every side.
    pub fn contains_with_margin(&self, c: &Coordinate, margin: f64) -> bool {
        c.longitude >= self.min_x - margin
            && c.longitude <= self.max_x + margin
            && c.latitude >= self.min_y - margin
            && c.latitude <= self.max_y + margin
    }
}

// ============================================================================
// Tests
// ============================================================================
