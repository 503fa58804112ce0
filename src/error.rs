//! Unified error handling for the live-tracker library.
//!
//! Nothing on the per-fix path returns an error: bad fixes are dropped,
//! reordering is repaired locally and missing reference data simply leaves
//! the route state `Unknown`. Errors only come from setup operations such as
//! loading a reference track, parsing configuration or talking to a
//! recorder thread that has already shut down.

use thiserror::Error;

/// Unified error type for live-tracker operations.
#[derive(Debug, Clone, Error)]
pub enum TrackError {
    /// Track has insufficient points for the operation
    #[error("Track '{track}' has {point_count} valid points, minimum {minimum_required} required")]
    InsufficientPoints {
        track: String,
        point_count: usize,
        minimum_required: usize,
    },
    /// A configuration value is out of range
    #[error("Invalid configuration for '{field}': {message}")]
    InvalidConfig { field: String, message: String },
    /// JSON input could not be decoded or encoded
    #[error("Serialization error: {message}")]
    Serialization { message: String },
    /// The recorder thread is gone and can no longer accept commands
    #[error("Recorder closed: {message}")]
    RecorderClosed { message: String },
    /// Generic internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl From<serde_json::Error> for TrackError {
    fn from(err: serde_json::Error) -> Self {
        TrackError::Serialization {
            message: err.to_string(),
        }
    }
}

/// Result type alias for live-tracker operations.
pub type Result<T> = std::result::Result<T, TrackError>;

/// Extension trait for converting Option to TrackError.
pub trait OptionExt<T> {
    /// Convert Option to Result with insufficient points error.
    fn ok_or_insufficient_points(self, track: &str, point_count: usize, minimum: usize)
        -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(
        self,
        track: &str,
        point_count: usize,
        minimum: usize,
    ) -> Result<T> {
        self.ok_or_else(|| TrackError::InsufficientPoints {
            track: track.to_string(),
            point_count,
            minimum_required: minimum,
        })
    }
}
