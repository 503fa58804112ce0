//! Admission filter for raw GPS fixes.
//!
//! A rejected fix is not an error, it is just noise from the receiver. The
//! gate has no state and no side effects.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{Coordinate, TrackerConfig};

/// Conversion factor from m/s to km/h.
pub const MS_TO_KMH: f64 = 3.6;

/// One raw GPS sample as delivered by the platform location service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct Fix {
    pub longitude: f64,
    pub latitude: f64,
    /// Horizontal accuracy in meters
    pub accuracy: f64,
    /// Altitude in meters; missing or zero means the receiver has no vertical fix
    pub altitude: Option<f64>,
    /// Altitude accuracy in meters
    pub altitude_accuracy: Option<f64>,
    /// Bearing in degrees
    pub bearing: Option<f64>,
    /// Ground speed in m/s
    pub speed: Option<f64>,
    /// Device epoch milliseconds
    pub timestamp: Option<i64>,
    /// Set when the fix comes from a location simulator
    pub simulated: bool,
}

impl Fix {
    /// A fix with perfect accuracy, convenient for tests and replays.
    pub fn new(longitude: f64, latitude: f64, altitude: f64, timestamp: i64) -> Self {
        Self {
            longitude,
            latitude,
            accuracy: 0.0,
            altitude: Some(altitude),
            altitude_accuracy: Some(0.0),
            bearing: None,
            speed: None,
            timestamp: Some(timestamp),
            simulated: false,
        }
    }

    /// Set the ground speed in m/s.
    pub fn with_speed(mut self, speed_ms: f64) -> Self {
        self.speed = Some(speed_ms);
        self
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }
}

/// A fix that passed the gate, with speed already converted to km/h.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmittedFix {
    pub coordinate: Coordinate,
    pub altitude: f64,
    /// Instant speed in km/h
    pub speed: f64,
    pub timestamp: i64,
    pub simulated: bool,
}

/// Why a fix was dropped. Only used for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InvalidCoordinate,
    PoorAccuracy,
    NoAltitude,
    PoorAltitudeAccuracy,
    NoTimestamp,
}

/// Check a fix against the accuracy and altitude rules.
pub fn inspect(fix: &Fix, config: &TrackerConfig) -> std::result::Result<AdmittedFix, Rejection> {
    if !fix.coordinate().is_valid() {
        return Err(Rejection::InvalidCoordinate);
    }
    // Written so that a NaN accuracy fails too
    if !(fix.accuracy <= config.max_accuracy) {
        return Err(Rejection::PoorAccuracy);
    }
    let altitude = match fix.altitude {
        Some(alt) if alt.is_finite() && alt != 0.0 => alt,
        _ => return Err(Rejection::NoAltitude),
    };
    if fix
        .altitude_accuracy
        .is_some_and(|acc| acc > config.max_altitude_accuracy)
    {
        return Err(Rejection::PoorAltitudeAccuracy);
    }
    let timestamp = fix.timestamp.ok_or(Rejection::NoTimestamp)?;

    let speed = fix
        .speed
        .filter(|s| s.is_finite() && *s >= 0.0)
        .map(|s| s * MS_TO_KMH)
        .unwrap_or(0.0);

    Ok(AdmittedFix {
        coordinate: fix.coordinate(),
        altitude,
        speed,
        timestamp,
        simulated: fix.simulated,
    })
}

/// Admit a fix, or drop it silently.
pub fn admit(fix: &Fix, config: &TrackerConfig) -> Option<AdmittedFix> {
    match inspect(fix, config) {
        Ok(admitted) => Some(admitted),
        Err(reason) => {
            debug!(
                "[LiveTrack] Dropped fix at {:?} ({:?}, simulated={})",
                fix.timestamp, reason, fix.simulated
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn good_fix() -> Fix {
        Fix {
            longitude: 7.4474,
            latitude: 46.9480,
            accuracy: 12.0,
            altitude: Some(540.0),
            altitude_accuracy: Some(8.0),
            bearing: Some(90.0),
            speed: Some(2.5),
            timestamp: Some(1_700_000_000_000),
            simulated: false,
        }
    }

    #[test]
    fn test_admits_good_fix_and_converts_speed() {
        let admitted = admit(&good_fix(), &TrackerConfig::default()).unwrap();
        assert_eq!(admitted.altitude, 540.0);
        assert!((admitted.speed - 9.0).abs() < 1e-9);
        assert_eq!(admitted.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_rejects_poor_accuracy() {
        let fix = Fix {
            accuracy: 61.0,
            ..good_fix()
        };
        assert_eq!(
            inspect(&fix, &TrackerConfig::default()),
            Err(Rejection::PoorAccuracy)
        );
        // The threshold itself is still accepted
        let fix = Fix {
            accuracy: 60.0,
            ..good_fix()
        };
        assert!(admit(&fix, &TrackerConfig::default()).is_some());
    }

    #[test]
    fn test_rejects_invalid_position() {
        let config = TrackerConfig::default();
        let positions = [
            (f64::NAN, 46.948),
            (7.4474, f64::INFINITY),
            (181.0, 46.948),
            (7.4474, -90.5),
        ];
        for (longitude, latitude) in positions {
            let fix = Fix {
                longitude,
                latitude,
                ..good_fix()
            };
            assert_eq!(inspect(&fix, &config), Err(Rejection::InvalidCoordinate));
        }
    }

    #[test]
    fn test_rejects_nan_accuracy() {
        let fix = Fix {
            accuracy: f64::NAN,
            ..good_fix()
        };
        assert_eq!(
            inspect(&fix, &TrackerConfig::default()),
            Err(Rejection::PoorAccuracy)
        );
    }

    #[test]
    fn test_rejects_missing_or_zero_altitude() {
        let config = TrackerConfig::default();
        for altitude in [None, Some(0.0), Some(f64::NAN)] {
            let fix = Fix {
                altitude,
                ..good_fix()
            };
            assert_eq!(inspect(&fix, &config), Err(Rejection::NoAltitude));
        }
    }

    #[test]
    fn test_altitude_accuracy() {
        let config = TrackerConfig::default();
        let fix = Fix {
            altitude_accuracy: Some(41.0),
            ..good_fix()
        };
        assert_eq!(inspect(&fix, &config), Err(Rejection::PoorAltitudeAccuracy));

        let fix = Fix {
            altitude_accuracy: None,
            ..good_fix()
        };
        assert!(admit(&fix, &config).is_some());
    }

    #[test]
    fn test_rejects_missing_timestamp() {
        let fix = Fix {
            timestamp: None,
            ..good_fix()
        };
        assert_eq!(
            inspect(&fix, &TrackerConfig::default()),
            Err(Rejection::NoTimestamp)
        );
    }

    #[test]
    fn test_missing_speed_is_zero() {
        let fix = Fix {
            speed: None,
            ..good_fix()
        };
        assert_eq!(admit(&fix, &TrackerConfig::default()).unwrap().speed, 0.0);
    }
}
