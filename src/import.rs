//! Whole-recording processing for imported tracks.
//!
//! File parsing happens elsewhere; this module takes already decoded points
//! and derives the same [`LiveTrack`] a live session would, in a single
//! pass. The one deliberate difference is the elevation rule: imports use
//! the steady-reference filter, live sessions the windowed one.

use log::info;
use serde::{Deserialize, Serialize};

use crate::altitude::{self, ElevationMode};
use crate::error::{OptionExt, Result};
use crate::gate::AdmittedFix;
use crate::track::{Cursors, LiveTrack};
use crate::{distance, motion, speed, Coordinate, TrackerConfig};

/// One point of a recording decoded from a file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedPoint {
    pub coordinate: Coordinate,
    /// Altitude in meters
    pub altitude: f64,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// Recorded speed in km/h, if the file has one
    pub speed: Option<f64>,
}

impl RecordedPoint {
    pub fn new(coordinate: Coordinate, altitude: f64, timestamp: i64) -> Self {
        Self {
            coordinate,
            altitude,
            timestamp,
            speed: None,
        }
    }
}

/// Build a fully processed track from a recording.
///
/// Points with invalid coordinates or non-finite altitude are skipped, the
/// rest are ordered by timestamp. Fails when no usable point remains.
pub fn process_recorded(points: &[RecordedPoint], config: &TrackerConfig) -> Result<LiveTrack> {
    let mut usable: Vec<&RecordedPoint> = points
        .iter()
        .filter(|p| p.coordinate.is_valid() && p.altitude.is_finite())
        .collect();
    usable.sort_by_key(|p| p.timestamp);

    let mut fixes = usable.iter().map(|p| AdmittedFix {
        coordinate: p.coordinate,
        altitude: p.altitude,
        speed: p.speed.filter(|s| s.is_finite() && *s >= 0.0).unwrap_or(0.0),
        timestamp: p.timestamp,
        simulated: false,
    });

    let first = fixes
        .next()
        .ok_or_insufficient_points("import", usable.len(), 1)?;
    let mut track = LiveTrack::start(&first);
    for fix in fixes {
        track.append(&fix);
    }

    let mut cursors = Cursors::default();
    let half_width = config.half_width();
    let last = track.len() - 1;

    distance::accumulate(&mut track, &mut cursors);
    altitude::smooth(&mut track, &mut cursors, last, half_width);

    // Replace the per-point totals with the steady-reference rule
    let totals = altitude::settle_totals(
        &mut track,
        ElevationMode::SteadyReference {
            threshold: config.steady_threshold,
        },
    );

    speed::smooth(&mut track, &mut cursors, half_width);
    motion::update(&mut track, &mut cursors, config.rest_speed);

    info!(
        "[LiveTrack] Imported {} of {} points, {:.3} km, +{:.0}/-{:.0} m",
        track.len(),
        points.len(),
        track.properties.total_distance,
        totals.gain,
        totals.loss
    );
    Ok(track)
}
