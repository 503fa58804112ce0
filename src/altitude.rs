//! Altitude smoothing and elevation gain/loss bookkeeping.
//!
//! Two distinct gain/loss rules exist and they are not interchangeable:
//!
//! - [`ElevationMode::Windowed`] is the live rule. Every smoothed point
//!   contributes its slope to the totals.
//! - [`ElevationMode::SteadyReference`] is the bulk-import rule. A climb or
//!   descent only counts once it leaves a noise band around the last steady
//!   altitude.
//!
//! Switching a recording from one rule to the other changes its totals, so
//! the caller picks the mode explicitly.

use serde::{Deserialize, Serialize};

use crate::track::{Cursors, LiveTrack};

/// Which elevation gain/loss rule to apply.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ElevationMode {
    /// Per-point slope of the smoothed altitude (live tracking)
    Windowed,
    /// Hysteresis against the last steady altitude (bulk import)
    SteadyReference { threshold: f64 },
}

/// Elevation totals in meters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ElevationTotals {
    pub gain: f64,
    pub loss: f64,
}

/// Smooth altitudes up to `final_index` with a symmetric moving average of
/// half-width `half_width`.
///
/// Near the live edge the filter waits for look-ahead points: it only runs
/// when the track holds at least `half_width + 1` points, or when
/// `final_index` is the newest point (the end-of-session flush).
///
/// Smoothing is destructive. A window reads whatever is stored, so indices
/// before `i` contribute their already smoothed values.
pub fn smooth(track: &mut LiveTrack, cursors: &mut Cursors, final_index: usize, half_width: usize) {
    let Some(last) = track.last_index() else {
        return;
    };
    let final_index = final_index.min(last);
    if track.len() < half_width + 1 && final_index != last {
        return;
    }

    for i in (cursors.altitude_done + 1)..=final_index {
        let start = i.saturating_sub(half_width);
        let end = (i + half_width).min(last);
        let window = &track.data[start..=end];
        let mean = window.iter().map(|d| d.altitude).sum::<f64>() / window.len() as f64;
        track.data[i].altitude = mean;

        let slope = track.data[i].altitude - track.data[i - 1].altitude;
        if slope > 0.0 {
            track.properties.elevation_gain += slope;
        } else {
            track.properties.elevation_loss -= slope;
        }
        track.properties.current_altitude = track.data[i].altitude;
        cursors.altitude_done = i;
    }
}

/// Take back the elevation contribution of index `done` before the
/// altitude cursor gives it up during a rollback.
pub(crate) fn unwind(track: &mut LiveTrack, done: usize) {
    if done == 0 || done >= track.len() {
        return;
    }
    let slope = track.data[done].altitude - track.data[done - 1].altitude;
    if slope > 0.0 {
        track.properties.elevation_gain = (track.properties.elevation_gain - slope).max(0.0);
    } else {
        track.properties.elevation_loss = (track.properties.elevation_loss + slope).max(0.0);
    }
    track.properties.current_altitude = track.data[done - 1].altitude;
}

/// Gain and loss of an altitude profile that only move when the altitude
/// leaves a `threshold` band around the last steady value.
pub fn steady_reference_totals(altitudes: &[f64], threshold: f64) -> ElevationTotals {
    let mut totals = ElevationTotals::default();
    let Some(&first) = altitudes.first() else {
        return totals;
    };

    let mut steady = first;
    for &altitude in &altitudes[1..] {
        let delta = altitude - steady;
        if delta.abs() > threshold {
            if delta > 0.0 {
                totals.gain += delta;
            } else {
                totals.loss -= delta;
            }
            steady = altitude;
        }
    }
    totals
}

/// Per-point slope totals of an altitude profile.
pub fn windowed_totals(altitudes: &[f64]) -> ElevationTotals {
    let mut totals = ElevationTotals::default();
    for pair in altitudes.windows(2) {
        let slope = pair[1] - pair[0];
        if slope > 0.0 {
            totals.gain += slope;
        } else {
            totals.loss -= slope;
        }
    }
    totals
}

/// Elevation totals of an altitude profile under the given mode.
pub fn totals(altitudes: &[f64], mode: ElevationMode) -> ElevationTotals {
    match mode {
        ElevationMode::Windowed => windowed_totals(altitudes),
        ElevationMode::SteadyReference { threshold } => {
            steady_reference_totals(altitudes, threshold)
        }
    }
}

/// Recompute gain and loss of a fully smoothed track under `mode` and store
/// them in its properties.
///
/// For [`ElevationMode::Windowed`] this matches the running totals up to
/// rounding; it clears any drift left by rollbacks.
pub fn settle_totals(track: &mut LiveTrack, mode: ElevationMode) -> ElevationTotals {
    let altitudes: Vec<f64> = track.data.iter().map(|d| d.altitude).collect();
    let settled = totals(&altitudes, mode);
    track.properties.elevation_gain = settled.gain;
    track.properties.elevation_loss = settled.loss;
    settled
}
