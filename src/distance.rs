//! Incremental cumulative distance.

use crate::geo_utils::haversine_km;
use crate::track::{Cursors, LiveTrack};

/// Extend the cumulative-distance series up to the newest point.
///
/// Indices at or below `distance_done` are never recomputed, so each new
/// point costs one haversine evaluation.
pub fn accumulate(track: &mut LiveTrack, cursors: &mut Cursors) {
    let Some(last) = track.last_index() else {
        return;
    };

    for i in (cursors.distance_done + 1)..=last {
        let delta = haversine_km(&track.coordinates[i - 1], &track.coordinates[i]);
        track.data[i].distance = track.data[i - 1].distance + delta;
        cursors.distance_done = i;
    }

    track.properties.total_distance = track.data[last].distance;
}
