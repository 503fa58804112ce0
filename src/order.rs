//! Out-of-order correction.
//!
//! GPS receivers occasionally deliver a fix older than the one before it.
//! Instead of re-sorting, trailing points newer than the incoming fix are
//! evicted so timestamps stay non-decreasing. Disorder is assumed to be rare
//! and shallow, so the rollback is bounded and local.

use log::debug;

use crate::track::{Cursors, LiveTrack};
use crate::{altitude, motion, TrackerConfig};

/// Evict trailing points whose timestamp is greater than `timestamp`.
///
/// Every eviction steps each cursor back by one. Aggregates recorded for
/// the index a cursor gives up are subtracted first, so that reprocessing
/// the tail does not count it twice. Returns the number of evicted points.
pub fn correct_order(
    track: &mut LiveTrack,
    cursors: &mut Cursors,
    timestamp: i64,
    config: &TrackerConfig,
) -> usize {
    let mut evicted = 0;

    while track.last_timestamp().is_some_and(|last| last > timestamp) {
        altitude::unwind(track, cursors.altitude_done);
        motion::unwind(track, cursors.motion_done, config.rest_speed);

        if track.pop().is_none() {
            break;
        }
        cursors.retreat(track.len());
        evicted += 1;
    }

    if evicted > 0 {
        debug!(
            "[LiveTrack] Fix at {} arrived out of order, evicted {} trailing point(s)",
            timestamp, evicted
        );
    }
    evicted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AdmittedFix;
    use crate::Coordinate;

    fn fix(timestamp: i64) -> AdmittedFix {
        AdmittedFix {
            coordinate: Coordinate::new(7.0 + timestamp as f64 * 1e-6, 46.0),
            altitude: 500.0,
            speed: 0.0,
            timestamp,
            simulated: false,
        }
    }

    fn track_of(timestamps: &[i64]) -> (LiveTrack, Cursors) {
        let mut track = LiveTrack::start(&fix(timestamps[0]));
        for &t in &timestamps[1..] {
            track.append(&fix(t));
        }
        let last = track.len() - 1;
        let cursors = Cursors {
            distance_done: last,
            altitude_done: last.saturating_sub(8),
            speed_done: last,
            motion_done: last,
        };
        (track, cursors)
    }

    #[test]
    fn test_in_order_fix_is_untouched() {
        let (mut track, mut cursors) = track_of(&[100, 200]);
        let before = cursors;
        assert_eq!(correct_order(&mut track, &mut cursors, 200, &TrackerConfig::default()), 0);
        assert_eq!(track.len(), 2);
        assert_eq!(cursors, before);
    }

    #[test]
    fn test_evicts_newer_points() {
        let (mut track, mut cursors) = track_of(&[100, 200, 300, 400]);
        let evicted = correct_order(&mut track, &mut cursors, 250, &TrackerConfig::default());
        assert_eq!(evicted, 2);
        assert_eq!(track.last_timestamp(), Some(200));
        assert_eq!(cursors.distance_done, 1);
        assert_eq!(cursors.motion_done, 1);
        assert_eq!(cursors.altitude_done, 0);
        assert!(cursors.max() <= track.len() - 1);
    }

    #[test]
    fn test_evicts_everything_when_fix_is_oldest() {
        let (mut track, mut cursors) = track_of(&[100, 200]);
        let evicted = correct_order(&mut track, &mut cursors, 50, &TrackerConfig::default());
        assert_eq!(evicted, 2);
        assert!(track.is_empty());
        assert_eq!(cursors, Cursors::default());
    }

    #[test]
    fn test_unwinds_stopped_time() {
        let (mut track, mut cursors) = track_of(&[0, 1000, 2000]);
        // Pretend the motion pass counted index 2 as stopped
        track.properties.stopped_secs = 2.0;
        correct_order(&mut track, &mut cursors, 1500, &TrackerConfig::default());
        assert_eq!(track.properties.stopped_secs, 1.0);
    }
}
