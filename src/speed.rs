//! Backward-looking windowed speed.

use crate::track::{Cursors, LiveTrack};

/// Milliseconds per hour, to turn km/ms into km/h.
const MS_PER_HOUR: f64 = 3_600_000.0;

/// Average speed in km/h over `distance_km` and `time_ms`; zero when no time
/// elapsed, never negative.
pub fn speed_kmh(distance_km: f64, time_ms: i64) -> f64 {
    if time_ms <= 0 {
        return 0.0;
    }
    let speed = MS_PER_HOUR * distance_km / time_ms as f64;
    if speed.is_finite() {
        speed.max(0.0)
    } else {
        0.0
    }
}

/// Smooth speeds up to the newest point.
///
/// Point `i` gets the average speed over `[max(0, i - look_back), i]`.
/// Needs the distance accumulator to have covered `i` already.
pub fn smooth(track: &mut LiveTrack, cursors: &mut Cursors, look_back: usize) {
    let Some(last) = track.last_index() else {
        return;
    };
    debug_assert!(
        cursors.distance_done >= last,
        "speed smoothing ran ahead of distance accumulation"
    );

    for i in (cursors.speed_done + 1)..=last {
        let start = i.saturating_sub(look_back);
        let from = track.data[start];
        let to = track.data[i];
        track.data[i].smoothed_speed =
            speed_kmh(to.distance - from.distance, to.timestamp - from.timestamp);
        cursors.speed_done = i;
    }

    track.properties.current_speed = track.data[last].smoothed_speed;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance;
    use crate::gate::AdmittedFix;
    use crate::geo_utils::offset_meters;
    use crate::Coordinate;
    use approx::assert_relative_eq;

    fn build(timestamps: &[i64], step_m: f64) -> (LiveTrack, Cursors) {
        let origin = Coordinate::new(7.4474, 46.9480);
        let fix = |i: usize| AdmittedFix {
            coordinate: offset_meters(&origin, i as f64 * step_m, 0.0),
            altitude: 500.0,
            speed: 0.0,
            timestamp: timestamps[i],
            simulated: false,
        };
        let mut track = LiveTrack::start(&fix(0));
        for i in 1..timestamps.len() {
            track.append(&fix(i));
        }
        let mut cursors = Cursors::default();
        distance::accumulate(&mut track, &mut cursors);
        (track, cursors)
    }

    #[test]
    fn test_speed_kmh_degenerate() {
        assert_eq!(speed_kmh(1.0, 0), 0.0);
        assert_eq!(speed_kmh(1.0, -5), 0.0);
        assert_eq!(speed_kmh(-1.0, 1000), 0.0);
        assert_relative_eq!(speed_kmh(1.0, 3_600_000), 1.0);
    }

    #[test]
    fn test_constant_pace() {
        let timestamps: Vec<i64> = (0..20).map(|i| i * 1000).collect();
        let (mut track, mut cursors) = build(&timestamps, 5.0);
        smooth(&mut track, &mut cursors, 8);

        assert_eq!(cursors.speed_done, 19);
        // 5 m/s = 18 km/h whatever the window length
        for point in &track.data[1..] {
            assert_relative_eq!(point.smoothed_speed, 18.0, epsilon = 1e-6);
        }
        assert_relative_eq!(track.properties.current_speed, 18.0, epsilon = 1e-6);
    }

    #[test]
    fn test_zero_time_window_is_zero() {
        let (mut track, mut cursors) = build(&[1000, 1000, 1000], 5.0);
        smooth(&mut track, &mut cursors, 8);
        for point in &track.data[1..] {
            assert_eq!(point.smoothed_speed, 0.0);
        }
    }

    #[test]
    fn test_short_history_starts_at_first_point() {
        // Index 1 only has one predecessor; index 5 looks back two points
        let timestamps: Vec<i64> = (0..6).map(|i| i * 1000).collect();
        let (mut track, mut cursors) = build(&timestamps, 10.0);
        smooth(&mut track, &mut cursors, 2);
        assert_relative_eq!(track.data[5].smoothed_speed, 36.0, epsilon = 1e-6);
        assert_relative_eq!(track.data[1].smoothed_speed, 36.0, epsilon = 1e-6);
    }
}
