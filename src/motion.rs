//! Stopped time, average speeds and moving time.

use crate::speed::speed_kmh;
use crate::track::{Cursors, LiveTrack};

/// Moving time must exceed this many seconds before a motion average is
/// reported.
const MIN_MOTION_SECS: f64 = 5.0;

/// Accumulate stopped time up to the newest point, then refresh the
/// elapsed-time and average-speed properties.
///
/// Stopped time is incremental (guarded by `motion_done`); the averages are
/// recomputed from the endpoints on every call.
pub fn update(track: &mut LiveTrack, cursors: &mut Cursors, rest_speed: f64) {
    let Some(last) = track.last_index() else {
        return;
    };

    for i in (cursors.motion_done + 1)..=last {
        if track.data[i].smoothed_speed < rest_speed {
            track.properties.stopped_secs += step_secs(track, i);
        }
        cursors.motion_done = i;
    }

    let first = track.data[0];
    let newest = track.data[last];
    let elapsed_ms = newest.timestamp - first.timestamp;
    let elapsed_secs = elapsed_ms as f64 / 1000.0;
    let moving_secs = elapsed_secs - track.properties.stopped_secs;

    let props = &mut track.properties;
    props.elapsed_secs = elapsed_secs;
    props.average_speed = speed_kmh(newest.distance, elapsed_ms);
    props.motion_average_speed = if moving_secs > MIN_MOTION_SECS {
        Some(3600.0 * newest.distance / moving_secs)
    } else {
        None
    };
    props.motion_time = format_duration_ms(1000.0 * moving_secs);
}

/// Take back the stopped time of index `done` before the motion cursor
/// gives it up during a rollback.
pub(crate) fn unwind(track: &mut LiveTrack, done: usize, rest_speed: f64) {
    if done == 0 || done >= track.len() {
        return;
    }
    if track.data[done].smoothed_speed < rest_speed {
        let stopped = track.properties.stopped_secs - step_secs(track, done);
        track.properties.stopped_secs = stopped.max(0.0);
    }
}

fn step_secs(track: &LiveTrack, i: usize) -> f64 {
    (track.data[i].timestamp - track.data[i - 1].timestamp) as f64 / 1000.0
}

/// Format milliseconds as `HH:MM:SS`. Negative input counts as zero; hours
/// are not wrapped at 24.
pub fn format_duration_ms(ms: f64) -> String {
    let total_secs = if ms.is_finite() && ms > 0.0 {
        (ms / 1000.0).floor() as u64
    } else {
        0
    };
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::AdmittedFix;
    use crate::Coordinate;
    use approx::assert_relative_eq;

    /// Track with hand-set distance and smoothed speed per point.
    fn build(rows: &[(i64, f64, f64)]) -> LiveTrack {
        let fix = |t: i64| AdmittedFix {
            coordinate: Coordinate::new(7.0, 46.0),
            altitude: 500.0,
            speed: 0.0,
            timestamp: t,
            simulated: false,
        };
        let mut track = LiveTrack::start(&fix(rows[0].0));
        for row in &rows[1..] {
            track.append(&fix(row.0));
        }
        for (data, &(_, distance, speed)) in track.data.iter_mut().zip(rows) {
            data.distance = distance;
            data.smoothed_speed = speed;
        }
        track
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration_ms(0.0), "00:00:00");
        assert_eq!(format_duration_ms(59_999.0), "00:00:59");
        assert_eq!(format_duration_ms(3_723_000.0), "01:02:03");
        assert_eq!(format_duration_ms(-5.0), "00:00:00");
        assert_eq!(format_duration_ms(90_000_000.0), "25:00:00");
    }

    #[test]
    fn test_stopped_time_and_averages() {
        // 0-10 s moving, 10-40 s standing still, 40-50 s moving
        let mut track = build(&[
            (0, 0.0, 0.0),
            (10_000, 0.1, 36.0),
            (40_000, 0.1, 0.0),
            (50_000, 0.2, 36.0),
        ]);
        let mut cursors = Cursors::default();
        update(&mut track, &mut cursors, 1.0);

        let props = &track.properties;
        assert_eq!(cursors.motion_done, 3);
        assert_relative_eq!(props.stopped_secs, 30.0);
        assert_relative_eq!(props.elapsed_secs, 50.0);
        assert_relative_eq!(props.average_speed, 3600.0 * 0.2 / 50.0);
        assert_relative_eq!(props.motion_average_speed.unwrap(), 3600.0 * 0.2 / 20.0);
        assert_eq!(props.motion_time, "00:00:20");
    }

    #[test]
    fn test_motion_average_needs_five_seconds() {
        let mut track = build(&[(0, 0.0, 0.0), (4_000, 0.01, 9.0)]);
        let mut cursors = Cursors::default();
        update(&mut track, &mut cursors, 1.0);
        assert!(track.properties.motion_average_speed.is_none());
        assert_eq!(track.properties.motion_time, "00:00:04");
    }

    #[test]
    fn test_single_point_is_degenerate_not_a_fault() {
        let mut track = build(&[(1_000, 0.0, 0.0)]);
        let mut cursors = Cursors::default();
        update(&mut track, &mut cursors, 1.0);
        assert_eq!(track.properties.average_speed, 0.0);
        assert_eq!(track.properties.elapsed_secs, 0.0);
        assert!(track.properties.motion_average_speed.is_none());
    }

    #[test]
    fn test_rerun_does_not_double_count() {
        let mut track = build(&[(0, 0.0, 0.0), (10_000, 0.0, 0.0)]);
        let mut cursors = Cursors::default();
        update(&mut track, &mut cursors, 1.0);
        update(&mut track, &mut cursors, 1.0);
        assert_relative_eq!(track.properties.stopped_secs, 10.0);
    }
}
