//! # Recording Session
//!
//! A [`Session`] owns everything one recording mutates: the live track, the
//! four cursors, the optional reference track and the route detector. Each
//! call to [`Session::push`] runs the whole pipeline synchronously for one
//! fix:
//!
//! gate → order correction → append → distance → altitude → speed →
//! motion → (every Nth point) route check
//!
//! Nothing here blocks or allocates per fix beyond the appended point, and
//! nothing is shared, so no locking is involved.

use log::{debug, info, warn};

use crate::altitude::ElevationMode;
use crate::error::Result;
use crate::gate::{self, Fix};
use crate::route::{ReferenceTrack, RouteAlert, RouteDeviationDetector, RouteState};
use crate::track::{Cursors, LiveTrack};
use crate::{altitude, distance, motion, order, speed, TrackerConfig};

/// What happened to one fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixOutcome {
    /// The fix failed the quality gate and was dropped
    Rejected,
    /// The fix was stored
    Accepted {
        /// Index of the new point
        index: usize,
        /// Trailing points evicted because they were newer than this fix
        evicted: usize,
        /// Whether the route detector ran for this fix
        route_checked: bool,
        /// Alert the route transition calls for
        alert: Option<RouteAlert>,
    },
}

impl FixOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FixOutcome::Accepted { .. })
    }

    pub fn alert(&self) -> Option<RouteAlert> {
        match self {
            FixOutcome::Accepted { alert, .. } => *alert,
            FixOutcome::Rejected => None,
        }
    }
}

/// One recording: live track, cursors, reference and route state.
#[derive(Debug, Clone)]
pub struct Session {
    config: TrackerConfig,
    track: Option<LiveTrack>,
    cursors: Cursors,
    reference: Option<ReferenceTrack>,
    detector: RouteDeviationDetector,
    admitted: u64,
    elevation_mode: ElevationMode,
}

impl Session {
    /// Create an idle session. The track is created by the first admitted fix.
    pub fn new(config: TrackerConfig) -> Self {
        if let Err(err) = config.validate() {
            warn!("[LiveTrack] Session created with questionable config: {}", err);
        }
        Self {
            config,
            track: None,
            cursors: Cursors::default(),
            reference: None,
            detector: RouteDeviationDetector::new(),
            admitted: 0,
            elevation_mode: ElevationMode::Windowed,
        }
    }

    /// Choose the gain/loss rule the finished track is settled with.
    /// Live totals always follow the windowed rule while recording.
    pub fn with_elevation_mode(mut self, mode: ElevationMode) -> Self {
        self.elevation_mode = mode;
        self
    }

    pub fn elevation_mode(&self) -> ElevationMode {
        self.elevation_mode
    }

    /// Create a session, rejecting an invalid config.
    pub fn try_new(config: TrackerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// The live track, once the first fix has been admitted.
    pub fn track(&self) -> Option<&LiveTrack> {
        self.track.as_ref()
    }

    pub fn cursors(&self) -> Cursors {
        self.cursors
    }

    pub fn is_active(&self) -> bool {
        self.track.is_some()
    }

    pub fn reference(&self) -> Option<&ReferenceTrack> {
        self.reference.as_ref()
    }

    pub fn route_state(&self) -> RouteState {
        self.detector.state()
    }

    pub fn detector(&self) -> &RouteDeviationDetector {
        &self.detector
    }

    /// Number of fixes admitted since the session started.
    pub fn admitted_count(&self) -> u64 {
        self.admitted
    }

    /// Load a reference track. Route state starts over as `Unknown`.
    pub fn load_reference(&mut self, reference: ReferenceTrack) {
        info!(
            "[RouteCheck] Reference loaded: {} points, stride {}",
            reference.len(),
            reference.stride(self.config.max_samples)
        );
        self.reference = Some(reference);
        self.detector.reset();
    }

    /// Drop the reference track; route state becomes `Unknown`.
    pub fn clear_reference(&mut self) {
        if self.reference.take().is_some() {
            info!("[RouteCheck] Reference cleared");
        }
        self.detector.reset();
    }

    /// Turn route checking on or off. Turning it off resets the state to
    /// `Unknown` so that re-enabling never alerts on stale state.
    pub fn set_route_checking(&mut self, enabled: bool) {
        self.config.route_checking = enabled;
        if !enabled {
            self.detector.reset();
        }
    }

    /// Run one fix through the pipeline.
    pub fn push(&mut self, fix: &Fix) -> FixOutcome {
        let Some(admitted) = gate::admit(fix, &self.config) else {
            return FixOutcome::Rejected;
        };
        self.admitted += 1;

        let evicted = match self.track.as_mut() {
            Some(track) => {
                let evicted =
                    order::correct_order(track, &mut self.cursors, admitted.timestamp, &self.config);
                track.append(&admitted);
                evicted
            }
            None => {
                info!("[LiveTrack] Session started at {}", admitted.timestamp);
                self.track = Some(LiveTrack::start(&admitted));
                self.cursors = Cursors::default();
                0
            }
        };

        self.run_pipeline(false);
        let (route_checked, alert) = self.check_route();

        let index = self.track.as_ref().map_or(0, |t| t.len() - 1);
        FixOutcome::Accepted {
            index,
            evicted,
            route_checked,
            alert,
        }
    }

    /// Finish the recording: smooth the altitude tail, refresh statistics
    /// and hand the track over. The session is idle afterwards.
    pub fn stop(&mut self) -> Option<LiveTrack> {
        self.run_pipeline(true);
        let mut track = self.track.take()?;
        altitude::settle_totals(&mut track, self.elevation_mode);
        self.cursors = Cursors::default();
        self.admitted = 0;
        self.detector.reset();

        info!(
            "[LiveTrack] Session stopped: {} points, {:.3} km, +{:.0}/-{:.0} m, moving {}",
            track.len(),
            track.properties.total_distance,
            track.properties.elevation_gain,
            track.properties.elevation_loss,
            track.properties.motion_time
        );
        Some(track)
    }

    /// Bring every accumulator up to date. The altitude filter lags
    /// `half_width` points behind the live edge unless `flush` is set.
    fn run_pipeline(&mut self, flush: bool) {
        let Some(track) = self.track.as_mut() else {
            return;
        };
        let Some(last) = track.last_index() else {
            return;
        };
        let half_width = self.config.half_width();
        let cursors = &mut self.cursors;

        distance::accumulate(track, cursors);
        let final_index = if flush {
            last
        } else {
            last.saturating_sub(half_width)
        };
        altitude::smooth(track, cursors, final_index, half_width);
        speed::smooth(track, cursors, half_width);
        motion::update(track, cursors, self.config.rest_speed);

        debug_assert!(cursors.max() <= last, "cursor ran past the track end");
    }

    /// Classify the newest point when a check is due.
    fn check_route(&mut self) -> (bool, Option<RouteAlert>) {
        if !self.config.route_checking {
            return (false, None);
        }
        let Some(reference) = self.reference.as_ref() else {
            return (false, None);
        };
        let interval = u64::from(self.config.check_interval.max(1));
        if self.admitted % interval != 0 {
            return (false, None);
        }
        let Some(position) = self.track.as_ref().and_then(|t| t.coordinates.last().copied())
        else {
            return (false, None);
        };

        let alert = self.detector.check(&position, reference, &self.config);
        debug!(
            "[RouteCheck] Point {} classified {:?}",
            self.admitted,
            self.detector.state()
        );
        (true, alert)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_utils::offset_meters;
    use crate::Coordinate;
    use approx::assert_relative_eq;

    fn origin() -> Coordinate {
        Coordinate::new(7.4474, 46.9480)
    }

    fn fix_at(north_m: f64, east_m: f64, timestamp: i64) -> Fix {
        let c = offset_meters(&origin(), north_m, east_m);
        Fix::new(c.longitude, c.latitude, 540.0, timestamp)
    }

    #[test]
    fn test_three_fix_scenario() {
        let mut session = Session::new(TrackerConfig::default());
        for i in 0..3 {
            assert!(session.push(&fix_at(0.0, i as f64 * 10.0, i * 1000)).is_accepted());
        }

        let track = session.track().unwrap();
        assert_eq!(track.len(), 3);
        assert_eq!(session.cursors().distance_done, 2);
        assert_relative_eq!(track.properties.total_distance, 0.02, epsilon = 1e-5);
        assert_relative_eq!(track.properties.average_speed, 36.0, epsilon = 0.05);
    }

    #[test]
    fn test_rejected_fix_has_no_side_effects() {
        let mut session = Session::new(TrackerConfig::default());
        let mut fix = fix_at(0.0, 0.0, 0);
        fix.accuracy = 500.0;
        assert_eq!(session.push(&fix), FixOutcome::Rejected);
        assert!(!session.is_active());
        assert_eq!(session.admitted_count(), 0);
    }

    #[test]
    fn test_corrupt_fixes_do_not_poison_totals() {
        let mut session = Session::new(TrackerConfig::default());
        session.push(&fix_at(0.0, 0.0, 0));
        assert_eq!(
            session.push(&Fix::new(f64::NAN, 46.948, 540.0, 1000)),
            FixOutcome::Rejected
        );
        for i in 1..5 {
            session.push(&fix_at(0.0, i as f64 * 10.0, i * 1000));
        }
        let mut blurred = fix_at(0.0, 50.0, 5000);
        blurred.accuracy = f64::NAN;
        assert_eq!(session.push(&blurred), FixOutcome::Rejected);

        let track = session.track().unwrap();
        assert_eq!(track.len(), 5);
        assert_relative_eq!(track.properties.total_distance, 0.04, epsilon = 1e-5);
        assert!(track.properties.average_speed > 0.0);
    }

    #[test]
    fn test_rollback_evicts_newer_point() {
        let mut session = Session::new(TrackerConfig::default());
        session.push(&fix_at(0.0, 0.0, 100));
        session.push(&fix_at(0.0, 10.0, 200));
        let outcome = session.push(&fix_at(0.0, 5.0, 150));

        assert!(matches!(outcome, FixOutcome::Accepted { evicted: 1, index: 1, .. }));
        let track = session.track().unwrap();
        let timestamps: Vec<i64> = track.data.iter().map(|d| d.timestamp).collect();
        assert_eq!(timestamps, vec![100, 150]);
        assert!(session.cursors().max() <= 1);
    }

    #[test]
    fn test_altitude_lags_live_edge() {
        let config = TrackerConfig::default();
        let mut session = Session::new(config.clone());
        for i in 0..12 {
            let mut fix = fix_at(i as f64 * 5.0, 0.0, i * 1000);
            fix.altitude = Some(500.0 + i as f64);
            session.push(&fix);
        }
        // 12 points, half-width 8: smoothed through index 3
        assert_eq!(session.cursors().altitude_done, 3);

        let track = session.stop().unwrap();
        assert_eq!(track.len(), 12);
        assert!(track.properties.elevation_gain > 0.0);
        assert!(!session.is_active());
    }

    #[test]
    fn test_stop_settles_with_chosen_elevation_mode() {
        let push_jitter = |session: &mut Session| {
            for i in 0..30 {
                let mut fix = fix_at(i as f64 * 4.0, 0.0, i * 1000);
                fix.altitude = Some(if i % 2 == 0 { 500.0 } else { 503.5 });
                session.push(&fix);
            }
        };

        let mut live = Session::new(TrackerConfig::default());
        assert_eq!(live.elevation_mode(), ElevationMode::Windowed);
        push_jitter(&mut live);
        let live_track = live.stop().unwrap();
        assert!(live_track.properties.elevation_gain > 0.0);

        let mode = ElevationMode::SteadyReference { threshold: 2.5 };
        let mut steady = Session::new(TrackerConfig::default()).with_elevation_mode(mode);
        push_jitter(&mut steady);
        let steady_track = steady.stop().unwrap();
        assert_eq!(steady_track.properties.elevation_gain, 0.0);
        assert_eq!(steady_track.properties.elevation_loss, 0.0);
        // Only the totals differ; the smoothed profile is the same
        assert_eq!(steady_track.data, live_track.data);
    }

    #[test]
    fn test_stop_flushes_short_track() {
        let mut session = Session::new(TrackerConfig::default());
        session.push(&fix_at(0.0, 0.0, 0));
        session.push(&fix_at(0.0, 10.0, 1000));
        assert_eq!(session.cursors().altitude_done, 0);

        let track = session.stop().unwrap();
        assert_eq!(track.properties.current_altitude, 540.0);
        assert!(session.stop().is_none());
    }

    #[test]
    fn test_no_reference_means_unknown() {
        let mut session = Session::new(TrackerConfig::default());
        for i in 0..6 {
            let outcome = session.push(&fix_at(i as f64 * 10.0, 0.0, i * 1000));
            assert!(matches!(
                outcome,
                FixOutcome::Accepted { route_checked: false, alert: None, .. }
            ));
        }
        assert_eq!(session.route_state(), RouteState::Unknown);
    }

    #[test]
    fn test_route_checked_every_third_point() {
        let mut session = Session::new(TrackerConfig::default());
        let reference: Vec<Coordinate> = (0..100)
            .map(|i| offset_meters(&origin(), i as f64 * 10.0, 0.0))
            .collect();
        session.load_reference(ReferenceTrack::new(reference).unwrap());

        let checked: Vec<bool> = (0..6)
            .map(|i| match session.push(&fix_at(i as f64 * 10.0, 0.0, i * 1000)) {
                FixOutcome::Accepted { route_checked, .. } => route_checked,
                FixOutcome::Rejected => false,
            })
            .collect();
        assert_eq!(checked, vec![false, false, true, false, false, true]);
        assert_eq!(session.route_state(), RouteState::OnRoute);

        session.set_route_checking(false);
        assert_eq!(session.route_state(), RouteState::Unknown);
    }
}
