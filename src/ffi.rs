//! FFI bindings for mobile platforms (iOS/Android).
//!
//! Exposes a [`TrackRecorder`] object to Kotlin and Swift. The platform
//! location callback calls [`TrackRecorder::push_fix`] directly; the
//! session is guarded by a mutex so callbacks from any thread are safe.
//! Route alerts are delivered through a [`RouteAlertListener`] implemented
//! on the platform side.

use std::sync::{Arc, Mutex};

use log::{info, warn};

use crate::{
    init_logging, Fix, FixOutcome, LiveTrack, ReferenceTrack, RouteAlert, RouteState, Session,
    TrackerConfig,
};

// ============================================================================
// Callback Interface
// ============================================================================

/// Receives route alerts. Implement this in Kotlin/Swift to play a sound
/// or show a notification.
#[uniffi::export(callback_interface)]
pub trait RouteAlertListener: Send + Sync {
    fn on_alert(&self, alert: RouteAlert);
}

// ============================================================================
// Recorder Object
// ============================================================================

#[derive(uniffi::Object)]
pub struct TrackRecorder {
    session: Mutex<Session>,
    listener: Mutex<Option<Box<dyn RouteAlertListener>>>,
}

impl TrackRecorder {
    fn with_session<F, R>(&self, f: F) -> Option<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut guard = self.session.lock().ok()?;
        Some(f(&mut guard))
    }

    fn notify(&self, alert: RouteAlert) {
        match self.listener.lock() {
            Ok(guard) => {
                if let Some(listener) = guard.as_ref() {
                    listener.on_alert(alert);
                }
            }
            Err(_) => warn!("[LiveTrackRust] Listener lock poisoned, alert {:?} lost", alert),
        }
    }
}

#[uniffi::export]
impl TrackRecorder {
    /// Create a recorder with the given configuration.
    #[uniffi::constructor]
    pub fn new(config: TrackerConfig) -> Arc<Self> {
        init_logging();
        info!("[LiveTrackRust] TrackRecorder created");
        Arc::new(Self {
            session: Mutex::new(Session::new(config)),
            listener: Mutex::new(None),
        })
    }

    /// Register (or replace) the route alert listener.
    pub fn set_listener(&self, listener: Box<dyn RouteAlertListener>) {
        if let Ok(mut guard) = self.listener.lock() {
            *guard = Some(listener);
        }
    }

    pub fn clear_listener(&self) {
        if let Ok(mut guard) = self.listener.lock() {
            *guard = None;
        }
    }

    /// Feed one fix. Returns whether it was admitted.
    pub fn push_fix(&self, fix: Fix) -> bool {
        let outcome = self.with_session(|s| s.push(&fix));
        match outcome {
            Some(outcome) => {
                // Call the listener outside the session lock
                if let Some(alert) = outcome.alert() {
                    self.notify(alert);
                }
                outcome != FixOutcome::Rejected
            }
            None => false,
        }
    }

    /// Load a reference track from a GeoJSON coordinates array
    /// (`[[lng, lat], ...]`). Returns false if it could not be parsed.
    pub fn load_reference_geojson(&self, coordinates_json: String) -> bool {
        match ReferenceTrack::from_geojson_coordinates(&coordinates_json) {
            Ok(reference) => self
                .with_session(|s| s.load_reference(reference))
                .is_some(),
            Err(e) => {
                warn!("[LiveTrackRust] Reference rejected: {}", e);
                false
            }
        }
    }

    pub fn clear_reference(&self) {
        self.with_session(|s| s.clear_reference());
    }

    pub fn set_route_checking(&self, enabled: bool) {
        self.with_session(|s| s.set_route_checking(enabled));
    }

    pub fn route_state(&self) -> RouteState {
        self.with_session(|s| s.route_state())
            .unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.with_session(|s| s.is_active()).unwrap_or(false)
    }

    /// Copy of the live track for rendering.
    pub fn snapshot(&self) -> Option<LiveTrack> {
        self.with_session(|s| s.track().cloned()).flatten()
    }

    /// The live track as a GeoJSON Feature string.
    pub fn geojson(&self) -> Option<String> {
        self.with_session(|s| s.track().map(|t| t.to_geojson_string()))
            .flatten()
            .and_then(|r| r.ok())
    }

    /// Stop recording and return the finished track.
    pub fn stop(&self) -> Option<LiveTrack> {
        self.with_session(|s| s.stop()).flatten()
    }
}

// ============================================================================
// Free Functions
// ============================================================================

/// Default configuration, for hosts that only tweak a few fields.
#[uniffi::export]
pub fn default_tracker_config() -> TrackerConfig {
    TrackerConfig::default()
}

/// Parse a configuration from JSON, falling back to defaults on error.
#[uniffi::export]
pub fn tracker_config_from_json(json: String) -> TrackerConfig {
    init_logging();
    TrackerConfig::from_json(&json).unwrap_or_else(|e| {
        warn!("[LiveTrackRust] Invalid config JSON, using defaults: {}", e);
        TrackerConfig::default()
    })
}
