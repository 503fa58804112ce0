//! # Route Deviation Detection
//!
//! Classifies the newest live position against a reference polyline as
//! on-route or off-route, and signals edge-triggered alerts when the
//! classification flips.
//!
//! ## Algorithm
//!
//! 1. Quick reject: a point outside the reference bounding box (expanded by
//!    the proximity radius, or 0.3 of it when already off-route) is off-route
//!    without scanning.
//! 2. The reference is sampled every `stride = max(round(N / max_samples), 1)`
//!    points, so the cost per call is bounded whatever the track length.
//! 3. Scan forward from the last matched index, then backward to 0. A sample
//!    closer than the proximity threshold is a match. A sample farther than
//!    `scan_multiplier * threshold` triggers a skip of `scan_skip` strides.

use geo::{BoundingRect, Coord, LineString};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result};
use crate::geo_utils::squared_distance;
use crate::track::LiveTrack;
use crate::{BoundingBox, Coordinate, TrackerConfig};

/// Bounding-box expansion factor while the device is already off-route.
const OFF_ROUTE_BOX_FACTOR: f64 = 0.3;

/// An immutable reference path with precomputed extremes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceTrack {
    coordinates: Vec<Coordinate>,
    bounds: BoundingBox,
}

impl ReferenceTrack {
    /// Build a reference track. Non-finite coordinates are dropped; at least
    /// one valid coordinate must remain.
    pub fn new(coordinates: Vec<Coordinate>) -> Result<Self> {
        let total = coordinates.len();
        let coordinates: Vec<Coordinate> =
            coordinates.into_iter().filter(|c| c.is_valid()).collect();

        let line: LineString<f64> = coordinates.iter().map(|c| Coord::from(*c)).collect();
        let rect = line
            .bounding_rect()
            .ok_or_insufficient_points("reference", coordinates.len(), 1)?;
        if coordinates.len() < total {
            debug!(
                "[RouteCheck] Dropped {} invalid reference coordinates",
                total - coordinates.len()
            );
        }

        Ok(Self {
            coordinates,
            bounds: BoundingBox {
                min_x: rect.min().x,
                min_y: rect.min().y,
                max_x: rect.max().x,
                max_y: rect.max().y,
            },
        })
    }

    /// Use a previously recorded track as the reference.
    pub fn from_track(track: &LiveTrack) -> Result<Self> {
        Self::new(track.coordinates.clone())
    }

    /// Parse a GeoJSON position array, `[[lng, lat], [lng, lat, alt], ...]`.
    pub fn from_geojson_coordinates(json: &str) -> Result<Self> {
        let positions: Vec<Vec<f64>> = serde_json::from_str(json)?;
        let coordinates = positions
            .iter()
            .filter(|p| p.len() >= 2)
            .map(|p| Coordinate::new(p[0], p[1]))
            .collect();
        Self::new(coordinates)
    }

    pub fn coordinates(&self) -> &[Coordinate] {
        &self.coordinates
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Sampling interval for a scan capped at `max_samples` points.
    pub fn stride(&self, max_samples: u32) -> usize {
        let ratio = self.len() as f64 / max_samples.max(1) as f64;
        (ratio.round() as usize).max(1)
    }
}

/// Position of the device relative to the reference track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RouteState {
    /// No reference loaded or detection inactive
    #[default]
    Unknown,
    OffRoute,
    OnRoute,
}

/// Request to the audio bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Enum))]
pub enum RouteAlert {
    /// The device went from on-route to off-route
    LeftRoute,
    /// The device came back onto the route
    ResumedRoute,
}

impl RouteAlert {
    /// Alert for a classification change, if any. Only the two direct
    /// on/off flips alert; anything involving `Unknown` is silent.
    pub fn for_transition(previous: RouteState, current: RouteState) -> Option<Self> {
        match (previous, current) {
            (RouteState::OnRoute, RouteState::OffRoute) => Some(RouteAlert::LeftRoute),
            (RouteState::OffRoute, RouteState::OnRoute) => Some(RouteAlert::ResumedRoute),
            (RouteState::Unknown, _)
            | (_, RouteState::Unknown)
            | (RouteState::OnRoute, RouteState::OnRoute)
            | (RouteState::OffRoute, RouteState::OffRoute) => None,
        }
    }
}

/// Outcome of one classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub state: RouteState,
    /// Matched reference index when on-route
    pub matched_index: Option<usize>,
    /// Squared-distance evaluations performed
    pub evaluations: usize,
}

/// Scan parameters derived from the config.
#[derive(Debug, Clone, Copy)]
struct Scan {
    threshold: f64,
    far: f64,
    stride: usize,
    skip: usize,
}

/// Hysteretic on/off-route state machine.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDeviationDetector {
    state: RouteState,
    last_matched_index: usize,
    last_evaluations: usize,
}

impl RouteDeviationDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> RouteState {
        self.state
    }

    /// Reference index the next search starts from.
    pub fn last_matched_index(&self) -> usize {
        self.last_matched_index
    }

    /// Distance evaluations performed by the most recent check.
    pub fn last_evaluations(&self) -> usize {
        self.last_evaluations
    }

    /// Forget everything, e.g. when the reference changes.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Classify `position`, update the state and return the alert the
    /// transition calls for.
    pub fn check(
        &mut self,
        position: &Coordinate,
        reference: &ReferenceTrack,
        config: &TrackerConfig,
    ) -> Option<RouteAlert> {
        let result = self.classify(position, reference, config);
        let previous = self.state;

        self.state = result.state;
        self.last_evaluations = result.evaluations;
        if let Some(index) = result.matched_index {
            self.last_matched_index = index;
        }

        let alert = RouteAlert::for_transition(previous, result.state);
        if let Some(alert) = alert {
            info!(
                "[RouteCheck] {:?} -> {:?} at reference index {} ({} evaluations)",
                previous, result.state, self.last_matched_index, result.evaluations
            );
            debug!("[RouteCheck] Alert requested: {:?}", alert);
        }
        alert
    }

    /// Classify without touching the state.
    pub fn classify(
        &self,
        position: &Coordinate,
        reference: &ReferenceTrack,
        config: &TrackerConfig,
    ) -> Classification {
        let off_route = Classification {
            state: RouteState::OffRoute,
            matched_index: None,
            evaluations: 0,
        };
        if reference.is_empty() {
            return off_route;
        }

        let factor = if self.state == RouteState::OffRoute {
            OFF_ROUTE_BOX_FACTOR
        } else {
            1.0
        };
        let margin = factor * config.proximity_threshold.sqrt();
        if !reference.bounds.contains_with_margin(position, margin) {
            return off_route;
        }

        let scan = Scan {
            threshold: config.proximity_threshold,
            far: config.scan_multiplier * config.proximity_threshold,
            stride: reference.stride(config.max_samples),
            skip: config.scan_skip.max(1) as usize,
        };
        let points = reference.coordinates();
        let start = self.last_matched_index.min(points.len() - 1);

        let mut evaluations = 0;
        let found = scan_forward(points, position, start, scan, &mut evaluations)
            .or_else(|| scan_backward(points, position, start, scan, &mut evaluations));

        Classification {
            state: if found.is_some() {
                RouteState::OnRoute
            } else {
                RouteState::OffRoute
            },
            matched_index: found,
            evaluations,
        }
    }
}

fn scan_forward(
    points: &[Coordinate],
    position: &Coordinate,
    start: usize,
    scan: Scan,
    evaluations: &mut usize,
) -> Option<usize> {
    let mut i = start;
    while i < points.len() {
        let d = squared_distance(position, &points[i]);
        *evaluations += 1;
        if d < scan.threshold {
            return Some(i);
        }
        if d > scan.far {
            i += (scan.skip - 1) * scan.stride;
        }
        i += scan.stride;
    }
    None
}

fn scan_backward(
    points: &[Coordinate],
    position: &Coordinate,
    start: usize,
    scan: Scan,
    evaluations: &mut usize,
) -> Option<usize> {
    let mut i = start as isize;
    while i >= 0 {
        let d = squared_distance(position, &points[i as usize]);
        *evaluations += 1;
        if d < scan.threshold {
            return Some(i as usize);
        }
        if d > scan.far {
            i -= ((scan.skip - 1) * scan.stride) as isize;
        }
        i -= scan.stride as isize;
    }
    None
}
