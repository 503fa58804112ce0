//! The live track and its processing cursors.
//!
//! A [`LiveTrack`] keeps two parallel sequences, coordinates and
//! [`PointData`], plus a running bounding box and the aggregate properties
//! the downstream accumulators maintain. The array index is the point id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::Result;
use crate::gate::AdmittedFix;
use crate::{BoundingBox, Coordinate};

/// Per-point derived data, parallel to the coordinate sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct PointData {
    /// Altitude in meters. Overwritten in place once smoothed.
    pub altitude: f64,
    /// Instant speed reported by the receiver, km/h
    pub speed: f64,
    /// Windowed speed, km/h
    pub smoothed_speed: f64,
    /// Device epoch milliseconds
    pub timestamp: i64,
    /// Cumulative distance from the first point, km
    pub distance: f64,
}

impl PointData {
    fn from_fix(fix: &AdmittedFix) -> Self {
        Self {
            altitude: fix.altitude,
            speed: fix.speed,
            smoothed_speed: fix.speed,
            timestamp: fix.timestamp,
            distance: 0.0,
        }
    }
}

/// Aggregate values maintained by the accumulators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct TrackProperties {
    /// Cumulative distance, km
    pub total_distance: f64,
    /// Meters climbed
    pub elevation_gain: f64,
    /// Meters descended
    pub elevation_loss: f64,
    /// Latest smoothed altitude, meters
    pub current_altitude: f64,
    /// Latest smoothed speed, km/h
    pub current_speed: f64,
    /// Time between the first and last point, seconds
    pub elapsed_secs: f64,
    /// Time spent below the rest speed, seconds
    pub stopped_secs: f64,
    /// Distance over elapsed time, km/h
    pub average_speed: f64,
    /// Distance over moving time, km/h; unset until more than 5 s of motion
    pub motion_average_speed: Option<f64>,
    /// Moving time as `HH:MM:SS`
    pub motion_time: String,
    /// Number of stored points
    pub total_count: u32,
    /// Set once the first point is stored
    pub active: bool,
}

impl Default for TrackProperties {
    fn default() -> Self {
        Self {
            total_distance: 0.0,
            elevation_gain: 0.0,
            elevation_loss: 0.0,
            current_altitude: 0.0,
            current_speed: 0.0,
            elapsed_secs: 0.0,
            stopped_secs: 0.0,
            average_speed: 0.0,
            motion_average_speed: None,
            motion_time: "00:00:00".to_string(),
            total_count: 0,
            active: false,
        }
    }
}

/// Watermarks: index up to and including which each accumulator is done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursors {
    pub distance_done: usize,
    pub altitude_done: usize,
    pub speed_done: usize,
    pub motion_done: usize,
}

impl Cursors {
    /// Step every cursor back by one (floored at zero) and clamp to the
    /// last valid index of a track of `len` points.
    pub fn retreat(&mut self, len: usize) {
        let last = len.saturating_sub(1);
        for cursor in self.all_mut() {
            *cursor = cursor.saturating_sub(1).min(last);
        }
    }

    /// Largest cursor value; never exceeds `len - 1`.
    pub fn max(&self) -> usize {
        self.distance_done
            .max(self.altitude_done)
            .max(self.speed_done)
            .max(self.motion_done)
    }

    fn all_mut(&mut self) -> [&mut usize; 4] {
        [
            &mut self.distance_done,
            &mut self.altitude_done,
            &mut self.speed_done,
            &mut self.motion_done,
        ]
    }
}

/// The live track owned by a recording session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ffi", derive(uniffi::Record))]
pub struct LiveTrack {
    pub coordinates: Vec<Coordinate>,
    pub data: Vec<PointData>,
    pub bbox: Option<BoundingBox>,
    pub properties: TrackProperties,
}

impl LiveTrack {
    /// Create a track whose first point is `fix`.
    pub fn start(fix: &AdmittedFix) -> Self {
        let mut track = Self {
            coordinates: Vec::new(),
            data: Vec::new(),
            bbox: None,
            properties: TrackProperties::default(),
        };
        track.append(fix);
        track
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Index of the newest point.
    pub fn last_index(&self) -> Option<usize> {
        self.len().checked_sub(1)
    }

    /// Timestamp of the newest point.
    pub fn last_timestamp(&self) -> Option<i64> {
        self.data.last().map(|d| d.timestamp)
    }

    /// Append a fix as a new point.
    ///
    /// On an empty track this is the initialization path: aggregates are
    /// reset and the track is marked active.
    pub fn append(&mut self, fix: &AdmittedFix) {
        if self.is_empty() {
            self.properties = TrackProperties {
                current_altitude: fix.altitude,
                active: true,
                ..TrackProperties::default()
            };
            self.bbox = None;
        }

        self.coordinates.push(fix.coordinate);
        self.data.push(PointData::from_fix(fix));
        match self.bbox.as_mut() {
            Some(bbox) => bbox.extend(&fix.coordinate),
            None => self.bbox = Some(BoundingBox::from_coordinate(&fix.coordinate)),
        }
        self.properties.total_count = self.len() as u32;
        self.check_parallel();
    }

    /// Remove the newest point. The bounding box is left as is: it only
    /// ever grows during a session.
    pub(crate) fn pop(&mut self) -> Option<(Coordinate, PointData)> {
        let coordinate = self.coordinates.pop()?;
        let data = self.data.pop()?;
        self.properties.total_count = self.len() as u32;
        self.check_parallel();
        Some((coordinate, data))
    }

    /// Coordinates and point data must always line up index for index.
    #[inline]
    fn check_parallel(&self) {
        debug_assert_eq!(
            self.coordinates.len(),
            self.data.len(),
            "coordinate and point data sequences diverged"
        );
    }

    /// Render the track as a GeoJSON `Feature` with a `LineString` geometry.
    ///
    /// Per-point data goes into `properties.points` so a consumer can chart
    /// altitude and speed without a second lookup.
    pub fn to_geojson(&self) -> Result<Value> {
        let coordinates: Vec<[f64; 2]> = self
            .coordinates
            .iter()
            .map(|c| [c.longitude, c.latitude])
            .collect();

        let mut properties = serde_json::to_value(&self.properties)?;
        if let Value::Object(ref mut map) = properties {
            map.insert("points".to_string(), serde_json::to_value(&self.data)?);
        }

        let mut feature = json!({
            "type": "Feature",
            "geometry": {
                "type": "LineString",
                "coordinates": coordinates,
            },
            "properties": properties,
        });
        if let Some(bbox) = self.bbox {
            feature["bbox"] = json!([bbox.min_x, bbox.min_y, bbox.max_x, bbox.max_y]);
        }
        Ok(feature)
    }

    /// GeoJSON as a string, for handing to persistence.
    pub fn to_geojson_string(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.to_geojson()?)?)
    }
}
