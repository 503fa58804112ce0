//! Geographic helpers shared by the accumulators and the route detector.

use crate::Coordinate;

/// Mean earth radius used for all great-circle distances, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two coordinates in kilometers
/// (haversine on a spherical earth).
pub fn haversine_km(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}

/// Squared planar distance in degrees².
///
/// Route detection compares against a squared threshold, so the square
/// root is never taken on the hot path.
#[inline]
pub fn squared_distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let dx = a.longitude - b.longitude;
    let dy = a.latitude - b.latitude;
    dx * dx + dy * dy
}

/// Offset a coordinate by a distance in meters along the local north and
/// east axes. Handy for building synthetic tracks.
pub fn offset_meters(origin: &Coordinate, north_m: f64, east_m: f64) -> Coordinate {
    let meters_per_degree = EARTH_RADIUS_KM * 1000.0 * std::f64::consts::PI / 180.0;
    let dlat = north_m / meters_per_degree;
    let dlng = east_m / (meters_per_degree * origin.latitude.to_radians().cos());
    Coordinate::new(origin.longitude + dlng, origin.latitude + dlat)
}
