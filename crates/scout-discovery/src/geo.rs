//! Great-circle geometry on a spherical Earth.
//!
//! Distances use the haversine formula; scatter sub-region centers are placed
//! with the forward (destination-point) formula.

use scout_core::Coordinate;

/// Mean Earth radius used for distance checks, in miles.
pub const EARTH_RADIUS_MILES: f64 = 3959.0;

/// Earth radius used for forward geodesic placement, in miles.
pub const DESTINATION_EARTH_RADIUS_MILES: f64 = 3958.8;

pub const METERS_PER_MILE: f64 = 1609.34;

/// Sub-region centers sit this fraction of the requested radius from the
/// search center.
pub const SCATTER_OFFSET_FRACTION: f64 = 0.7;

/// N, S, E, W.
const CARDINAL_BEARINGS: [f64; 4] = [0.0, 180.0, 90.0, 270.0];
/// NE, SE, SW, NW.
const DIAGONAL_BEARINGS: [f64; 4] = [45.0, 135.0, 225.0, 315.0];

/// Haversine distance in miles between `a` and `b`.
///
/// The intermediate term is clamped to `[0, 1]` so antipodal and coincident
/// points do not produce NaN from rounding.
#[must_use]
pub fn distance_miles(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_MILES * c
}

/// The point reached by travelling `distance_miles` from `origin` on the
/// initial bearing `bearing_degrees` (clockwise from north).
///
/// Longitude is normalized to `[-180, 180)`.
#[must_use]
pub fn destination(origin: Coordinate, distance_miles: f64, bearing_degrees: f64) -> Coordinate {
    let angular = distance_miles / DESTINATION_EARTH_RADIUS_MILES;
    let bearing = bearing_degrees.to_radians();
    let lat1 = origin.lat.to_radians();
    let lng1 = origin.lng.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * bearing.cos()).asin();
    let lng2 = lng1
        + (bearing.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    let lng_deg = (lng2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    Coordinate::new(lat2.to_degrees(), lng_deg)
}

/// Centers to query when scattering a wide-radius search.
///
/// Always the center itself plus N/S/E/W at 70 % of `radius_miles`; with
/// `dense` the four diagonals are added too (9 points total).
#[must_use]
pub fn scatter_centers(center: Coordinate, radius_miles: f64, dense: bool) -> Vec<Coordinate> {
    let offset = radius_miles * SCATTER_OFFSET_FRACTION;
    let mut points = Vec::with_capacity(if dense { 9 } else { 5 });
    points.push(center);
    points.extend(
        CARDINAL_BEARINGS
            .iter()
            .map(|&bearing| destination(center, offset, bearing)),
    );
    if dense {
        points.extend(
            DIAGONAL_BEARINGS
                .iter()
                .map(|&bearing| destination(center, offset, bearing)),
        );
    }
    points
}

#[must_use]
pub fn miles_to_meters(miles: f64) -> f64 {
    miles * METERS_PER_MILE
}

#[must_use]
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}
