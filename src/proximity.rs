//! Great-circle distance and "nearby circle" ranking.
//!
//! Distances use the haversine formula on a sphere of radius 6,371,000 m.
//! That is a spherical approximation of the Earth, off from the ellipsoidal
//! answer by up to roughly 0.5%. Membership and display thresholds were tuned
//! against this model, so it is kept as is.
//!
//! Every function here is pure: callers pass in a snapshot of circles and get a
//! freshly computed answer back. Nothing is cached between calls.

use crate::models::Circle;
use serde::{Deserialize, Serialize};

/// Mean Earth radius used by [`haversine_distance`], in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Fixed proximity window used by [`find_nearby`] when the caller has no preference.
pub const DEFAULT_NEARBY_THRESHOLD_M: f64 = 1000.0;

/// A latitude/longitude pair in decimal degrees.
///
/// Serialized as `[lat, lon]`, which is how circle centers are stored on disk
/// and exchanged with the editor.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub const fn lat(&self) -> f64 {
        self.lat
    }

    pub const fn lon(&self) -> f64 {
        self.lon
    }

    /// True when both coordinates are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self { lat, lon }
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(point: GeoPoint) -> Self {
        [point.lat, point.lon]
    }
}

/// Haversine distance between two points, in metres.
///
/// Identical points give exactly `0.0`. Non-finite input is not rejected and
/// simply propagates into the result.
pub fn haversine_distance(p1: &GeoPoint, p2: &GeoPoint) -> f64 {
    let d_lat = (p2.lat - p1.lat).to_radians();
    let d_lon = (p2.lon - p1.lon).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + p1.lat.to_radians().cos() * p2.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push `a` just past 1 for near-antipodal points; NaN passes through
    let a = a.clamp(0.0, 1.0);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Whether `point` lies inside the circle (boundary included).
///
/// A radius of zero or below never contains anything except, for a zero
/// radius, the center itself.
pub fn is_within_circle(point: &GeoPoint, circle: &Circle) -> bool {
    haversine_distance(point, &circle.center) <= circle.radius
}

/// A circle together with its distance from the query point.
#[derive(Clone, Debug, Serialize)]
pub struct NearbyCircle<'a> {
    pub circle: &'a Circle,
    /// Distance from the query point to the circle center, in metres.
    pub distance: f64,
}

/// Ranks the circles that are "nearby" `point`.
///
/// A circle qualifies when its center is within `threshold_m` of the point, or
/// when the point falls inside the circle's own radius. Either one is enough.
/// The result is sorted by ascending distance; equal distances keep their
/// input order.
pub fn rank_nearby<'a>(
    point: &GeoPoint,
    circles: &'a [Circle],
    threshold_m: f64,
) -> Vec<NearbyCircle<'a>> {
    let mut nearby: Vec<NearbyCircle<'a>> = circles
        .iter()
        .map(|circle| NearbyCircle {
            circle,
            distance: haversine_distance(point, &circle.center),
        })
        .filter(|candidate| {
            candidate.distance <= threshold_m || candidate.distance <= candidate.circle.radius
        })
        .collect();

    // sort_by is stable
    nearby.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    nearby
}

/// Same selection and order as [`rank_nearby`], without the distances.
pub fn find_nearby<'a>(
    point: &GeoPoint,
    circles: &'a [Circle],
    threshold_m: f64,
) -> Vec<&'a Circle> {
    rank_nearby(point, circles, threshold_m)
        .into_iter()
        .map(|nearby| nearby.circle)
        .collect()
}

/// Circles whose own radius contains `point`, closest center first.
pub fn containing_circles<'a>(point: &GeoPoint, circles: &'a [Circle]) -> Vec<NearbyCircle<'a>> {
    let mut containing: Vec<NearbyCircle<'a>> = circles
        .iter()
        .map(|circle| NearbyCircle {
            circle,
            distance: haversine_distance(point, &circle.center),
        })
        .filter(|candidate| candidate.distance <= candidate.circle.radius)
        .collect();

    containing.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    containing
}
