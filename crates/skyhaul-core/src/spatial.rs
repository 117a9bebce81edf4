//! Spatial math for airport resolution.

use crate::models::{Airport, Simulator};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters per nautical mile.
pub const NM_M: f64 = 1852.0;

/// Coverage radius for nearest-airport searches (about 10 nm).
pub const NEAREST_SEARCH_RADIUS_M: f64 = 10.0 * NM_M;

/// Proximity threshold for matching a final position to a planned
/// destination/alternate/origin on completion.
pub const LANDING_MATCH_RADIUS_M: f64 = 5000.0;

/// Great-circle distance between two coordinates in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Bounding box covering `radius_m` around a coordinate, used to keep
/// the coverage query cheap before exact distance filtering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

pub fn coverage_bbox(lat: f64, lon: f64, radius_m: f64) -> BoundingBox {
    let dlat = radius_m / 111_320.0;
    // Guard against the poles blowing up the longitude span.
    let cos_lat = lat.to_radians().cos().abs().max(0.01);
    let dlon = radius_m / (111_320.0 * cos_lat);
    BoundingBox {
        min_lat: lat - dlat,
        max_lat: lat + dlat,
        min_lon: lon - dlon,
        max_lon: lon + dlon,
    }
}

/// Pick the closest airport to a coordinate from a candidate set,
/// restricted to the search radius and the requested simulator.
/// Returns the winner and its distance in meters.
pub fn nearest_airport<'a>(
    candidates: &'a [Airport],
    lat: f64,
    lon: f64,
    simulator: Simulator,
    radius_m: f64,
) -> Option<(&'a Airport, f64)> {
    candidates
        .iter()
        .filter(|a| a.simulators.contains(&simulator))
        .map(|a| (a, haversine_distance(lat, lon, a.lat, a.lon)))
        .filter(|(_, d)| *d <= radius_m)
        .min_by(|(_, d1), (_, d2)| d1.total_cmp(d2))
}
