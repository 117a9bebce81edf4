//! Nearest-airport resolver.

use sqlx::SqliteConnection;

use crate::error::EngineResult;
use crate::persistence::airports;
use skyhaul_core::spatial::{coverage_bbox, NEAREST_SEARCH_RADIUS_M};
use skyhaul_core::{Airport, Simulator};

/// Closest airport to a coordinate within the ~10 nm coverage cell,
/// restricted to airports present in the given simulator. Returns None
/// when the coverage query yields no candidates.
pub async fn nearest_airport(
    conn: &mut SqliteConnection,
    lat: f64,
    lon: f64,
    simulator: Simulator,
) -> EngineResult<Option<Airport>> {
    let bbox = coverage_bbox(lat, lon, NEAREST_SEARCH_RADIUS_M);
    let candidates = airports::airports_in_bbox(conn, &bbox).await?;
    Ok(
        skyhaul_core::nearest_airport(&candidates, lat, lon, simulator, NEAREST_SEARCH_RADIUS_M)
            .map(|(airport, _)| airport.clone()),
    )
}
