//! Airport persistence operations.

use sqlx::SqliteConnection;

use crate::error::EngineResult;
use skyhaul_core::{Airport, BoundingBox, Simulator};

/// Upsert an airport.
pub async fn upsert_airport(conn: &mut SqliteConnection, airport: &Airport) -> EngineResult<()> {
    let simulators_json = serde_json::to_string(&airport.simulators)?;
    sqlx::query(
        r#"
        INSERT INTO airports (
            icao, name, lat, lon, size, military, closed,
            sells_avgas, sells_jetfuel, avgas_price_cents, jetfuel_price_cents, simulators
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        ON CONFLICT(icao) DO UPDATE SET
            name = ?2, lat = ?3, lon = ?4, size = ?5, military = ?6, closed = ?7,
            sells_avgas = ?8, sells_jetfuel = ?9,
            avgas_price_cents = ?10, jetfuel_price_cents = ?11, simulators = ?12
        "#,
    )
    .bind(&airport.icao)
    .bind(&airport.name)
    .bind(airport.lat)
    .bind(airport.lon)
    .bind(airport.size)
    .bind(airport.military)
    .bind(airport.closed)
    .bind(airport.sells_avgas)
    .bind(airport.sells_jetfuel)
    .bind(airport.avgas_price_cents_per_gal)
    .bind(airport.jetfuel_price_cents_per_gal)
    .bind(&simulators_json)
    .execute(conn)
    .await?;
    Ok(())
}

/// Load a single airport by ICAO.
pub async fn get_airport(conn: &mut SqliteConnection, icao: &str) -> EngineResult<Option<Airport>> {
    let row = sqlx::query_as::<_, AirportRow>("SELECT * FROM airports WHERE icao = ?1")
        .bind(icao)
        .fetch_optional(conn)
        .await?;
    row.map(TryInto::try_into).transpose()
}

/// Load all airports inside a coverage bounding box.
pub async fn airports_in_bbox(
    conn: &mut SqliteConnection,
    bbox: &BoundingBox,
) -> EngineResult<Vec<Airport>> {
    let rows = sqlx::query_as::<_, AirportRow>(
        r#"
        SELECT * FROM airports
        WHERE lat BETWEEN ?1 AND ?2 AND lon BETWEEN ?3 AND ?4
        "#,
    )
    .bind(bbox.min_lat)
    .bind(bbox.max_lat)
    .bind(bbox.min_lon)
    .bind(bbox.max_lon)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(TryInto::try_into).collect()
}

#[derive(sqlx::FromRow)]
struct AirportRow {
    icao: String,
    name: String,
    lat: f64,
    lon: f64,
    size: i32,
    military: bool,
    closed: bool,
    sells_avgas: bool,
    sells_jetfuel: bool,
    avgas_price_cents: i64,
    jetfuel_price_cents: i64,
    simulators: String,
}

impl TryFrom<AirportRow> for Airport {
    type Error = crate::error::EngineError;

    fn try_from(row: AirportRow) -> EngineResult<Self> {
        let simulators: Vec<Simulator> = serde_json::from_str(&row.simulators)?;
        Ok(Airport {
            icao: row.icao,
            name: row.name,
            lat: row.lat,
            lon: row.lon,
            size: row.size,
            military: row.military,
            closed: row.closed,
            sells_avgas: row.sells_avgas,
            sells_jetfuel: row.sells_jetfuel,
            avgas_price_cents_per_gal: row.avgas_price_cents,
            jetfuel_price_cents_per_gal: row.jetfuel_price_cents,
            simulators,
        })
    }
}
