//! Flight persistence operations.

use sqlx::SqliteConnection;

use super::{opt_ts_from_column, opt_ts_to_column, ts_from_column, ts_to_column};
use crate::error::EngineResult;
use skyhaul_core::{Flight, NavFix, Operator, TelemetrySnapshot};

/// Upsert a flight. The derived `pilot_id` column is kept in sync so the
/// single-active-flight invariant can be enforced with an indexed query.
pub async fn upsert_flight(conn: &mut SqliteConnection, flight: &Flight) -> EngineResult<()> {
    let operator_json = serde_json::to_string(&flight.operator)?;
    let telemetry_json = flight
        .telemetry
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let final_log_json = flight
        .final_log
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;
    let navlog_json = serde_json::to_string(&flight.navlog)?;
    let payload_ids_json = serde_json::to_string(&flight.payload_ids)?;

    sqlx::query(
        r#"
        INSERT INTO flights (
            id, flight_number, operator, pilot_id,
            origin_icao, destination_icao, alternate_icao, aircraft_registry,
            planned_fuel_gal, created_at, started_at, paused_at, completed_at,
            telemetry, fuel_loading_complete, payload_loading_complete,
            final_log, navlog, payload_ids
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        ON CONFLICT(id) DO UPDATE SET
            flight_number = ?2, operator = ?3, pilot_id = ?4,
            origin_icao = ?5, destination_icao = ?6, alternate_icao = ?7, aircraft_registry = ?8,
            planned_fuel_gal = ?9, started_at = ?11, paused_at = ?12, completed_at = ?13,
            telemetry = ?14, fuel_loading_complete = ?15, payload_loading_complete = ?16,
            final_log = ?17, navlog = ?18, payload_ids = ?19
        "#,
    )
    .bind(&flight.id)
    .bind(flight.flight_number)
    .bind(&operator_json)
    .bind(flight.operator.pilot_id())
    .bind(&flight.origin_icao)
    .bind(&flight.destination_icao)
    .bind(&flight.alternate_icao)
    .bind(&flight.aircraft_registry)
    .bind(flight.planned_fuel_gal)
    .bind(ts_to_column(flight.created_at))
    .bind(opt_ts_to_column(flight.started_at))
    .bind(opt_ts_to_column(flight.paused_at))
    .bind(opt_ts_to_column(flight.completed_at))
    .bind(&telemetry_json)
    .bind(opt_ts_to_column(flight.fuel_loading_complete))
    .bind(opt_ts_to_column(flight.payload_loading_complete))
    .bind(&final_log_json)
    .bind(&navlog_json)
    .bind(&payload_ids_json)
    .execute(conn)
    .await?;
    Ok(())
}

/// Load a single flight by ID.
pub async fn get_flight(conn: &mut SqliteConnection, id: &str) -> EngineResult<Option<Flight>> {
    let row = sqlx::query_as::<_, FlightRow>("SELECT * FROM flights WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    row.map(TryInto::try_into).transpose()
}

/// Flights for a pilot that are started, not paused, and not completed.
/// Re-queried at the moment of Start/Resume rather than cached, so the
/// check serializes under SQLite's single-writer transactions.
pub async fn active_flights_for_pilot(
    conn: &mut SqliteConnection,
    pilot_id: &str,
    exclude_flight: Option<&str>,
) -> EngineResult<Vec<Flight>> {
    let rows = sqlx::query_as::<_, FlightRow>(
        r#"
        SELECT * FROM flights
        WHERE pilot_id = ?1
          AND started_at IS NOT NULL
          AND paused_at IS NULL
          AND completed_at IS NULL
          AND (?2 IS NULL OR id != ?2)
        "#,
    )
    .bind(pilot_id)
    .bind(exclude_flight)
    .fetch_all(conn)
    .await?;
    rows.into_iter().map(TryInto::try_into).collect()
}

/// Count flights on an aircraft that are started and not completed
/// (paused flights still hold the airframe).
pub async fn open_flight_count_for_aircraft(
    conn: &mut SqliteConnection,
    registry: &str,
    exclude_flight: Option<&str>,
) -> EngineResult<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM flights
        WHERE aircraft_registry = ?1
          AND started_at IS NOT NULL
          AND completed_at IS NULL
          AND (?2 IS NULL OR id != ?2)
        "#,
    )
    .bind(registry)
    .bind(exclude_flight)
    .fetch_one(conn)
    .await?;
    Ok(count)
}

/// Delete a flight by ID. Returns whether a row was removed.
pub async fn delete_flight(conn: &mut SqliteConnection, id: &str) -> EngineResult<bool> {
    let result = sqlx::query("DELETE FROM flights WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: String,
    flight_number: i32,
    operator: String,
    #[allow(dead_code)]
    pilot_id: String,
    origin_icao: Option<String>,
    destination_icao: Option<String>,
    alternate_icao: Option<String>,
    aircraft_registry: Option<String>,
    planned_fuel_gal: Option<f64>,
    created_at: String,
    started_at: Option<String>,
    paused_at: Option<String>,
    completed_at: Option<String>,
    telemetry: Option<String>,
    fuel_loading_complete: Option<String>,
    payload_loading_complete: Option<String>,
    final_log: Option<String>,
    navlog: String,
    payload_ids: String,
}

impl TryFrom<FlightRow> for Flight {
    type Error = crate::error::EngineError;

    fn try_from(row: FlightRow) -> EngineResult<Self> {
        let operator: Operator = serde_json::from_str(&row.operator)?;
        let telemetry: Option<TelemetrySnapshot> = row
            .telemetry
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let final_log: Option<serde_json::Value> = row
            .final_log
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;
        let navlog: Vec<NavFix> = serde_json::from_str(&row.navlog)?;
        let payload_ids: Vec<String> = serde_json::from_str(&row.payload_ids)?;

        Ok(Flight {
            id: row.id,
            flight_number: row.flight_number,
            operator,
            origin_icao: row.origin_icao,
            destination_icao: row.destination_icao,
            alternate_icao: row.alternate_icao,
            aircraft_registry: row.aircraft_registry,
            planned_fuel_gal: row.planned_fuel_gal,
            created_at: ts_from_column(&row.created_at),
            started_at: opt_ts_from_column(row.started_at.as_deref()),
            paused_at: opt_ts_from_column(row.paused_at.as_deref()),
            completed_at: opt_ts_from_column(row.completed_at.as_deref()),
            telemetry,
            fuel_loading_complete: opt_ts_from_column(row.fuel_loading_complete.as_deref()),
            payload_loading_complete: opt_ts_from_column(row.payload_loading_complete.as_deref()),
            final_log,
            navlog,
            payload_ids,
        })
    }
}
