//! Job and payload persistence operations.

use sqlx::SqliteConnection;

use super::{
    job_type_from_str, job_type_to_str, owner_from_columns, owner_to_columns, ts_from_column,
    ts_to_column,
};
use crate::error::EngineResult;
use skyhaul_core::{Job, Payload, PayloadLocation};

/// Upsert a job.
pub async fn upsert_job(conn: &mut SqliteConnection, job: &Job) -> EngineResult<()> {
    let (operator_user, operator_airline) = owner_to_columns(&job.operator);
    sqlx::query(
        r#"
        INSERT INTO jobs (
            id, origin_icao, category, job_type, value_cents, expires_at,
            operator_user, operator_airline, created_at
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        ON CONFLICT(id) DO UPDATE SET
            origin_icao = ?2, category = ?3, job_type = ?4, value_cents = ?5,
            expires_at = ?6, operator_user = ?7, operator_airline = ?8
        "#,
    )
    .bind(&job.id)
    .bind(&job.origin_icao)
    .bind(&job.category)
    .bind(job_type_to_str(job.job_type))
    .bind(job.value)
    .bind(ts_to_column(job.expires_at))
    .bind(&operator_user)
    .bind(&operator_airline)
    .bind(ts_to_column(job.created_at))
    .execute(conn)
    .await?;
    Ok(())
}

/// Load a single job by ID.
pub async fn get_job(conn: &mut SqliteConnection, id: &str) -> EngineResult<Option<Job>> {
    let row = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Into::into))
}

/// Delete a job and all of its payloads.
pub async fn delete_job_with_payloads(conn: &mut SqliteConnection, id: &str) -> EngineResult<()> {
    sqlx::query("DELETE FROM payloads WHERE job_id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("DELETE FROM jobs WHERE id = ?1")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Upsert a payload.
pub async fn upsert_payload(conn: &mut SqliteConnection, payload: &Payload) -> EngineResult<()> {
    let (location_airport, location_aircraft) = match &payload.location {
        PayloadLocation::Airport(icao) => (Some(icao.clone()), None),
        PayloadLocation::Aircraft(registry) => (None, Some(registry.clone())),
    };
    sqlx::query(
        r#"
        INSERT INTO payloads (id, job_id, weight_lb, location_airport, location_aircraft, destination_icao)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(id) DO UPDATE SET
            job_id = ?2, weight_lb = ?3, location_airport = ?4, location_aircraft = ?5,
            destination_icao = ?6
        "#,
    )
    .bind(&payload.id)
    .bind(&payload.job_id)
    .bind(payload.weight_lb)
    .bind(&location_airport)
    .bind(&location_aircraft)
    .bind(&payload.destination_icao)
    .execute(conn)
    .await?;
    Ok(())
}

/// Load a single payload by ID.
pub async fn get_payload(conn: &mut SqliteConnection, id: &str) -> EngineResult<Option<Payload>> {
    let row = sqlx::query_as::<_, PayloadRow>("SELECT * FROM payloads WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Into::into))
}

/// All payloads belonging to a job.
pub async fn payloads_for_job(conn: &mut SqliteConnection, job_id: &str) -> EngineResult<Vec<Payload>> {
    let rows = sqlx::query_as::<_, PayloadRow>("SELECT * FROM payloads WHERE job_id = ?1")
        .bind(job_id)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// All payloads currently aboard an aircraft.
pub async fn payloads_on_aircraft(
    conn: &mut SqliteConnection,
    registry: &str,
) -> EngineResult<Vec<Payload>> {
    let rows = sqlx::query_as::<_, PayloadRow>(
        "SELECT * FROM payloads WHERE location_aircraft = ?1",
    )
    .bind(registry)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: String,
    origin_icao: String,
    category: String,
    job_type: String,
    value_cents: i64,
    expires_at: String,
    operator_user: Option<String>,
    operator_airline: Option<String>,
    created_at: String,
}

impl From<JobRow> for Job {
    fn from(row: JobRow) -> Self {
        Job {
            id: row.id,
            origin_icao: row.origin_icao,
            category: row.category,
            job_type: job_type_from_str(&row.job_type),
            value: row.value_cents,
            expires_at: ts_from_column(&row.expires_at),
            operator: owner_from_columns(row.operator_user, row.operator_airline),
            created_at: ts_from_column(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct PayloadRow {
    id: String,
    job_id: String,
    weight_lb: f64,
    location_airport: Option<String>,
    location_aircraft: Option<String>,
    destination_icao: String,
}

impl From<PayloadRow> for Payload {
    fn from(row: PayloadRow) -> Self {
        // An aircraft location wins if both columns are somehow set.
        let location = match (row.location_aircraft, row.location_airport) {
            (Some(registry), _) => PayloadLocation::Aircraft(registry),
            (None, Some(icao)) => PayloadLocation::Airport(icao),
            (None, None) => PayloadLocation::Airport(String::new()),
        };
        Payload {
            id: row.id,
            job_id: row.job_id,
            weight_lb: row.weight_lb,
            location,
            destination_icao: row.destination_icao,
        }
    }
}
