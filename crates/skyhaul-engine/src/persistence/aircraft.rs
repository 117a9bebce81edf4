//! Aircraft persistence operations.

use sqlx::SqliteConnection;

use super::{
    category_from_str, category_to_str, engine_type_from_str, engine_type_to_str,
    fuel_type_from_str, fuel_type_to_str, opt_ts_from_column, opt_ts_to_column, owner_from_columns,
    owner_to_columns,
};
use crate::error::EngineResult;
use skyhaul_core::Aircraft;

/// Upsert an aircraft.
pub async fn upsert_aircraft(conn: &mut SqliteConnection, aircraft: &Aircraft) -> EngineResult<()> {
    let (owner_user, owner_airline) = owner_to_columns(&aircraft.owner);
    let engine_hours_json = serde_json::to_string(&aircraft.engine_hours)?;

    sqlx::query(
        r#"
        INSERT INTO aircraft (
            registry, type_name, category, engine_type, engine_count, fuel_type,
            tank_capacity_gal, mtow_lb, current_airport, owner_user, owner_airline,
            fuel_gal, fuelling_until, loading_until, warping_until, maintenance_until,
            lifetime_income, lifetime_expense, airframe_hours, engine_hours,
            sale_price, rent_price
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)
        ON CONFLICT(registry) DO UPDATE SET
            type_name = ?2, category = ?3, engine_type = ?4, engine_count = ?5, fuel_type = ?6,
            tank_capacity_gal = ?7, mtow_lb = ?8, current_airport = ?9,
            owner_user = ?10, owner_airline = ?11, fuel_gal = ?12,
            fuelling_until = ?13, loading_until = ?14, warping_until = ?15, maintenance_until = ?16,
            lifetime_income = ?17, lifetime_expense = ?18, airframe_hours = ?19, engine_hours = ?20,
            sale_price = ?21, rent_price = ?22
        "#,
    )
    .bind(&aircraft.registry)
    .bind(&aircraft.type_name)
    .bind(category_to_str(aircraft.category))
    .bind(engine_type_to_str(aircraft.engine_type))
    .bind(i64::from(aircraft.engine_count))
    .bind(fuel_type_to_str(aircraft.fuel_type))
    .bind(aircraft.tank_capacity_gal)
    .bind(aircraft.mtow_lb)
    .bind(&aircraft.current_airport)
    .bind(&owner_user)
    .bind(&owner_airline)
    .bind(aircraft.fuel_gal)
    .bind(opt_ts_to_column(aircraft.fuelling_until))
    .bind(opt_ts_to_column(aircraft.loading_until))
    .bind(opt_ts_to_column(aircraft.warping_until))
    .bind(opt_ts_to_column(aircraft.maintenance_until))
    .bind(aircraft.lifetime_income)
    .bind(aircraft.lifetime_expense)
    .bind(aircraft.airframe_hours)
    .bind(&engine_hours_json)
    .bind(aircraft.sale_price)
    .bind(aircraft.rent_price)
    .execute(conn)
    .await?;
    Ok(())
}

/// Load a single aircraft by registry.
pub async fn get_aircraft(
    conn: &mut SqliteConnection,
    registry: &str,
) -> EngineResult<Option<Aircraft>> {
    let row = sqlx::query_as::<_, AircraftRow>("SELECT * FROM aircraft WHERE registry = ?1")
        .bind(registry)
        .fetch_optional(conn)
        .await?;
    row.map(TryInto::try_into).transpose()
}

/// Increment the lifetime income/expense counters in place. Used by the
/// fulfillment resolver so it composes with callers holding their own
/// copy of the aircraft row.
pub async fn add_lifetime(
    conn: &mut SqliteConnection,
    registry: &str,
    income_delta: i64,
    expense_delta: i64,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        UPDATE aircraft
        SET lifetime_income = lifetime_income + ?1,
            lifetime_expense = lifetime_expense + ?2
        WHERE registry = ?3
        "#,
    )
    .bind(income_delta)
    .bind(expense_delta)
    .bind(registry)
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(sqlx::FromRow)]
struct AircraftRow {
    registry: String,
    type_name: String,
    category: String,
    engine_type: String,
    engine_count: i64,
    fuel_type: String,
    tank_capacity_gal: f64,
    mtow_lb: f64,
    current_airport: String,
    owner_user: Option<String>,
    owner_airline: Option<String>,
    fuel_gal: f64,
    fuelling_until: Option<String>,
    loading_until: Option<String>,
    warping_until: Option<String>,
    maintenance_until: Option<String>,
    lifetime_income: i64,
    lifetime_expense: i64,
    airframe_hours: f64,
    engine_hours: String,
    sale_price: Option<i64>,
    rent_price: Option<i64>,
}

impl TryFrom<AircraftRow> for Aircraft {
    type Error = crate::error::EngineError;

    fn try_from(row: AircraftRow) -> EngineResult<Self> {
        let engine_hours: [f64; 4] = serde_json::from_str(&row.engine_hours)?;
        Ok(Aircraft {
            registry: row.registry,
            type_name: row.type_name,
            category: category_from_str(&row.category),
            engine_type: engine_type_from_str(&row.engine_type),
            engine_count: row.engine_count.clamp(0, 4) as u8,
            fuel_type: fuel_type_from_str(&row.fuel_type),
            tank_capacity_gal: row.tank_capacity_gal,
            mtow_lb: row.mtow_lb,
            current_airport: row.current_airport,
            owner: owner_from_columns(row.owner_user, row.owner_airline),
            fuel_gal: row.fuel_gal,
            fuelling_until: opt_ts_from_column(row.fuelling_until.as_deref()),
            loading_until: opt_ts_from_column(row.loading_until.as_deref()),
            warping_until: opt_ts_from_column(row.warping_until.as_deref()),
            maintenance_until: opt_ts_from_column(row.maintenance_until.as_deref()),
            lifetime_income: row.lifetime_income,
            lifetime_expense: row.lifetime_expense,
            airframe_hours: row.airframe_hours,
            engine_hours,
            sale_price: row.sale_price,
            rent_price: row.rent_price,
        })
    }
}
