//! Shared world builders for engine integration tests.

#![allow(dead_code)]

use chrono::{Duration, Utc};

use skyhaul_core::{
    Aircraft, AircraftCategory, Airport, EngineType, FlightPhase, FuelType, Job, JobType, Operator,
    OwnerRef, Payload, PayloadLocation, Simulator, TelemetrySnapshot, FUEL_TANK_COUNT,
};
use skyhaul_engine::flights::PlanRequest;
use skyhaul_engine::persistence::{accounts, aircraft, airports, db, jobs};
use skyhaul_engine::EngineContext;

pub const PILOT: &str = "pilot-1";
pub const STARTING_BALANCE: i64 = 1_000_000_00;

/// Fresh in-memory engine. One connection so every handle sees the same
/// in-memory database.
pub async fn test_ctx() -> EngineContext {
    let database = db::init_database(":memory:", 1).await.expect("in-memory db");
    EngineContext::new(database)
}

pub fn airport(icao: &str, lat: f64, lon: f64, size: i32) -> Airport {
    Airport {
        icao: icao.to_string(),
        name: format!("{icao} test field"),
        lat,
        lon,
        size,
        military: false,
        closed: false,
        sells_avgas: true,
        sells_jetfuel: true,
        avgas_price_cents_per_gal: 650,
        jetfuel_price_cents_per_gal: 500,
        simulators: vec![Simulator::Msfs],
    }
}

pub fn jet(registry: &str, at: &str, owner: OwnerRef) -> Aircraft {
    Aircraft {
        registry: registry.to_string(),
        type_name: "C750".to_string(),
        category: AircraftCategory::Jet,
        engine_type: EngineType::Jet,
        engine_count: 2,
        fuel_type: FuelType::JetFuel,
        tank_capacity_gal: 1100.0,
        mtow_lb: 36_400.0,
        current_airport: at.to_string(),
        owner: Some(owner),
        fuel_gal: 150.0,
        fuelling_until: None,
        loading_until: None,
        warping_until: None,
        maintenance_until: None,
        lifetime_income: 0,
        lifetime_expense: 0,
        airframe_hours: 100.0,
        engine_hours: [100.0, 100.0, 0.0, 0.0],
        sale_price: None,
        rent_price: None,
    }
}

pub fn snapshot(lat: f64, lon: f64, on_ground: bool) -> TelemetrySnapshot {
    let mut fuel_tanks_gal = [0.0; FUEL_TANK_COUNT];
    fuel_tanks_gal[0] = 70.0;
    fuel_tanks_gal[1] = 70.0;
    TelemetrySnapshot {
        lat,
        lon,
        altitude_ft: if on_ground { 100.0 } else { 24_000.0 },
        heading_deg: 140.0,
        bank_deg: 0.0,
        pitch_deg: 0.0,
        ground_speed_kt: if on_ground { 0.0 } else { 410.0 },
        fuel_tanks_gal,
        on_ground,
        phase: if on_ground { FlightPhase::Landed } else { FlightPhase::Cruise },
        time_warp_seconds: 0,
        reported_at: Utc::now(),
    }
}

pub fn plan_request(origin: &str, dest: &str, registry: &str, fuel_gal: f64) -> PlanRequest {
    PlanRequest {
        flight_number: 101,
        origin_icao: Some(origin.to_string()),
        destination_icao: Some(dest.to_string()),
        alternate_icao: None,
        aircraft_registry: Some(registry.to_string()),
        planned_fuel_gal: Some(fuel_gal),
        navlog: vec![],
        payload_ids: vec![],
    }
}

pub fn individual() -> Operator {
    Operator::Individual { user_id: PILOT.to_string() }
}

/// Pilot with money, KSFO and KLAX, and a jet parked at KSFO.
pub async fn seed_basic(ctx: &EngineContext) {
    let mut conn = ctx.db().pool().acquire().await.expect("acquire");
    accounts::upsert_user(&mut conn, PILOT, "Test Pilot", STARTING_BALANCE)
        .await
        .expect("seed user");
    airports::upsert_airport(&mut conn, &airport("KSFO", 37.6213, -122.379, 5))
        .await
        .expect("seed KSFO");
    airports::upsert_airport(&mut conn, &airport("KLAX", 33.9425, -118.408, 5))
        .await
        .expect("seed KLAX");
    aircraft::upsert_aircraft(&mut conn, &jet("N1SH", "KSFO", OwnerRef::User(PILOT.to_string())))
        .await
        .expect("seed aircraft");
}

/// A taken cargo job with one payload waiting at `origin` for `dest`.
pub async fn seed_job(ctx: &EngineContext, id: &str, origin: &str, dest: &str, value: i64) {
    let mut conn = ctx.db().pool().acquire().await.expect("acquire");
    jobs::upsert_job(
        &mut conn,
        &Job {
            id: id.to_string(),
            origin_icao: origin.to_string(),
            category: "jet".to_string(),
            job_type: JobType::CargoShort,
            value,
            expires_at: Utc::now() + Duration::hours(12),
            operator: Some(OwnerRef::User(PILOT.to_string())),
            created_at: Utc::now(),
        },
    )
    .await
    .expect("seed job");
    jobs::upsert_payload(
        &mut conn,
        &Payload {
            id: format!("{id}-p1"),
            job_id: id.to_string(),
            weight_lb: 1800.0,
            location: PayloadLocation::Airport(origin.to_string()),
            destination_icao: dest.to_string(),
        },
    )
    .await
    .expect("seed payload");
}

pub async fn balance(ctx: &EngineContext, owner: &OwnerRef) -> i64 {
    let mut conn = ctx.db().pool().acquire().await.expect("acquire");
    accounts::balance_of(&mut conn, owner).await.expect("balance")
}

pub fn pilot_ref() -> OwnerRef {
    OwnerRef::User(PILOT.to_string())
}
