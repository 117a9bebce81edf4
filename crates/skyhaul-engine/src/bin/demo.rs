//! Seeds a small world and runs one full flight cycle end to end.
//!
//! Useful for poking at the engine without a frontend:
//! `SKYHAUL_DB_PATH=:memory: cargo run --bin skyhaul-demo`

use anyhow::Result;
use chrono::{Duration, Utc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use skyhaul_core::{
    Aircraft, AircraftCategory, Airport, EngineType, FlightPhase, FuelType, Job, JobType, NavFix,
    Operator, OwnerRef, Payload, PayloadLocation, Simulator, TelemetrySnapshot, FUEL_TANK_COUNT,
};
use skyhaul_engine::config::Config;
use skyhaul_engine::flights::{self, FinalReport, PlanRequest, StartOptions};
use skyhaul_engine::persistence::{accounts, aircraft, airports, db, jobs};
use skyhaul_engine::EngineContext;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skyhaul_engine=debug".parse()?)
                .add_directive("skyhaul_demo=info".parse()?),
        )
        .init();

    let config = Config::from_env();
    let database = db::init_database(&config.db_path, config.db_max_connections).await?;
    let ctx = EngineContext::new(database);

    let pilot = "demo-pilot";
    seed_world(&ctx, pilot).await?;

    let plan = flights::create_plan(
        &ctx,
        pilot,
        Operator::Individual { user_id: pilot.to_string() },
        PlanRequest {
            flight_number: 101,
            origin_icao: Some("KSFO".to_string()),
            destination_icao: Some("KLAX".to_string()),
            alternate_icao: None,
            aircraft_registry: Some("N101SH".to_string()),
            planned_fuel_gal: Some(300.0),
            navlog: vec![
                NavFix {
                    ident: "AVE".to_string(),
                    lat: 35.646,
                    lon: -119.979,
                    altitude_ft: Some(24_000.0),
                },
                NavFix {
                    ident: "SADDE".to_string(),
                    lat: 34.115,
                    lon: -118.978,
                    altitude_ft: Some(7_000.0),
                },
            ],
            payload_ids: vec!["demo-payload".to_string()],
        },
    )
    .await?;
    tracing::info!(flight = %plan.id, "plan filed");

    let start = flights::start_flight(&ctx, pilot, &plan.id, StartOptions::default()).await?;
    tracing::info!(
        fuel_cost_cents = start.fuel_cost_cents,
        "flight started, fuel and payload loading scheduled"
    );

    flights::position_report(&ctx, pilot, &plan.id, snapshot(36.0, -120.5, 24000.0, false)).await?;

    let outcome = flights::complete_flight(
        &ctx,
        pilot,
        &plan.id,
        FinalReport {
            telemetry: snapshot(33.9425, -118.408, 126.0, true),
            log: serde_json::json!({ "landing_rate_fpm": -180 }),
        },
        Simulator::Msfs,
    )
    .await?;

    tracing::info!(
        landed_at = %outcome.landed_at,
        payout_cents = outcome.payout_cents,
        landing_fee_cents = outcome.landing_fee_cents,
        completed_jobs = outcome.completed_job_ids.len(),
        "flight settled"
    );
    let counters = ctx.stats().snapshot();
    tracing::info!(?counters, "engine counters");
    Ok(())
}

fn snapshot(lat: f64, lon: f64, altitude_ft: f64, on_ground: bool) -> TelemetrySnapshot {
    let mut fuel_tanks_gal = [0.0; FUEL_TANK_COUNT];
    fuel_tanks_gal[0] = 120.0;
    fuel_tanks_gal[1] = 120.0;
    TelemetrySnapshot {
        lat,
        lon,
        altitude_ft,
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

async fn seed_world(ctx: &EngineContext, pilot: &str) -> Result<()> {
    let mut conn = ctx.db().pool().acquire().await?;

    accounts::upsert_user(&mut conn, pilot, "Demo Pilot", 100_000_00).await?;

    airports::upsert_airport(
        &mut conn,
        &Airport {
            icao: "KSFO".to_string(),
            name: "San Francisco Intl".to_string(),
            lat: 37.6213,
            lon: -122.379,
            size: 5,
            military: false,
            closed: false,
            sells_avgas: true,
            sells_jetfuel: true,
            avgas_price_cents_per_gal: 650,
            jetfuel_price_cents_per_gal: 520,
            simulators: vec![Simulator::Msfs, Simulator::Xplane],
        },
    )
    .await?;
    airports::upsert_airport(
        &mut conn,
        &Airport {
            icao: "KLAX".to_string(),
            name: "Los Angeles Intl".to_string(),
            lat: 33.9425,
            lon: -118.408,
            size: 5,
            military: false,
            closed: false,
            sells_avgas: true,
            sells_jetfuel: true,
            avgas_price_cents_per_gal: 700,
            jetfuel_price_cents_per_gal: 540,
            simulators: vec![Simulator::Msfs],
        },
    )
    .await?;

    aircraft::upsert_aircraft(
        &mut conn,
        &Aircraft {
            registry: "N101SH".to_string(),
            type_name: "C750".to_string(),
            category: AircraftCategory::Jet,
            engine_type: EngineType::Jet,
            engine_count: 2,
            fuel_type: FuelType::JetFuel,
            tank_capacity_gal: 1100.0,
            mtow_lb: 36_400.0,
            current_airport: "KSFO".to_string(),
            owner: Some(OwnerRef::User(pilot.to_string())),
            fuel_gal: 150.0,
            fuelling_until: None,
            loading_until: None,
            warping_until: None,
            maintenance_until: None,
            lifetime_income: 0,
            lifetime_expense: 0,
            airframe_hours: 412.5,
            engine_hours: [412.5, 412.5, 0.0, 0.0],
            sale_price: None,
            rent_price: None,
        },
    )
    .await?;

    let job_id = Uuid::new_v4().to_string();
    jobs::upsert_job(
        &mut conn,
        &Job {
            id: job_id.clone(),
            origin_icao: "KSFO".to_string(),
            category: "jet".to_string(),
            job_type: JobType::CargoShort,
            value: 2_500_00,
            expires_at: Utc::now() + Duration::hours(12),
            operator: Some(OwnerRef::User(pilot.to_string())),
            created_at: Utc::now(),
        },
    )
    .await?;
    jobs::upsert_payload(
        &mut conn,
        &Payload {
            id: "demo-payload".to_string(),
            job_id,
            weight_lb: 1_800.0,
            location: PayloadLocation::Airport("KSFO".to_string()),
            destination_icao: "KLAX".to_string(),
        },
    )
    .await?;

    tracing::info!("world seeded: two airports, one jet, one cargo job");
    Ok(())
}
