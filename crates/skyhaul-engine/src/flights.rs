//! Flight state machine.
//!
//! Drives plan -> start -> position-report* -> pause/resume ->
//! complete | abort, reconciling aircraft resources and posting the
//! financial settlement in the same transaction as each transition.

use chrono::{DateTime, Duration, Utc};
use sqlx::SqliteConnection;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth;
use crate::error::{EngineError, EngineResult};
use crate::fulfillment;
use crate::nearest;
use crate::persistence::{accounts, aircraft, airports, flights, jobs, records};
use crate::{stats, EngineContext};
use skyhaul_core::rates::cruise_speed_kt;
use skyhaul_core::settlement::CLOSED_AIRPORT_FINE_CENTS;
use skyhaul_core::spatial::{haversine_distance, LANDING_MATCH_RADIUS_M, NM_M};
use skyhaul_core::{
    flight_number_valid, landing_fee_cents, plan_fuel_transfer, plan_payload_transfer, Airport,
    Cents, FinancialRecord, Flight, FlightPhase, FlightState, FuelTransferRequest, LedgerAmount,
    NavFix, Operator, Payload, PayloadLocation, PayloadTransferRequest, RecordCategory, Simulator,
    TelemetrySnapshot,
};

/// Trailing position reports are tolerated this long after a pause.
const PAUSE_REPORT_GRACE_SECS: i64 = 60;

/// Fields of a flight plan the owner can set while in Planning.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub flight_number: i32,
    pub origin_icao: Option<String>,
    pub destination_icao: Option<String>,
    pub alternate_icao: Option<String>,
    pub aircraft_registry: Option<String>,
    pub planned_fuel_gal: Option<f64>,
    pub navlog: Vec<NavFix>,
    pub payload_ids: Vec<String>,
}

/// Create a new flight plan for `operator`.
pub async fn create_plan(
    ctx: &EngineContext,
    caller: &str,
    operator: Operator,
    req: PlanRequest,
) -> EngineResult<Flight> {
    let mut tx = ctx.db().pool().begin().await?;

    let flight = Flight {
        id: Uuid::new_v4().to_string(),
        flight_number: req.flight_number,
        operator,
        origin_icao: req.origin_icao,
        destination_icao: req.destination_icao,
        alternate_icao: req.alternate_icao,
        aircraft_registry: req.aircraft_registry,
        planned_fuel_gal: req.planned_fuel_gal,
        created_at: Utc::now(),
        started_at: None,
        paused_at: None,
        completed_at: None,
        telemetry: None,
        fuel_loading_complete: None,
        payload_loading_complete: None,
        final_log: None,
        navlog: req.navlog,
        payload_ids: req.payload_ids,
    };
    auth::authorize_plan_admin(&mut tx, &flight, caller).await?;

    flights::upsert_flight(&mut tx, &flight).await?;
    tx.commit().await?;

    info!(flight = %flight.id, "flight plan created");
    Ok(flight)
}

/// Edit a flight plan. Navlog fixes and payload assignments are replaced
/// wholesale. Only permitted while the flight has not started.
pub async fn update_plan(
    ctx: &EngineContext,
    caller: &str,
    flight_id: &str,
    req: PlanRequest,
) -> EngineResult<Flight> {
    let mut tx = ctx.db().pool().begin().await?;

    let mut flight = load_flight(&mut tx, flight_id).await?;
    auth::authorize_plan_admin(&mut tx, &flight, caller).await?;
    if flight.state() != FlightState::Planning {
        return Err(EngineError::InvalidState(format!(
            "flight {flight_id} has already started"
        )));
    }

    flight.flight_number = req.flight_number;
    flight.origin_icao = req.origin_icao;
    flight.destination_icao = req.destination_icao;
    flight.alternate_icao = req.alternate_icao;
    flight.aircraft_registry = req.aircraft_registry;
    flight.planned_fuel_gal = req.planned_fuel_gal;
    flight.navlog = req.navlog;
    flight.payload_ids = req.payload_ids;

    flights::upsert_flight(&mut tx, &flight).await?;
    tx.commit().await?;
    Ok(flight)
}

/// Delete a flight plan. Only permitted while the flight has not started.
pub async fn delete_plan(ctx: &EngineContext, caller: &str, flight_id: &str) -> EngineResult<()> {
    let mut tx = ctx.db().pool().begin().await?;

    let flight = load_flight(&mut tx, flight_id).await?;
    auth::authorize_plan_admin(&mut tx, &flight, caller).await?;
    if flight.state() != FlightState::Planning {
        return Err(EngineError::InvalidState(format!(
            "flight {flight_id} has already started"
        )));
    }

    flights::delete_flight(&mut tx, flight_id).await?;
    tx.commit().await?;
    info!(flight = flight_id, "flight plan deleted");
    Ok(())
}

/// Caller-supplied overrides for Start.
#[derive(Debug, Clone, Copy, Default)]
pub struct StartOptions {
    /// Proceed (without fuelling) when the origin sells no matching fuel.
    pub skip_fuel_when_not_sold: bool,
    /// Proceed even if the aircraft carries payloads outside this plan.
    pub ignore_extra_payloads: bool,
}

#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub fuel_cost_cents: Cents,
    pub fuel_loading_complete: Option<DateTime<Utc>>,
    pub payload_loading_complete: Option<DateTime<Utc>>,
}

/// Validate preconditions and start a planned flight.
pub async fn start_flight(
    ctx: &EngineContext,
    caller: &str,
    flight_id: &str,
    opts: StartOptions,
) -> EngineResult<StartOutcome> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let mut flight = load_flight(&mut tx, flight_id).await?;
    auth::authorize_flight_crew(&mut tx, &flight, caller).await?;
    if flight.state() != FlightState::Planning {
        return Err(EngineError::InvalidState(format!(
            "flight {flight_id} is {:?}",
            flight.state()
        )));
    }
    if !flight_number_valid(flight.flight_number) {
        return Err(EngineError::InvalidInput(format!(
            "flight number {} is outside 1..=9999",
            flight.flight_number
        )));
    }

    let origin = flight
        .origin_icao
        .clone()
        .ok_or_else(|| EngineError::InvalidInput("flight plan has no origin".to_string()))?;
    if flight.destination_icao.is_none() {
        return Err(EngineError::InvalidInput("flight plan has no destination".to_string()));
    }
    let registry = flight
        .aircraft_registry
        .clone()
        .ok_or_else(|| EngineError::InvalidInput("flight plan has no aircraft".to_string()))?;
    let planned_fuel = flight
        .planned_fuel_gal
        .ok_or_else(|| EngineError::InvalidInput("flight plan has no fuel quantity".to_string()))?;

    let mut ac = aircraft::get_aircraft(&mut tx, &registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    if planned_fuel < 0.0 || planned_fuel > ac.tank_capacity_gal {
        return Err(EngineError::InvalidInput(format!(
            "fuel quantity {planned_fuel} gal is outside 0..={} gal",
            ac.tank_capacity_gal
        )));
    }
    if ac.current_airport != origin {
        // Distinguishable status: the caller may offer to ferry instead.
        return Err(EngineError::AircraftNotAtOrigin { registry, origin });
    }
    if !ac.can_start_flight(now)
        || flights::open_flight_count_for_aircraft(&mut tx, &registry, Some(flight_id)).await? > 0
    {
        return Err(EngineError::InvalidState(format!(
            "aircraft {registry} is unavailable"
        )));
    }

    // One active flight per pilot, re-checked at the moment of start.
    let pilot = flight.operator.pilot_id().to_string();
    if !flights::active_flights_for_pilot(&mut tx, &pilot, Some(flight_id))
        .await?
        .is_empty()
    {
        return Err(EngineError::InvalidState(format!(
            "pilot {pilot} already has an active flight"
        )));
    }

    // Every assigned payload must be waiting at the origin or already aboard.
    let mut to_load_lb = 0.0;
    let mut to_load: Vec<Payload> = Vec::new();
    for payload_id in &flight.payload_ids {
        let payload = jobs::get_payload(&mut tx, payload_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payload {payload_id}")))?;
        let waiting_at_origin = match &payload.location {
            PayloadLocation::Aircraft(r) if *r == registry => false,
            PayloadLocation::Airport(icao) if *icao == origin => true,
            other => {
                return Err(EngineError::InvalidState(format!(
                    "payload {payload_id} is at {other:?}, not at {origin}"
                )));
            }
        };
        if waiting_at_origin {
            to_load_lb += payload.weight_lb;
            to_load.push(payload);
        }
    }

    if !opts.ignore_extra_payloads {
        let aboard = jobs::payloads_on_aircraft(&mut tx, &registry).await?;
        if let Some(stray) = aboard.iter().find(|p| !flight.payload_ids.contains(&p.id)) {
            return Err(EngineError::InvalidState(format!(
                "payload {} aboard {registry} is not part of this flight plan",
                stray.id
            )));
        }
    }

    let origin_airport = airports::get_airport(&mut tx, &origin)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("airport {origin}")))?;

    // Fuel loading: price, charge, and schedule.
    let fuel_plan = plan_fuel_transfer(
        &FuelTransferRequest {
            current_gal: ac.fuel_gal,
            capacity_gal: ac.tank_capacity_gal,
            target_gal: planned_fuel,
            category: ac.category,
            fuel_type: ac.fuel_type,
            airport: &origin_airport,
            skip_when_not_sold: opts.skip_fuel_when_not_sold,
            in_progress_until: ac.fuelling_until,
        },
        now,
    )?;
    let account = flight.operator.account();
    if fuel_plan.cost_cents > 0 {
        accounts::debit_checked(&mut tx, &account, fuel_plan.cost_cents).await?;
        records::insert_record(
            &mut tx,
            &FinancialRecord {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                category: RecordCategory::Fuel,
                account,
                amount: LedgerAmount::Expense(fuel_plan.cost_cents),
                description: format!(
                    "{:.1} gal of fuel at {origin} for flight {}",
                    fuel_plan.gallons_moved, flight.flight_number
                ),
                aircraft_registry: Some(registry.clone()),
                airport_icao: Some(origin.clone()),
                parent_record_id: None,
            },
        )
        .await?;
        ac.lifetime_expense += fuel_plan.cost_cents;
    }
    ac.fuel_gal = fuel_plan.resulting_gal;
    ac.fuelling_until = fuel_plan.completes_at;
    flight.fuel_loading_complete = fuel_plan.completes_at;

    // Payload loading: move waiting payloads aboard and schedule.
    for mut payload in to_load {
        payload.location = PayloadLocation::Aircraft(registry.clone());
        jobs::upsert_payload(&mut tx, &payload).await?;
    }
    let loading_complete = plan_payload_transfer(
        &PayloadTransferRequest {
            weight_lb: to_load_lb,
            category: ac.category,
            in_progress_until: ac.loading_until,
        },
        now,
    )?;
    ac.loading_until = loading_complete;
    flight.payload_loading_complete = loading_complete;

    if flight.alternate_icao.is_none() {
        flight.alternate_icao = Some(origin.clone());
    }
    flight.started_at = Some(now);

    aircraft::upsert_aircraft(&mut tx, &ac).await?;
    flights::upsert_flight(&mut tx, &flight).await?;
    tx.commit().await?;

    ctx.stats().bump(stats::FLIGHTS_STARTED);
    if fuel_plan.cost_cents > 0 {
        ctx.stats().bump(stats::RECORDS_POSTED);
    }
    info!(flight = flight_id, cost = fuel_plan.cost_cents, "flight started");

    Ok(StartOutcome {
        fuel_cost_cents: fuel_plan.cost_cents,
        fuel_loading_complete: fuel_plan.completes_at,
        payload_loading_complete: loading_complete,
    })
}

/// Overwrite the live telemetry snapshot. No financial side effects.
///
/// Reports are accepted for one minute after a pause so trailing
/// simulator traffic does not error out.
pub async fn position_report(
    ctx: &EngineContext,
    caller: &str,
    flight_id: &str,
    snapshot: TelemetrySnapshot,
) -> EngineResult<()> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let mut flight = load_flight(&mut tx, flight_id).await?;
    auth::authorize_flight_crew(&mut tx, &flight, caller).await?;
    match flight.state() {
        FlightState::Planning => {
            return Err(EngineError::InvalidState(format!(
                "flight {flight_id} has not started"
            )))
        }
        FlightState::Completed => {
            return Err(EngineError::InvalidState(format!(
                "flight {flight_id} is already completed"
            )))
        }
        FlightState::Paused => {
            let paused_at = flight.paused_at.unwrap_or(now);
            if now - paused_at > Duration::seconds(PAUSE_REPORT_GRACE_SECS) {
                return Err(EngineError::InvalidState(format!(
                    "flight {flight_id} is paused"
                )));
            }
        }
        FlightState::Active => {}
    }

    flight.telemetry = Some(snapshot);
    flights::upsert_flight(&mut tx, &flight).await?;
    tx.commit().await?;
    Ok(())
}

/// Pause an active flight.
pub async fn pause_flight(ctx: &EngineContext, caller: &str, flight_id: &str) -> EngineResult<()> {
    let mut tx = ctx.db().pool().begin().await?;

    let mut flight = load_flight(&mut tx, flight_id).await?;
    auth::authorize_flight_crew(&mut tx, &flight, caller).await?;
    if flight.state() != FlightState::Active {
        return Err(EngineError::InvalidState(format!(
            "flight {flight_id} is {:?}",
            flight.state()
        )));
    }

    flight.paused_at = Some(Utc::now());
    flights::upsert_flight(&mut tx, &flight).await?;
    tx.commit().await?;
    info!(flight = flight_id, "flight paused");
    Ok(())
}

/// Resume a paused flight. The single-active-flight invariant is
/// re-checked across all of the pilot's flights, since another one could
/// have started while this one sat paused.
pub async fn resume_flight(ctx: &EngineContext, caller: &str, flight_id: &str) -> EngineResult<()> {
    let mut tx = ctx.db().pool().begin().await?;

    let mut flight = load_flight(&mut tx, flight_id).await?;
    auth::authorize_flight_crew(&mut tx, &flight, caller).await?;
    if flight.state() != FlightState::Paused {
        return Err(EngineError::InvalidState(format!(
            "flight {flight_id} is not paused"
        )));
    }

    let pilot = flight.operator.pilot_id().to_string();
    if !flights::active_flights_for_pilot(&mut tx, &pilot, Some(flight_id))
        .await?
        .is_empty()
    {
        return Err(EngineError::InvalidState(format!(
            "pilot {pilot} already has an active flight"
        )));
    }

    flight.paused_at = None;
    flights::upsert_flight(&mut tx, &flight).await?;
    tx.commit().await?;
    info!(flight = flight_id, "flight resumed");
    Ok(())
}

#[derive(Debug, Clone)]
pub struct AbortOutcome {
    pub returned_to: String,
    pub was_airborne: bool,
    /// When the aircraft becomes available again after an airborne abort.
    pub reappears_at: Option<DateTime<Utc>>,
}

/// Abort a started flight. The plan survives and reverts to Planning.
pub async fn abort_flight(
    ctx: &EngineContext,
    caller: &str,
    flight_id: &str,
    simulator: Simulator,
) -> EngineResult<AbortOutcome> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let mut flight = load_flight(&mut tx, flight_id).await?;
    auth::authorize_flight_crew(&mut tx, &flight, caller).await?;
    if flight.started_at.is_none() || flight.completed_at.is_some() {
        return Err(EngineError::InvalidState(format!(
            "flight {flight_id} is {:?}",
            flight.state()
        )));
    }
    let started_at = flight.started_at.unwrap_or(now);

    let registry = flight
        .aircraft_registry
        .clone()
        .ok_or_else(|| EngineError::InvalidState("started flight has no aircraft".to_string()))?;
    let mut ac = aircraft::get_aircraft(&mut tx, &registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    let origin = flight.origin_icao.clone().unwrap_or_else(|| ac.current_airport.clone());

    // Unfinished loading windows keep running on the airframe itself.
    if let Some(t) = flight.fuel_loading_complete.filter(|t| *t > now) {
        ac.fuelling_until = Some(t);
    }
    if let Some(t) = flight.payload_loading_complete.filter(|t| *t > now) {
        ac.loading_until = Some(t);
    }

    let telemetry = flight.telemetry.clone();
    let airborne = telemetry.as_ref().map(|t| !t.on_ground).unwrap_or(false);
    let mut reappears_at = None;

    let returned_to = match &telemetry {
        Some(t) => {
            let resolved = nearest::nearest_airport(&mut tx, t.lat, t.lon, simulator)
                .await?
                .map(|a| a.icao)
                .unwrap_or_else(|| origin.clone());

            if airborne {
                // Synthetic return leg at the engine-type cruise speed,
                // then a deferred delay repaying saved time-warp seconds.
                let dest_airport = airports::get_airport(&mut tx, &resolved)
                    .await?
                    .ok_or_else(|| EngineError::NotFound(format!("airport {resolved}")))?;
                let cruise_kt = cruise_speed_kt(ac.engine_type);
                let return_hours = if cruise_kt > 0.0 {
                    haversine_distance(t.lat, t.lon, dest_airport.lat, dest_airport.lon)
                        / NM_M
                        / cruise_kt
                } else {
                    0.0
                };
                let elapsed_hours = (now - started_at).num_seconds() as f64 / 3600.0;
                ac.accrue_hours(elapsed_hours + return_hours);

                let delay_secs = (return_hours * 3600.0).round() as i64 + t.time_warp_seconds;
                let reappear = now + Duration::seconds(delay_secs.max(0));
                ac.warping_until = Some(reappear);
                reappears_at = Some(reappear);
            } else {
                let elapsed_hours = (now - started_at).num_seconds() as f64 / 3600.0;
                ac.accrue_hours(elapsed_hours);
            }

            ac.fuel_gal = t.total_fuel_gal().clamp(0.0, ac.tank_capacity_gal);
            resolved
        }
        // Never left the gate: the aircraft stays where it is.
        None => origin.clone(),
    };
    ac.current_airport = returned_to.clone();

    flight.telemetry = None;
    flight.started_at = None;
    flight.paused_at = None;
    flight.fuel_loading_complete = None;
    flight.payload_loading_complete = None;

    aircraft::upsert_aircraft(&mut tx, &ac).await?;
    flights::upsert_flight(&mut tx, &flight).await?;
    tx.commit().await?;

    ctx.stats().bump(stats::FLIGHTS_ABORTED);
    info!(flight = flight_id, returned_to = %returned_to, airborne, "flight aborted");

    Ok(AbortOutcome { returned_to, was_airborne: airborne, reappears_at })
}

/// Final report submitted on completion.
#[derive(Debug, Clone)]
pub struct FinalReport {
    pub telemetry: TelemetrySnapshot,
    pub log: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct CompleteOutcome {
    pub landed_at: String,
    pub parent_record_id: Option<String>,
    pub landing_fee_cents: Cents,
    pub closed_airport_fine_cents: Cents,
    pub payout_cents: Cents,
    pub late_fine_cents: Cents,
    pub completed_job_ids: Vec<String>,
    pub adopted_fuel_records: u64,
}

/// Complete an active flight and settle it.
pub async fn complete_flight(
    ctx: &EngineContext,
    caller: &str,
    flight_id: &str,
    report: FinalReport,
    simulator: Simulator,
) -> EngineResult<CompleteOutcome> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let mut flight = load_flight(&mut tx, flight_id).await?;
    auth::authorize_flight_crew(&mut tx, &flight, caller).await?;
    if flight.state() != FlightState::Active {
        return Err(EngineError::InvalidState(format!(
            "flight {flight_id} is {:?}",
            flight.state()
        )));
    }
    let started_at = flight.started_at.unwrap_or(now);

    let registry = flight
        .aircraft_registry
        .clone()
        .ok_or_else(|| EngineError::InvalidState("started flight has no aircraft".to_string()))?;
    let mut ac = aircraft::get_aircraft(&mut tx, &registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    let origin = flight.origin_icao.clone().unwrap_or_else(|| ac.current_airport.clone());

    let telemetry = report.telemetry.clone();
    let crashed = telemetry.phase == FlightPhase::Crashed;

    flight.telemetry = Some(report.telemetry);
    flight.final_log = Some(report.log);
    flight.completed_at = Some(now);
    // The plan's navlog fixes are obsolete once the flight is flown.
    flight.navlog.clear();
    flight.fuel_loading_complete = None;
    flight.payload_loading_complete = None;

    let elapsed_hours = (now - started_at).num_seconds() as f64 / 3600.0;
    ac.accrue_hours(elapsed_hours);
    ac.fuel_gal = telemetry.total_fuel_gal().clamp(0.0, ac.tank_capacity_gal);

    if crashed {
        // Damage modeling is future work: route home, no payout, no fees.
        warn!(flight = flight_id, "flight completed with a crash");
        ac.current_airport = origin.clone();
        aircraft::upsert_aircraft(&mut tx, &ac).await?;
        flights::upsert_flight(&mut tx, &flight).await?;
        tx.commit().await?;
        ctx.stats().bump(stats::FLIGHTS_COMPLETED);
        return Ok(CompleteOutcome {
            landed_at: origin,
            parent_record_id: None,
            landing_fee_cents: 0,
            closed_airport_fine_cents: 0,
            payout_cents: 0,
            late_fine_cents: 0,
            completed_job_ids: vec![],
            adopted_fuel_records: 0,
        });
    }

    let landed = resolve_landing_airport(&mut tx, &flight, &telemetry, &origin, simulator).await?;
    ac.current_airport = landed.icao.clone();

    aircraft::upsert_aircraft(&mut tx, &ac).await?;
    flights::upsert_flight(&mut tx, &flight).await?;

    // Top-level settlement record; everything else parents onto it.
    let account = flight.operator.account();
    let parent_id = Uuid::new_v4().to_string();
    records::insert_record(
        &mut tx,
        &FinancialRecord {
            id: parent_id.clone(),
            timestamp: now,
            category: RecordCategory::Flight,
            account: account.clone(),
            amount: LedgerAmount::Income(0),
            description: format!(
                "Flight {} {origin}-{}",
                flight.flight_number, landed.icao
            ),
            aircraft_registry: Some(registry.clone()),
            airport_icao: Some(landed.icao.clone()),
            parent_record_id: None,
        },
    )
    .await?;

    // Unload payloads that reached their destination and settle their jobs.
    let mut arrived: Vec<String> = Vec::new();
    for payload_id in &flight.payload_ids {
        let Some(mut payload) = jobs::get_payload(&mut tx, payload_id).await? else {
            continue;
        };
        if payload.location == PayloadLocation::Aircraft(registry.clone())
            && payload.destination_icao == landed.icao
        {
            payload.location = PayloadLocation::Airport(landed.icao.clone());
            jobs::upsert_payload(&mut tx, &payload).await?;
            arrived.push(payload.id.clone());
        }
    }
    let settled =
        fulfillment::resolve_arrivals(&mut tx, &arrived, now, Some(&parent_id), Some(&registry))
            .await?;

    // Landing fee, plus a fine if the field is closed. Fees are charged
    // even when they push the balance negative.
    let fee = landing_fee_cents(ac.mtow_lb, landed.size, landed.military);
    if fee > 0 {
        accounts::debit_unchecked(&mut tx, &account, fee).await?;
        records::insert_record(
            &mut tx,
            &FinancialRecord {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                category: RecordCategory::AirportFees,
                account: account.clone(),
                amount: LedgerAmount::Expense(fee),
                description: format!("Landing fee at {}", landed.icao),
                aircraft_registry: Some(registry.clone()),
                airport_icao: Some(landed.icao.clone()),
                parent_record_id: Some(parent_id.clone()),
            },
        )
        .await?;
        aircraft::add_lifetime(&mut tx, &registry, 0, fee).await?;
    }
    let mut closed_fine = 0;
    if landed.closed {
        closed_fine = CLOSED_AIRPORT_FINE_CENTS;
        accounts::debit_unchecked(&mut tx, &account, closed_fine).await?;
        records::insert_record(
            &mut tx,
            &FinancialRecord {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                category: RecordCategory::Fines,
                account: account.clone(),
                amount: LedgerAmount::Expense(closed_fine),
                description: format!("Landing at closed airport {}", landed.icao),
                aircraft_registry: Some(registry.clone()),
                airport_icao: Some(landed.icao.clone()),
                parent_record_id: Some(parent_id.clone()),
            },
        )
        .await?;
        aircraft::add_lifetime(&mut tx, &registry, 0, closed_fine).await?;
    }

    // Fuel bought at the origin before or during this flight now belongs
    // to this flight's settlement.
    let adopted =
        records::adopt_unlinked_fuel_records(&mut tx, &registry, &origin, &parent_id).await?;

    tx.commit().await?;

    ctx.stats().bump(stats::FLIGHTS_COMPLETED);
    for _ in &settled.completed_job_ids {
        ctx.stats().bump(stats::JOBS_COMPLETED);
    }
    info!(
        flight = flight_id,
        landed = %landed.icao,
        payout = settled.payout_cents,
        fee,
        "flight completed"
    );

    Ok(CompleteOutcome {
        landed_at: landed.icao,
        parent_record_id: Some(parent_id),
        landing_fee_cents: fee,
        closed_airport_fine_cents: closed_fine,
        payout_cents: settled.payout_cents,
        late_fine_cents: settled.fine_cents,
        completed_job_ids: settled.completed_job_ids,
        adopted_fuel_records: adopted,
    })
}

/// Landing airport resolution: destination, then alternate, then origin
/// (each within 5000 m of the final position), then a nearest-airport
/// search, then the origin as last resort.
async fn resolve_landing_airport(
    conn: &mut SqliteConnection,
    flight: &Flight,
    telemetry: &TelemetrySnapshot,
    origin: &str,
    simulator: Simulator,
) -> EngineResult<Airport> {
    let mut candidates: Vec<&str> = Vec::new();
    if let Some(dest) = flight.destination_icao.as_deref() {
        candidates.push(dest);
    }
    if let Some(alt) = flight.alternate_icao.as_deref() {
        candidates.push(alt);
    }
    candidates.push(origin);

    for icao in candidates {
        if let Some(airport) = airports::get_airport(conn, icao).await? {
            let dist = haversine_distance(telemetry.lat, telemetry.lon, airport.lat, airport.lon);
            if dist < LANDING_MATCH_RADIUS_M {
                return Ok(airport);
            }
        }
    }

    if let Some(found) =
        nearest::nearest_airport(conn, telemetry.lat, telemetry.lon, simulator).await?
    {
        return Ok(found);
    }

    airports::get_airport(conn, origin)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("airport {origin}")))
}

async fn load_flight(conn: &mut SqliteConnection, flight_id: &str) -> EngineResult<Flight> {
    flights::get_flight(conn, flight_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("flight {flight_id}")))
}
