//! Aircraft-side ground operations, performed outside of a flight.
//!
//! Uses the same calculator and rate tables as flight Start and Complete,
//! so fuel and payload timing stays numerically consistent everywhere.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::auth::{self, AirlinePermission};
use crate::error::{EngineError, EngineResult};
use crate::fulfillment;
use crate::persistence::{accounts, aircraft, airports, flights, jobs, records};
use crate::{stats, EngineContext};
use skyhaul_core::{
    plan_fuel_transfer, plan_payload_transfer, Cents, FinancialRecord, FuelTransferRequest,
    LedgerAmount, PayloadLocation, PayloadTransferRequest, RecordCategory,
};

/// Outcome of a fuel ground operation.
#[derive(Debug, Clone)]
pub struct FuelOpOutcome {
    pub cost_cents: Cents,
    pub fuelling_complete: Option<DateTime<Utc>>,
    pub skipped: bool,
}

/// Outcome of a payload ground operation.
#[derive(Debug, Clone)]
pub struct PayloadOpOutcome {
    pub moved_lb: f64,
    pub loading_complete: Option<DateTime<Utc>>,
    pub completed_job_ids: Vec<String>,
}

/// Fuel (or defuel) a parked aircraft toward `target_gal`.
///
/// Charges the owning account at the airport's per-gallon price and posts
/// a Fuel ledger entry. The entry stays unparented until a later flight
/// from this airport adopts it into its settlement record.
pub async fn set_aircraft_fuel(
    ctx: &EngineContext,
    caller: &str,
    registry: &str,
    target_gal: f64,
    skip_when_not_sold: bool,
) -> EngineResult<FuelOpOutcome> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let mut ac = aircraft::get_aircraft(&mut tx, registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    auth::authorize_asset_op(
        &mut tx,
        &ac.owner,
        caller,
        AirlinePermission::PerformGroundOperations,
    )
    .await?;

    if flights::open_flight_count_for_aircraft(&mut tx, registry, None).await? > 0 {
        return Err(EngineError::InvalidState(format!(
            "aircraft {registry} is committed to a flight"
        )));
    }

    let airport = airports::get_airport(&mut tx, &ac.current_airport)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("airport {}", ac.current_airport)))?;

    let plan = plan_fuel_transfer(
        &FuelTransferRequest {
            current_gal: ac.fuel_gal,
            capacity_gal: ac.tank_capacity_gal,
            target_gal,
            category: ac.category,
            fuel_type: ac.fuel_type,
            airport: &airport,
            skip_when_not_sold,
            in_progress_until: ac.fuelling_until,
        },
        now,
    )?;

    let owner = ac
        .owner
        .clone()
        .ok_or_else(|| EngineError::InvalidState(format!("aircraft {registry} has no owner")))?;
    if plan.cost_cents > 0 {
        accounts::debit_checked(&mut tx, &owner, plan.cost_cents).await?;
        records::insert_record(
            &mut tx,
            &FinancialRecord {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                category: RecordCategory::Fuel,
                account: owner,
                amount: LedgerAmount::Expense(plan.cost_cents),
                description: format!(
                    "{:.1} gal of fuel at {}",
                    plan.gallons_moved, airport.icao
                ),
                aircraft_registry: Some(registry.to_string()),
                airport_icao: Some(airport.icao.clone()),
                parent_record_id: None,
            },
        )
        .await?;
        ac.lifetime_expense += plan.cost_cents;
    }

    ac.fuel_gal = plan.resulting_gal;
    ac.fuelling_until = plan.completes_at;
    aircraft::upsert_aircraft(&mut tx, &ac).await?;

    tx.commit().await?;
    if plan.cost_cents > 0 {
        ctx.stats().bump(stats::RECORDS_POSTED);
    }

    info!(registry, cost = plan.cost_cents, gallons = plan.gallons_moved, "fuel ground op");

    Ok(FuelOpOutcome {
        cost_cents: plan.cost_cents,
        fuelling_complete: plan.completes_at,
        skipped: plan.skipped,
    })
}

/// Load payloads from the aircraft's current airport onto the aircraft.
pub async fn load_payloads(
    ctx: &EngineContext,
    caller: &str,
    registry: &str,
    payload_ids: &[String],
) -> EngineResult<PayloadOpOutcome> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let mut ac = aircraft::get_aircraft(&mut tx, registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    auth::authorize_asset_op(
        &mut tx,
        &ac.owner,
        caller,
        AirlinePermission::PerformGroundOperations,
    )
    .await?;

    let mut moved_lb = 0.0;
    for payload_id in payload_ids {
        let mut payload = jobs::get_payload(&mut tx, payload_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payload {payload_id}")))?;
        if payload.location != PayloadLocation::Airport(ac.current_airport.clone()) {
            return Err(EngineError::InvalidState(format!(
                "payload {payload_id} is not at {}",
                ac.current_airport
            )));
        }
        let job = jobs::get_job(&mut tx, &payload.job_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("job {}", payload.job_id)))?;
        if job.operator != ac.owner {
            return Err(EngineError::Unauthorized(format!(
                "job {} is not operated by this aircraft's owner",
                job.id
            )));
        }
        moved_lb += payload.weight_lb;
        payload.location = PayloadLocation::Aircraft(registry.to_string());
        jobs::upsert_payload(&mut tx, &payload).await?;
    }

    let loading_complete = plan_payload_transfer(
        &PayloadTransferRequest {
            weight_lb: moved_lb,
            category: ac.category,
            in_progress_until: ac.loading_until,
        },
        now,
    )?;
    ac.loading_until = loading_complete;
    aircraft::upsert_aircraft(&mut tx, &ac).await?;

    tx.commit().await?;

    info!(registry, moved_lb, "payloads loaded");

    Ok(PayloadOpOutcome { moved_lb, loading_complete, completed_job_ids: vec![] })
}

/// Unload payloads from the aircraft at its current airport. Payloads
/// arriving at their destination run through the fulfillment resolver.
pub async fn unload_payloads(
    ctx: &EngineContext,
    caller: &str,
    registry: &str,
    payload_ids: &[String],
) -> EngineResult<PayloadOpOutcome> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let mut ac = aircraft::get_aircraft(&mut tx, registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    auth::authorize_asset_op(
        &mut tx,
        &ac.owner,
        caller,
        AirlinePermission::PerformGroundOperations,
    )
    .await?;

    let mut moved_lb = 0.0;
    let mut arrived: Vec<String> = Vec::new();
    for payload_id in payload_ids {
        let mut payload = jobs::get_payload(&mut tx, payload_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("payload {payload_id}")))?;
        if payload.location != PayloadLocation::Aircraft(registry.to_string()) {
            return Err(EngineError::InvalidState(format!(
                "payload {payload_id} is not aboard {registry}"
            )));
        }
        moved_lb += payload.weight_lb;
        payload.location = PayloadLocation::Airport(ac.current_airport.clone());
        jobs::upsert_payload(&mut tx, &payload).await?;
        if payload.delivered() {
            arrived.push(payload.id.clone());
        }
    }

    let loading_complete = plan_payload_transfer(
        &PayloadTransferRequest {
            weight_lb: moved_lb,
            category: ac.category,
            in_progress_until: ac.loading_until,
        },
        now,
    )?;
    ac.loading_until = loading_complete;
    aircraft::upsert_aircraft(&mut tx, &ac).await?;

    let outcome = fulfillment::resolve_arrivals(&mut tx, &arrived, now, None, Some(registry)).await?;

    tx.commit().await?;
    for _ in &outcome.completed_job_ids {
        ctx.stats().bump(stats::JOBS_COMPLETED);
    }

    info!(registry, moved_lb, jobs = outcome.completed_job_ids.len(), "payloads unloaded");

    Ok(PayloadOpOutcome {
        moved_lb,
        loading_complete,
        completed_job_ids: outcome.completed_job_ids,
    })
}
