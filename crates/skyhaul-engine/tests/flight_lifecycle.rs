//! Flight lifecycle integration tests: plan, start, pause, resume, abort.

mod common;

use chrono::{Duration, Utc};

use common::*;
use skyhaul_core::{FlightState, Simulator};
use skyhaul_engine::error::EngineError;
use skyhaul_engine::flights::{self, StartOptions};
use skyhaul_engine::persistence::{aircraft, flights as flight_store};

#[tokio::test]
async fn test_start_requires_aircraft_at_origin() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;

    // The jet sits at KSFO; plan a departure out of KLAX instead.
    let plan = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KLAX", "KSFO", "N1SH", 150.0),
    )
    .await
    .unwrap();

    let err = flights::start_flight(&ctx, PILOT, &plan.id, StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AircraftNotAtOrigin { .. }));
}

#[tokio::test]
async fn test_second_start_for_same_pilot_is_rejected_without_side_effects() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        aircraft::upsert_aircraft(&mut conn, &jet("N2SH", "KSFO", pilot_ref()))
            .await
            .unwrap();
    }

    let first = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N1SH", 150.0),
    )
    .await
    .unwrap();
    flights::start_flight(&ctx, PILOT, &first.id, StartOptions::default())
        .await
        .unwrap();

    let second = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N2SH", 400.0),
    )
    .await
    .unwrap();
    let balance_before = balance(&ctx, &pilot_ref()).await;

    let err = flights::start_flight(&ctx, PILOT, &second.id, StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    // The rejected start must leave no trace: no fuel charge, no fuel
    // moved, and the second plan still in Planning.
    assert_eq!(balance(&ctx, &pilot_ref()).await, balance_before);
    let mut conn = ctx.db().pool().acquire().await.unwrap();
    let ac = aircraft::get_aircraft(&mut conn, "N2SH").await.unwrap().unwrap();
    assert_eq!(ac.fuel_gal, 150.0);
    assert!(ac.fuelling_until.is_none());
    let stale = flight_store::get_flight(&mut conn, &second.id).await.unwrap().unwrap();
    assert_eq!(stale.state(), FlightState::Planning);
}

#[tokio::test]
async fn test_position_reports_touch_no_balances() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;

    let plan = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N1SH", 150.0),
    )
    .await
    .unwrap();
    let start = flights::start_flight(&ctx, PILOT, &plan.id, StartOptions::default())
        .await
        .unwrap();
    // Planned fuel equals current fuel, so nothing was bought.
    assert_eq!(start.fuel_cost_cents, 0);
    let balance_before = balance(&ctx, &pilot_ref()).await;

    for i in 0..5 {
        flights::position_report(&ctx, PILOT, &plan.id, snapshot(36.0 + i as f64 * 0.1, -120.5, false))
            .await
            .unwrap();
    }

    assert_eq!(balance(&ctx, &pilot_ref()).await, balance_before);
}

#[tokio::test]
async fn test_paused_flight_rejects_reports_after_the_grace_window() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;

    let plan = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N1SH", 150.0),
    )
    .await
    .unwrap();
    flights::start_flight(&ctx, PILOT, &plan.id, StartOptions::default())
        .await
        .unwrap();
    flights::pause_flight(&ctx, PILOT, &plan.id).await.unwrap();

    // A trailing report right after the pause is tolerated.
    flights::position_report(&ctx, PILOT, &plan.id, snapshot(36.0, -120.5, false))
        .await
        .unwrap();

    // Backdate the pause beyond the one-minute grace window.
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        let mut flight = flight_store::get_flight(&mut conn, &plan.id).await.unwrap().unwrap();
        flight.paused_at = Some(Utc::now() - Duration::minutes(2));
        flight_store::upsert_flight(&mut conn, &flight).await.unwrap();
    }
    let err = flights::position_report(&ctx, PILOT, &plan.id, snapshot(36.1, -120.5, false))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn test_resume_rechecks_the_single_active_flight_rule() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        aircraft::upsert_aircraft(&mut conn, &jet("N2SH", "KSFO", pilot_ref()))
            .await
            .unwrap();
    }

    let first = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N1SH", 150.0),
    )
    .await
    .unwrap();
    flights::start_flight(&ctx, PILOT, &first.id, StartOptions::default())
        .await
        .unwrap();
    flights::pause_flight(&ctx, PILOT, &first.id).await.unwrap();

    // A paused flight does not count as active, so a second one may start.
    let second = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N2SH", 150.0),
    )
    .await
    .unwrap();
    flights::start_flight(&ctx, PILOT, &second.id, StartOptions::default())
        .await
        .unwrap();

    // Now the paused one cannot come back until the other finishes.
    let err = flights::resume_flight(&ctx, PILOT, &first.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    flights::abort_flight(&ctx, PILOT, &second.id, Simulator::Msfs)
        .await
        .unwrap();
    flights::resume_flight(&ctx, PILOT, &first.id).await.unwrap();
}

#[tokio::test]
async fn test_abort_on_ground_reverts_the_plan_for_reuse() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;

    let plan = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N1SH", 150.0),
    )
    .await
    .unwrap();
    flights::start_flight(&ctx, PILOT, &plan.id, StartOptions::default())
        .await
        .unwrap();

    let outcome = flights::abort_flight(&ctx, PILOT, &plan.id, Simulator::Msfs)
        .await
        .unwrap();
    assert!(!outcome.was_airborne);
    assert_eq!(outcome.returned_to, "KSFO");
    assert!(outcome.reappears_at.is_none());

    let mut conn = ctx.db().pool().acquire().await.unwrap();
    let flight = flight_store::get_flight(&mut conn, &plan.id).await.unwrap().unwrap();
    assert_eq!(flight.state(), FlightState::Planning);
    assert!(flight.telemetry.is_none());
    drop(conn);

    // The same plan starts again cleanly.
    flights::start_flight(&ctx, PILOT, &plan.id, StartOptions::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_airborne_abort_schedules_a_return_leg() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;

    let plan = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N1SH", 150.0),
    )
    .await
    .unwrap();
    flights::start_flight(&ctx, PILOT, &plan.id, StartOptions::default())
        .await
        .unwrap();

    // Mid-route over the Central Valley, no airport within ten miles.
    let mut airborne = snapshot(36.0, -120.5, false);
    airborne.time_warp_seconds = 600;
    flights::position_report(&ctx, PILOT, &plan.id, airborne).await.unwrap();

    let outcome = flights::abort_flight(&ctx, PILOT, &plan.id, Simulator::Msfs)
        .await
        .unwrap();
    assert!(outcome.was_airborne);
    assert_eq!(outcome.returned_to, "KSFO");
    // Return leg plus the six hundred banked warp seconds.
    let reappears = outcome.reappears_at.unwrap();
    assert!(reappears > Utc::now() + Duration::seconds(600));

    let mut conn = ctx.db().pool().acquire().await.unwrap();
    let ac = aircraft::get_aircraft(&mut conn, "N1SH").await.unwrap().unwrap();
    assert_eq!(ac.current_airport, "KSFO");
    assert_eq!(ac.warping_until, Some(reappears));
    assert!(!ac.can_start_flight(Utc::now()));
    // Tank totals come from the final snapshot: 70 + 70 gallons.
    assert!((ac.fuel_gal - 140.0).abs() < 1e-9);
    assert!(ac.airframe_hours > 100.0);
}

#[tokio::test]
async fn test_plan_edits_are_rejected_once_started() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;

    let plan = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N1SH", 150.0),
    )
    .await
    .unwrap();
    flights::start_flight(&ctx, PILOT, &plan.id, StartOptions::default())
        .await
        .unwrap();

    let err = flights::delete_plan(&ctx, PILOT, &plan.id).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    let err = flights::update_plan(
        &ctx,
        PILOT,
        &plan.id,
        plan_request("KSFO", "KLAX", "N1SH", 300.0),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn test_only_the_operator_may_drive_the_flight() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        skyhaul_engine::persistence::accounts::upsert_user(&mut conn, "rival", "Rival", 0)
            .await
            .unwrap();
    }

    let plan = flights::create_plan(
        &ctx,
        PILOT,
        individual(),
        plan_request("KSFO", "KLAX", "N1SH", 150.0),
    )
    .await
    .unwrap();

    let err = flights::start_flight(&ctx, "rival", &plan.id, StartOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
    let err = flights::delete_plan(&ctx, "rival", &plan.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
}
