//! Job acceptance/abort, ground operations, and aircraft trading tests.

mod common;

use chrono::{Duration, Utc};

use common::*;
use skyhaul_core::{Job, JobType, OwnerRef, PayloadLocation};
use skyhaul_engine::auth::AirlinePermission;
use skyhaul_engine::error::EngineError;
use skyhaul_engine::persistence::{accounts, aircraft as aircraft_store, jobs as job_store};
use skyhaul_engine::{aircraft, ground_ops, jobs};

async fn seed_open_job(ctx: &skyhaul_engine::EngineContext, id: &str, value: i64) {
    let mut conn = ctx.db().pool().acquire().await.unwrap();
    job_store::upsert_job(
        &mut conn,
        &Job {
            id: id.to_string(),
            origin_icao: "KSFO".to_string(),
            category: "jet".to_string(),
            job_type: JobType::CargoLong,
            value,
            expires_at: Utc::now() + Duration::hours(12),
            operator: None,
            created_at: Utc::now(),
        },
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_accept_then_abort_charges_thirty_percent() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    seed_open_job(&ctx, "job-1", 2_000_00).await;

    jobs::accept_job(&ctx, PILOT, "job-1", pilot_ref()).await.unwrap();
    // A taken job cannot be taken again.
    let err = jobs::accept_job(&ctx, PILOT, "job-1", pilot_ref()).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));

    let balance_before = balance(&ctx, &pilot_ref()).await;
    let outcome = jobs::abort_job(&ctx, PILOT, "job-1").await.unwrap();
    assert_eq!(outcome.penalty_cents, 600_00);
    assert_eq!(balance(&ctx, &pilot_ref()).await, balance_before - 600_00);

    let mut conn = ctx.db().pool().acquire().await.unwrap();
    assert!(job_store::get_job(&mut conn, "job-1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_expired_jobs_cannot_be_accepted() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        job_store::upsert_job(
            &mut conn,
            &Job {
                id: "stale".to_string(),
                origin_icao: "KSFO".to_string(),
                category: "jet".to_string(),
                job_type: JobType::CargoShort,
                value: 1_000_00,
                expires_at: Utc::now() - Duration::minutes(1),
                operator: None,
                created_at: Utc::now() - Duration::hours(13),
            },
        )
        .await
        .unwrap();
    }

    let err = jobs::accept_job(&ctx, PILOT, "stale", pilot_ref()).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn test_airline_job_acceptance_requires_the_permission() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    seed_open_job(&ctx, "job-1", 2_000_00).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        accounts::upsert_airline(&mut conn, "SKW", "Skywest Cargo", 500_000_00)
            .await
            .unwrap();
        accounts::set_membership(&mut conn, "SKW", PILOT, &[AirlinePermission::Dispatch])
            .await
            .unwrap();
    }

    let airline = OwnerRef::Airline("SKW".to_string());
    let err = jobs::accept_job(&ctx, PILOT, "job-1", airline.clone()).await.unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));

    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        accounts::set_membership(
            &mut conn,
            "SKW",
            PILOT,
            &[AirlinePermission::Dispatch, AirlinePermission::AcceptJobs],
        )
        .await
        .unwrap();
    }
    jobs::accept_job(&ctx, PILOT, "job-1", airline.clone()).await.unwrap();

    let mut conn = ctx.db().pool().acquire().await.unwrap();
    let job = job_store::get_job(&mut conn, "job-1").await.unwrap().unwrap();
    assert_eq!(job.operator, Some(airline));
}

#[tokio::test]
async fn test_fuel_ground_op_charges_the_posted_price() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;

    let balance_before = balance(&ctx, &pilot_ref()).await;
    // 150 -> 250 gal of jet fuel at $5.00/gal.
    let outcome = ground_ops::set_aircraft_fuel(&ctx, PILOT, "N1SH", 250.0, false)
        .await
        .unwrap();
    assert_eq!(outcome.cost_cents, 500_00);
    assert!(!outcome.skipped);
    assert!(outcome.fuelling_complete.unwrap() > Utc::now());
    assert_eq!(balance(&ctx, &pilot_ref()).await, balance_before - 500_00);

    // Defuelling is free and still takes time.
    let outcome = ground_ops::set_aircraft_fuel(&ctx, PILOT, "N1SH", 50.0, false)
        .await
        .unwrap();
    assert_eq!(outcome.cost_cents, 0);
    assert_eq!(balance(&ctx, &pilot_ref()).await, balance_before - 500_00);

    let mut conn = ctx.db().pool().acquire().await.unwrap();
    let ac = aircraft_store::get_aircraft(&mut conn, "N1SH").await.unwrap().unwrap();
    assert!((ac.fuel_gal - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_fuel_op_rejects_targets_beyond_capacity() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;

    let err = ground_ops::set_aircraft_fuel(&ctx, PILOT, "N1SH", 1100.1, false)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput(_)));

    // The capacity bound itself is allowed.
    ground_ops::set_aircraft_fuel(&ctx, PILOT, "N1SH", 1100.0, false)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_ground_delivery_settles_without_a_flight() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    // Payload already bound for the airport the aircraft sits at.
    seed_job(&ctx, "job-1", "KSFO", "KSFO", 800_00).await;

    ground_ops::load_payloads(&ctx, PILOT, "N1SH", &["job-1-p1".to_string()])
        .await
        .unwrap();
    let balance_before = balance(&ctx, &pilot_ref()).await;

    let outcome = ground_ops::unload_payloads(&ctx, PILOT, "N1SH", &["job-1-p1".to_string()])
        .await
        .unwrap();
    assert_eq!(outcome.completed_job_ids, vec!["job-1".to_string()]);
    assert_eq!(balance(&ctx, &pilot_ref()).await, balance_before + 800_00);
}

#[tokio::test]
async fn test_loading_requires_the_job_operator_to_own_the_aircraft() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        accounts::upsert_user(&mut conn, "rival", "Rival", 100_000_00).await.unwrap();
        job_store::upsert_job(
            &mut conn,
            &Job {
                id: "job-r".to_string(),
                origin_icao: "KSFO".to_string(),
                category: "jet".to_string(),
                job_type: JobType::CargoShort,
                value: 900_00,
                expires_at: Utc::now() + Duration::hours(6),
                operator: Some(OwnerRef::User("rival".to_string())),
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();
        job_store::upsert_payload(
            &mut conn,
            &skyhaul_core::Payload {
                id: "job-r-p1".to_string(),
                job_id: "job-r".to_string(),
                weight_lb: 500.0,
                location: PayloadLocation::Airport("KSFO".to_string()),
                destination_icao: "KLAX".to_string(),
            },
        )
        .await
        .unwrap();
    }

    let err = ground_ops::load_payloads(&ctx, PILOT, "N1SH", &["job-r-p1".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Unauthorized(_)));
}

#[tokio::test]
async fn test_aircraft_sale_moves_money_and_title() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        accounts::upsert_user(&mut conn, "buyer", "Buyer", 2_000_000_00).await.unwrap();
    }

    aircraft::list_for_sale(&ctx, PILOT, "N1SH", 1_500_000_00).await.unwrap();
    let seller_before = balance(&ctx, &pilot_ref()).await;

    let buyer = OwnerRef::User("buyer".to_string());
    let outcome = aircraft::buy_aircraft(&ctx, "buyer", "N1SH", buyer.clone()).await.unwrap();
    assert_eq!(outcome.price_cents, 1_500_000_00);
    assert_eq!(balance(&ctx, &pilot_ref()).await, seller_before + 1_500_000_00);
    assert_eq!(balance(&ctx, &buyer).await, 500_000_00);

    let mut conn = ctx.db().pool().acquire().await.unwrap();
    let ac = aircraft_store::get_aircraft(&mut conn, "N1SH").await.unwrap().unwrap();
    assert_eq!(ac.owner, Some(buyer));
    assert!(ac.sale_price.is_none());
}

#[tokio::test]
async fn test_purchase_fails_without_sufficient_funds() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        accounts::upsert_user(&mut conn, "broke", "Broke", 10_00).await.unwrap();
    }

    aircraft::list_for_sale(&ctx, PILOT, "N1SH", 1_500_000_00).await.unwrap();
    let err = aircraft::buy_aircraft(&ctx, "broke", "N1SH", OwnerRef::User("broke".to_string()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds { .. }));

    // Title never moved.
    let mut conn = ctx.db().pool().acquire().await.unwrap();
    let ac = aircraft_store::get_aircraft(&mut conn, "N1SH").await.unwrap().unwrap();
    assert_eq!(ac.owner, Some(pilot_ref()));
}

#[tokio::test]
async fn test_lifetime_totals_are_masked_for_strangers() {
    let ctx = test_ctx().await;
    seed_basic(&ctx).await;
    {
        let mut conn = ctx.db().pool().acquire().await.unwrap();
        let mut ac = aircraft_store::get_aircraft(&mut conn, "N1SH").await.unwrap().unwrap();
        ac.lifetime_income = 9_999_00;
        ac.lifetime_expense = 1_234_00;
        aircraft_store::upsert_aircraft(&mut conn, &ac).await.unwrap();
    }

    let owner_view = aircraft::get_aircraft_view(&ctx, Some(PILOT), "N1SH").await.unwrap();
    assert_eq!(owner_view.lifetime_income, 9_999_00);

    let public_view = aircraft::get_aircraft_view(&ctx, None, "N1SH").await.unwrap();
    assert_eq!(public_view.lifetime_income, 0);
    assert_eq!(public_view.lifetime_expense, 0);

    // Masking is presentation only; the stored totals survive.
    let owner_again = aircraft::get_aircraft_view(&ctx, Some(PILOT), "N1SH").await.unwrap();
    assert_eq!(owner_again.lifetime_income, 9_999_00);
    assert_eq!(owner_again.lifetime_expense, 1_234_00);
}
