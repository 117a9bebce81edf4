//! Job fulfillment resolver.
//!
//! Given payloads that just arrived somewhere, finds jobs whose every
//! payload has reached its destination, posts the late-penalty-adjusted
//! payout (and fine, when overdue), and deletes the job with its payloads.

use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineResult;
use crate::persistence::{accounts, aircraft, jobs, records};
use skyhaul_core::{
    settle_job, Cents, FinancialRecord, LedgerAmount, RecordCategory,
};

/// What the resolver settled.
#[derive(Debug, Default, Clone)]
pub struct FulfillmentOutcome {
    pub completed_job_ids: Vec<String>,
    pub payout_cents: Cents,
    pub fine_cents: Cents,
}

/// Resolve the given arrived payloads into completed jobs.
///
/// `parent_record_id` parents the payout/fine entries to a flight's
/// settlement record when called from flight completion; standalone
/// ground deliveries pass None. `aircraft_registry` receives the
/// lifetime income/expense attribution.
pub async fn resolve_arrivals(
    conn: &mut SqliteConnection,
    arrived_payload_ids: &[String],
    now: DateTime<Utc>,
    parent_record_id: Option<&str>,
    aircraft_registry: Option<&str>,
) -> EngineResult<FulfillmentOutcome> {
    let mut affected_jobs: Vec<String> = Vec::new();
    for payload_id in arrived_payload_ids {
        if let Some(payload) = jobs::get_payload(conn, payload_id).await? {
            if !affected_jobs.contains(&payload.job_id) {
                affected_jobs.push(payload.job_id);
            }
        }
    }

    let mut outcome = FulfillmentOutcome::default();

    for job_id in affected_jobs {
        let Some(job) = jobs::get_job(conn, &job_id).await? else {
            continue;
        };
        let payloads = jobs::payloads_for_job(conn, &job_id).await?;
        if payloads.is_empty() || !payloads.iter().all(|p| p.delivered()) {
            continue;
        }
        // A job nobody operates cannot be paid out; leave it alone.
        let Some(operator) = job.operator.clone() else {
            continue;
        };

        let settlement = settle_job(job.value, job.expires_at, now);
        accounts::credit(conn, &operator, settlement.payout_cents).await?;
        records::insert_record(
            conn,
            &FinancialRecord {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                category: RecordCategory::Cargo,
                account: operator.clone(),
                amount: LedgerAmount::Income(settlement.payout_cents),
                description: format!("Job {} delivered ({} payloads)", job.id, payloads.len()),
                aircraft_registry: aircraft_registry.map(str::to_string),
                airport_icao: None,
                parent_record_id: parent_record_id.map(str::to_string),
            },
        )
        .await?;

        if settlement.fine_cents > 0 {
            records::insert_record(
                conn,
                &FinancialRecord {
                    id: Uuid::new_v4().to_string(),
                    timestamp: now,
                    category: RecordCategory::Fines,
                    account: operator.clone(),
                    amount: LedgerAmount::Expense(settlement.fine_cents),
                    description: format!(
                        "Late delivery of job {} (multiplier {:.2})",
                        job.id, settlement.multiplier
                    ),
                    aircraft_registry: aircraft_registry.map(str::to_string),
                    airport_icao: None,
                    parent_record_id: parent_record_id.map(str::to_string),
                },
            )
            .await?;
        }

        if let Some(registry) = aircraft_registry {
            aircraft::add_lifetime(conn, registry, settlement.payout_cents, settlement.fine_cents)
                .await?;
        }

        jobs::delete_job_with_payloads(conn, &job_id).await?;

        info!(
            job = %job.id,
            payout = settlement.payout_cents,
            fine = settlement.fine_cents,
            "job fulfilled"
        );

        outcome.payout_cents += settlement.payout_cents;
        outcome.fine_cents += settlement.fine_cents;
        outcome.completed_job_ids.push(job_id);
    }

    Ok(outcome)
}
