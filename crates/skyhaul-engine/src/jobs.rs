//! Job acceptance and abort.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::auth::{self, AirlinePermission};
use crate::error::{EngineError, EngineResult};
use crate::persistence::{accounts, jobs, records};
use crate::{stats, EngineContext};
use skyhaul_core::{
    job_abort_penalty, Cents, FinancialRecord, LedgerAmount, OwnerRef, RecordCategory,
};

/// Claim an available job for an individual or an airline.
///
/// Airline acceptance requires the `AcceptJobs` permission.
pub async fn accept_job(
    ctx: &EngineContext,
    caller: &str,
    job_id: &str,
    operator: OwnerRef,
) -> EngineResult<()> {
    let mut tx = ctx.db().pool().begin().await?;

    let mut job = jobs::get_job(&mut tx, job_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("job {job_id}")))?;
    if job.operator.is_some() {
        return Err(EngineError::InvalidState(format!(
            "job {job_id} is already taken"
        )));
    }
    if job.expires_at <= Utc::now() {
        return Err(EngineError::InvalidState(format!("job {job_id} has expired")));
    }

    match &operator {
        OwnerRef::User(id) if id == caller => {}
        OwnerRef::User(_) => {
            return Err(EngineError::Unauthorized(
                "cannot accept a job for another user".to_string(),
            ))
        }
        OwnerRef::Airline(icao) => {
            auth::require_permission(&mut tx, icao, caller, AirlinePermission::AcceptJobs).await?;
        }
    }

    job.operator = Some(operator);
    jobs::upsert_job(&mut tx, &job).await?;
    tx.commit().await?;

    info!(job = job_id, "job accepted");
    Ok(())
}

/// Outcome of aborting a job.
#[derive(Debug, Clone)]
pub struct JobAbortOutcome {
    pub penalty_cents: Cents,
}

/// Abandon a taken job: the operator is charged 30% of the job's value
/// and the job is deleted along with its payloads, wherever they sit.
pub async fn abort_job(
    ctx: &EngineContext,
    caller: &str,
    job_id: &str,
) -> EngineResult<JobAbortOutcome> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let job = jobs::get_job(&mut tx, job_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("job {job_id}")))?;
    let operator = job
        .operator
        .clone()
        .ok_or_else(|| EngineError::InvalidState(format!("job {job_id} has no operator")))?;

    match &operator {
        OwnerRef::User(id) => {
            if id != caller {
                return Err(EngineError::Unauthorized(format!(
                    "{caller} does not operate job {job_id}"
                )));
            }
        }
        OwnerRef::Airline(icao) => {
            auth::require_permission(&mut tx, icao, caller, AirlinePermission::AbortJobs).await?;
        }
    }

    // The penalty is charged even if it pushes the balance negative.
    let penalty_cents = job_abort_penalty(job.value);
    accounts::debit_unchecked(&mut tx, &operator, penalty_cents).await?;
    records::insert_record(
        &mut tx,
        &FinancialRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: now,
            category: RecordCategory::Fines,
            account: operator,
            amount: LedgerAmount::Expense(penalty_cents),
            description: format!("Abort penalty for job {job_id}"),
            aircraft_registry: None,
            airport_icao: None,
            parent_record_id: None,
        },
    )
    .await?;

    jobs::delete_job_with_payloads(&mut tx, job_id).await?;
    tx.commit().await?;

    ctx.stats().bump(stats::JOBS_ABORTED);
    ctx.stats().bump(stats::RECORDS_POSTED);
    info!(job = job_id, penalty = penalty_cents, "job aborted");

    Ok(JobAbortOutcome { penalty_cents })
}
