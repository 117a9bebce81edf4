//! Authorization checks.
//!
//! The engine consumes identity as an opaque caller user ID plus airline
//! membership permission sets; token mechanics live outside this crate.

use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;

use crate::error::{EngineError, EngineResult};
use crate::persistence::accounts;
use skyhaul_core::{Flight, Operator, OwnerRef};

/// Permissions an airline can grant a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirlinePermission {
    BuyAircraft,
    SellAircraft,
    Dispatch,
    AbortJobs,
    AcceptJobs,
    PerformGroundOperations,
}

/// Whether `user_id` holds `permission` in `airline_icao`.
pub async fn has_permission(
    conn: &mut SqliteConnection,
    airline_icao: &str,
    user_id: &str,
    permission: AirlinePermission,
) -> EngineResult<bool> {
    Ok(accounts::membership(conn, airline_icao, user_id)
        .await?
        .map(|perms| perms.contains(&permission))
        .unwrap_or(false))
}

pub async fn require_permission(
    conn: &mut SqliteConnection,
    airline_icao: &str,
    user_id: &str,
    permission: AirlinePermission,
) -> EngineResult<()> {
    if has_permission(conn, airline_icao, user_id, permission).await? {
        Ok(())
    } else {
        Err(EngineError::Unauthorized(format!(
            "{user_id} lacks {permission:?} in {airline_icao}"
        )))
    }
}

/// Only the flying crew may drive lifecycle transitions: the individual
/// operator, or — for airline flights — a member of the airline who is
/// also the specifically assigned pilot.
pub async fn authorize_flight_crew(
    conn: &mut SqliteConnection,
    flight: &Flight,
    caller: &str,
) -> EngineResult<()> {
    match &flight.operator {
        Operator::Individual { user_id } if user_id == caller => Ok(()),
        Operator::Individual { .. } => Err(EngineError::Unauthorized(format!(
            "{caller} is not the operator of flight {}",
            flight.id
        ))),
        Operator::Airline { icao, pilot_id } => {
            if pilot_id != caller {
                return Err(EngineError::Unauthorized(format!(
                    "{caller} is not the assigned pilot of flight {}",
                    flight.id
                )));
            }
            if accounts::membership(conn, icao, caller).await?.is_none() {
                return Err(EngineError::Unauthorized(format!(
                    "{caller} is not a member of {icao}"
                )));
            }
            Ok(())
        }
    }
}

/// Plan edits and deletion: the owning individual, or any airline member
/// with Dispatch.
pub async fn authorize_plan_admin(
    conn: &mut SqliteConnection,
    flight: &Flight,
    caller: &str,
) -> EngineResult<()> {
    match &flight.operator {
        Operator::Individual { user_id } if user_id == caller => Ok(()),
        Operator::Individual { .. } => Err(EngineError::Unauthorized(format!(
            "{caller} does not own flight plan {}",
            flight.id
        ))),
        Operator::Airline { icao, pilot_id } => {
            if pilot_id == caller {
                // The assigned pilot may always manage their own plan,
                // as long as they are still a member.
                if accounts::membership(conn, icao, caller).await?.is_some() {
                    return Ok(());
                }
            }
            require_permission(conn, icao, caller, AirlinePermission::Dispatch).await
        }
    }
}

/// Ground operations and trading against an owned asset: the owning
/// individual, or an airline member with the given permission. System
/// assets accept no caller.
pub async fn authorize_asset_op(
    conn: &mut SqliteConnection,
    owner: &Option<OwnerRef>,
    caller: &str,
    permission: AirlinePermission,
) -> EngineResult<()> {
    match owner {
        Some(OwnerRef::User(id)) if id == caller => Ok(()),
        Some(OwnerRef::User(_)) => Err(EngineError::Unauthorized(format!(
            "{caller} does not own this asset"
        ))),
        Some(OwnerRef::Airline(icao)) => require_permission(conn, icao, caller, permission).await,
        None => Err(EngineError::Unauthorized(
            "asset is system-owned".to_string(),
        )),
    }
}
