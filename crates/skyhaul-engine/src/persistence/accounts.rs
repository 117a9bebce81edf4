//! Account balances and airline membership.
//!
//! Balances are debited/credited inside the same transaction as the
//! ledger entries they back, so a failed operation never leaves money
//! moved without a record.

use sqlx::SqliteConnection;

use crate::auth::AirlinePermission;
use crate::error::{EngineError, EngineResult};
use skyhaul_core::{Cents, OwnerRef};

pub async fn upsert_user(
    conn: &mut SqliteConnection,
    id: &str,
    name: &str,
    balance_cents: Cents,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, balance_cents) VALUES (?1, ?2, ?3)
        ON CONFLICT(id) DO UPDATE SET name = ?2, balance_cents = ?3
        "#,
    )
    .bind(id)
    .bind(name)
    .bind(balance_cents)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn upsert_airline(
    conn: &mut SqliteConnection,
    icao: &str,
    name: &str,
    balance_cents: Cents,
) -> EngineResult<()> {
    sqlx::query(
        r#"
        INSERT INTO airlines (icao, name, balance_cents) VALUES (?1, ?2, ?3)
        ON CONFLICT(icao) DO UPDATE SET name = ?2, balance_cents = ?3
        "#,
    )
    .bind(icao)
    .bind(name)
    .bind(balance_cents)
    .execute(conn)
    .await?;
    Ok(())
}

/// Replace a member's permission set (adds the membership if missing).
pub async fn set_membership(
    conn: &mut SqliteConnection,
    airline_icao: &str,
    user_id: &str,
    permissions: &[AirlinePermission],
) -> EngineResult<()> {
    let permissions_json = serde_json::to_string(permissions)?;
    sqlx::query(
        r#"
        INSERT INTO airline_members (airline_icao, user_id, permissions) VALUES (?1, ?2, ?3)
        ON CONFLICT(airline_icao, user_id) DO UPDATE SET permissions = ?3
        "#,
    )
    .bind(airline_icao)
    .bind(user_id)
    .bind(&permissions_json)
    .execute(conn)
    .await?;
    Ok(())
}

/// Permission set for a member, or None when the user is not a member.
pub async fn membership(
    conn: &mut SqliteConnection,
    airline_icao: &str,
    user_id: &str,
) -> EngineResult<Option<Vec<AirlinePermission>>> {
    let row: Option<(String,)> = sqlx::query_as(
        "SELECT permissions FROM airline_members WHERE airline_icao = ?1 AND user_id = ?2",
    )
    .bind(airline_icao)
    .bind(user_id)
    .fetch_optional(conn)
    .await?;

    match row {
        Some((raw,)) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Current balance of a user or airline account.
pub async fn balance_of(conn: &mut SqliteConnection, owner: &OwnerRef) -> EngineResult<Cents> {
    let row: Option<(Cents,)> = match owner {
        OwnerRef::User(id) => {
            sqlx::query_as("SELECT balance_cents FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(conn)
                .await?
        }
        OwnerRef::Airline(icao) => {
            sqlx::query_as("SELECT balance_cents FROM airlines WHERE icao = ?1")
                .bind(icao)
                .fetch_optional(conn)
                .await?
        }
    };

    row.map(|(b,)| b)
        .ok_or_else(|| EngineError::NotFound(format!("account {:?}", owner)))
}

async fn adjust(conn: &mut SqliteConnection, owner: &OwnerRef, delta: Cents) -> EngineResult<()> {
    let affected = match owner {
        OwnerRef::User(id) => {
            sqlx::query("UPDATE users SET balance_cents = balance_cents + ?1 WHERE id = ?2")
                .bind(delta)
                .bind(id)
                .execute(conn)
                .await?
                .rows_affected()
        }
        OwnerRef::Airline(icao) => {
            sqlx::query("UPDATE airlines SET balance_cents = balance_cents + ?1 WHERE icao = ?2")
                .bind(delta)
                .bind(icao)
                .execute(conn)
                .await?
                .rows_affected()
        }
    };
    if affected == 0 {
        return Err(EngineError::NotFound(format!("account {:?}", owner)));
    }
    Ok(())
}

/// Credit an account.
pub async fn credit(conn: &mut SqliteConnection, owner: &OwnerRef, cents: Cents) -> EngineResult<()> {
    adjust(conn, owner, cents).await
}

/// Debit an account, failing with `InsufficientFunds` if it cannot cover
/// the amount. Used for purchases (fuel, aircraft).
pub async fn debit_checked(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    cents: Cents,
) -> EngineResult<()> {
    let available = balance_of(conn, owner).await?;
    if available < cents {
        return Err(EngineError::InsufficientFunds { needed: cents, available });
    }
    adjust(conn, owner, -cents).await
}

/// Debit an account without a funds check. Fees and penalties are charged
/// even when they push a balance negative.
pub async fn debit_unchecked(
    conn: &mut SqliteConnection,
    owner: &OwnerRef,
    cents: Cents,
) -> EngineResult<()> {
    adjust(conn, owner, -cents).await
}
