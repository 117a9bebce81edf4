//! Aircraft trading and read-side presentation.

use chrono::Utc;
use sqlx::SqliteConnection;
use tracing::info;
use uuid::Uuid;

use crate::auth::{self, AirlinePermission};
use crate::error::{EngineError, EngineResult};
use crate::persistence::{accounts, aircraft, records};
use crate::{stats, EngineContext};
use skyhaul_core::{Aircraft, Cents, FinancialRecord, LedgerAmount, OwnerRef, RecordCategory};

/// Whether a caller counts as the aircraft's owner for presentation.
async fn is_owner(
    conn: &mut SqliteConnection,
    ac: &Aircraft,
    caller: Option<&str>,
) -> EngineResult<bool> {
    let Some(caller) = caller else { return Ok(false) };
    match &ac.owner {
        Some(OwnerRef::User(id)) => Ok(id == caller),
        Some(OwnerRef::Airline(icao)) => {
            Ok(accounts::membership(conn, icao, caller).await?.is_some())
        }
        None => Ok(false),
    }
}

/// Fetch an aircraft as seen by `caller`.
///
/// Lifetime income/expense are masked to zero for non-owners in the
/// returned copy only; the stored counters are never zeroed. (Persisting
/// the masked value would silently corrupt financial history.)
pub async fn get_aircraft_view(
    ctx: &EngineContext,
    caller: Option<&str>,
    registry: &str,
) -> EngineResult<Aircraft> {
    let mut conn = ctx.db().pool().acquire().await?;
    let mut ac = aircraft::get_aircraft(&mut conn, registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    if !is_owner(&mut conn, &ac, caller).await? {
        ac.lifetime_income = 0;
        ac.lifetime_expense = 0;
    }
    Ok(ac)
}

/// Put an owned aircraft up for sale at `price_cents`.
pub async fn list_for_sale(
    ctx: &EngineContext,
    caller: &str,
    registry: &str,
    price_cents: Cents,
) -> EngineResult<()> {
    if price_cents <= 0 {
        return Err(EngineError::InvalidInput("sale price must be positive".to_string()));
    }
    let mut tx = ctx.db().pool().begin().await?;

    let mut ac = aircraft::get_aircraft(&mut tx, registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    auth::authorize_asset_op(&mut tx, &ac.owner, caller, AirlinePermission::SellAircraft).await?;

    ac.sale_price = Some(price_cents);
    aircraft::upsert_aircraft(&mut tx, &ac).await?;
    tx.commit().await?;

    info!(registry, price = price_cents, "aircraft listed for sale");
    Ok(())
}

/// Outcome of an aircraft purchase.
#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub price_cents: Cents,
}

/// Buy a listed aircraft for `buyer`.
///
/// Airline purchases require the `BuyAircraft` permission. The price
/// moves from the buyer's balance to the seller's (system sales pay
/// nobody), and Aircraft ledger entries are posted on both sides.
pub async fn buy_aircraft(
    ctx: &EngineContext,
    caller: &str,
    registry: &str,
    buyer: OwnerRef,
) -> EngineResult<PurchaseOutcome> {
    let now = Utc::now();
    let mut tx = ctx.db().pool().begin().await?;

    let mut ac = aircraft::get_aircraft(&mut tx, registry)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("aircraft {registry}")))?;
    let price_cents = ac
        .sale_price
        .ok_or_else(|| EngineError::InvalidState(format!("aircraft {registry} is not for sale")))?;

    match &buyer {
        OwnerRef::User(id) if id == caller => {}
        OwnerRef::User(_) => {
            return Err(EngineError::Unauthorized(
                "cannot buy an aircraft for another user".to_string(),
            ))
        }
        OwnerRef::Airline(icao) => {
            auth::require_permission(&mut tx, icao, caller, AirlinePermission::BuyAircraft).await?;
        }
    }

    accounts::debit_checked(&mut tx, &buyer, price_cents).await?;
    records::insert_record(
        &mut tx,
        &FinancialRecord {
            id: Uuid::new_v4().to_string(),
            timestamp: now,
            category: RecordCategory::Aircraft,
            account: buyer.clone(),
            amount: LedgerAmount::Expense(price_cents),
            description: format!("Purchase of {registry}"),
            aircraft_registry: Some(registry.to_string()),
            airport_icao: Some(ac.current_airport.clone()),
            parent_record_id: None,
        },
    )
    .await?;

    if let Some(seller) = ac.owner.clone() {
        accounts::credit(&mut tx, &seller, price_cents).await?;
        records::insert_record(
            &mut tx,
            &FinancialRecord {
                id: Uuid::new_v4().to_string(),
                timestamp: now,
                category: RecordCategory::Aircraft,
                account: seller,
                amount: LedgerAmount::Income(price_cents),
                description: format!("Sale of {registry}"),
                aircraft_registry: Some(registry.to_string()),
                airport_icao: Some(ac.current_airport.clone()),
                parent_record_id: None,
            },
        )
        .await?;
    }

    ac.owner = Some(buyer);
    ac.sale_price = None;
    aircraft::upsert_aircraft(&mut tx, &ac).await?;
    tx.commit().await?;

    ctx.stats().bump(stats::RECORDS_POSTED);
    info!(registry, price = price_cents, "aircraft sold");

    Ok(PurchaseOutcome { price_cents })
}
