//! Financial record persistence.
//!
//! The ledger is append-only. The single permitted mutation is setting
//! `parent_record_id` after the fact, when a completing flight adopts
//! fuel purchases made before it started.

use sqlx::SqliteConnection;

use super::{
    owner_from_columns, owner_to_columns, record_category_from_str, record_category_to_str,
    ts_from_column, ts_to_column,
};
use crate::error::EngineResult;
use skyhaul_core::{FinancialRecord, LedgerAmount};

/// Insert a financial record.
pub async fn insert_record(
    conn: &mut SqliteConnection,
    record: &FinancialRecord,
) -> EngineResult<()> {
    let (account_user, account_airline) = owner_to_columns(&Some(record.account.clone()));
    let (side, amount_cents) = match record.amount {
        LedgerAmount::Income(c) => ("income", c),
        LedgerAmount::Expense(c) => ("expense", c),
    };

    sqlx::query(
        r#"
        INSERT INTO financial_records (
            id, timestamp, category, account_user, account_airline,
            side, amount_cents, description, aircraft_registry, airport_icao, parent_record_id
        )
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&record.id)
    .bind(ts_to_column(record.timestamp))
    .bind(record_category_to_str(record.category))
    .bind(&account_user)
    .bind(&account_airline)
    .bind(side)
    .bind(amount_cents)
    .bind(&record.description)
    .bind(&record.aircraft_registry)
    .bind(&record.airport_icao)
    .bind(&record.parent_record_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Load a single record by ID.
pub async fn get_record(
    conn: &mut SqliteConnection,
    id: &str,
) -> EngineResult<Option<FinancialRecord>> {
    let row = sqlx::query_as::<_, RecordRow>("SELECT * FROM financial_records WHERE id = ?1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Into::into))
}

/// All children of a parent settlement record.
pub async fn records_for_parent(
    conn: &mut SqliteConnection,
    parent_id: &str,
) -> EngineResult<Vec<FinancialRecord>> {
    let rows = sqlx::query_as::<_, RecordRow>(
        "SELECT * FROM financial_records WHERE parent_record_id = ?1 ORDER BY timestamp",
    )
    .bind(parent_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Attach still-unlinked fuel purchases for an aircraft at an airport to
/// a flight's settlement record. Returns how many records were adopted.
pub async fn adopt_unlinked_fuel_records(
    conn: &mut SqliteConnection,
    aircraft_registry: &str,
    airport_icao: &str,
    parent_id: &str,
) -> EngineResult<u64> {
    let result = sqlx::query(
        r#"
        UPDATE financial_records SET parent_record_id = ?1
        WHERE category = 'fuel'
          AND aircraft_registry = ?2
          AND airport_icao = ?3
          AND parent_record_id IS NULL
        "#,
    )
    .bind(parent_id)
    .bind(aircraft_registry)
    .bind(airport_icao)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: String,
    timestamp: String,
    category: String,
    account_user: Option<String>,
    account_airline: Option<String>,
    side: String,
    amount_cents: i64,
    description: String,
    aircraft_registry: Option<String>,
    airport_icao: Option<String>,
    parent_record_id: Option<String>,
}

impl From<RecordRow> for FinancialRecord {
    fn from(row: RecordRow) -> Self {
        let account = owner_from_columns(row.account_user, row.account_airline)
            .unwrap_or(skyhaul_core::OwnerRef::User(String::new()));
        let amount = if row.side == "income" {
            LedgerAmount::Income(row.amount_cents)
        } else {
            LedgerAmount::Expense(row.amount_cents)
        };
        FinancialRecord {
            id: row.id,
            timestamp: ts_from_column(&row.timestamp),
            category: record_category_from_str(&row.category),
            account,
            amount,
            description: row.description,
            aircraft_registry: row.aircraft_registry,
            airport_icao: row.airport_icao,
            parent_record_id: row.parent_record_id,
        }
    }
}
