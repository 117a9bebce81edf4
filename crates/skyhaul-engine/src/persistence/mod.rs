//! Persistence layer for the skyhaul engine.
//!
//! SQLite-backed storage for accounts, airports, aircraft, flights, jobs,
//! payloads, and the financial ledger. Repository functions take
//! `&mut SqliteConnection` so a single transaction can span every mutation
//! of one engine operation.

pub mod accounts;
pub mod aircraft;
pub mod airports;
pub mod db;
pub mod flights;
pub mod jobs;
pub mod records;

pub use db::{init_database, Database};

use chrono::{DateTime, Utc};
use skyhaul_core::{AircraftCategory, EngineType, FuelType, JobType, OwnerRef, RecordCategory};

// ---- column codecs shared by the row types ----

pub(crate) fn ts_to_column(t: DateTime<Utc>) -> String {
    t.to_rfc3339()
}

pub(crate) fn opt_ts_to_column(t: Option<DateTime<Utc>>) -> Option<String> {
    t.map(|t| t.to_rfc3339())
}

pub(crate) fn ts_from_column(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

pub(crate) fn opt_ts_from_column(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Split an optional owner into the (user, airline) column pair.
pub(crate) fn owner_to_columns(owner: &Option<OwnerRef>) -> (Option<String>, Option<String>) {
    match owner {
        Some(OwnerRef::User(id)) => (Some(id.clone()), None),
        Some(OwnerRef::Airline(icao)) => (None, Some(icao.clone())),
        None => (None, None),
    }
}

/// Rebuild an owner from the column pair; a user entry wins if both are
/// somehow set.
pub(crate) fn owner_from_columns(
    user: Option<String>,
    airline: Option<String>,
) -> Option<OwnerRef> {
    match (user, airline) {
        (Some(id), _) => Some(OwnerRef::User(id)),
        (None, Some(icao)) => Some(OwnerRef::Airline(icao)),
        (None, None) => None,
    }
}

pub(crate) fn category_to_str(c: AircraftCategory) -> &'static str {
    match c {
        AircraftCategory::Piston => "piston",
        AircraftCategory::Turboprop => "turboprop",
        AircraftCategory::Jet => "jet",
        AircraftCategory::Airliner => "airliner",
        AircraftCategory::Helicopter => "helicopter",
        AircraftCategory::Glider => "glider",
    }
}

pub(crate) fn category_from_str(raw: &str) -> AircraftCategory {
    match raw {
        "turboprop" => AircraftCategory::Turboprop,
        "jet" => AircraftCategory::Jet,
        "airliner" => AircraftCategory::Airliner,
        "helicopter" => AircraftCategory::Helicopter,
        "glider" => AircraftCategory::Glider,
        _ => AircraftCategory::Piston,
    }
}

pub(crate) fn engine_type_to_str(e: EngineType) -> &'static str {
    match e {
        EngineType::Piston => "piston",
        EngineType::Turboprop => "turboprop",
        EngineType::Jet => "jet",
        EngineType::HeloTurbine => "helo_turbine",
        EngineType::None => "none",
    }
}

pub(crate) fn engine_type_from_str(raw: &str) -> EngineType {
    match raw {
        "turboprop" => EngineType::Turboprop,
        "jet" => EngineType::Jet,
        "helo_turbine" => EngineType::HeloTurbine,
        "none" => EngineType::None,
        _ => EngineType::Piston,
    }
}

pub(crate) fn fuel_type_to_str(f: FuelType) -> &'static str {
    match f {
        FuelType::AvGas => "avgas",
        FuelType::JetFuel => "jetfuel",
    }
}

pub(crate) fn fuel_type_from_str(raw: &str) -> FuelType {
    match raw {
        "jetfuel" => FuelType::JetFuel,
        _ => FuelType::AvGas,
    }
}

pub(crate) fn job_type_to_str(j: JobType) -> &'static str {
    match j {
        JobType::CargoLong => "cargo_long",
        JobType::CargoShort => "cargo_short",
    }
}

pub(crate) fn job_type_from_str(raw: &str) -> JobType {
    match raw {
        "cargo_long" => JobType::CargoLong,
        _ => JobType::CargoShort,
    }
}

pub(crate) fn record_category_to_str(c: RecordCategory) -> &'static str {
    match c {
        RecordCategory::Flight => "flight",
        RecordCategory::Aircraft => "aircraft",
        RecordCategory::Fuel => "fuel",
        RecordCategory::Cargo => "cargo",
        RecordCategory::AirportFees => "airport_fees",
        RecordCategory::Fines => "fines",
    }
}

pub(crate) fn record_category_from_str(raw: &str) -> RecordCategory {
    match raw {
        "flight" => RecordCategory::Flight,
        "aircraft" => RecordCategory::Aircraft,
        "cargo" => RecordCategory::Cargo,
        "airport_fees" => RecordCategory::AirportFees,
        "fines" => RecordCategory::Fines,
        _ => RecordCategory::Fuel,
    }
}
