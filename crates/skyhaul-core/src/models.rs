//! Core data models for the flight economy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Monetary amounts are integer cents throughout.
pub type Cents = i64;

/// Number of fuel tanks reported by the simulator telemetry.
pub const FUEL_TANK_COUNT: usize = 11;

/// Inclusive flight number range accepted on Start.
pub const FLIGHT_NUMBER_MIN: i32 = 1;
pub const FLIGHT_NUMBER_MAX: i32 = 9999;

/// Who operates a flight: an individual pilot, or an airline with a
/// specifically assigned pilot. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operator {
    Individual { user_id: String },
    Airline { icao: String, pilot_id: String },
}

impl Operator {
    /// The pilot identity flying under this operator. The
    /// single-active-flight invariant is keyed on this value.
    pub fn pilot_id(&self) -> &str {
        match self {
            Operator::Individual { user_id } => user_id,
            Operator::Airline { pilot_id, .. } => pilot_id,
        }
    }

    /// The account that pays for and earns from this operator's flights.
    pub fn account(&self) -> OwnerRef {
        match self {
            Operator::Individual { user_id } => OwnerRef::User(user_id.clone()),
            Operator::Airline { icao, .. } => OwnerRef::Airline(icao.clone()),
        }
    }
}

/// Reference to a balance-holding entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum OwnerRef {
    User(String),
    Airline(String),
}

// ========== FLIGHT ==========

/// Lifecycle state derived from the timestamp columns, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlightState {
    /// Not started; the plan is freely editable.
    Planning,
    /// Started, not paused, not completed.
    Active,
    Paused,
    Completed,
}

/// A navigation-log fix attached to a flight plan.
/// Replaced wholesale on plan edits, discarded on completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavFix {
    pub ident: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub altitude_ft: Option<f64>,
}

/// Simulator flight phase reported with telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlightPhase {
    Preflight,
    Taxi,
    Takeoff,
    Climb,
    Cruise,
    Descent,
    Approach,
    Landed,
    Crashed,
}

/// Live telemetry snapshot overwritten by each position report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub lat: f64,
    pub lon: f64,
    pub altitude_ft: f64,
    pub heading_deg: f64,
    #[serde(default)]
    pub bank_deg: f64,
    #[serde(default)]
    pub pitch_deg: f64,
    pub ground_speed_kt: f64,
    /// Per-tank quantities in gallons; summed into aircraft fuel on completion.
    pub fuel_tanks_gal: [f64; FUEL_TANK_COUNT],
    pub on_ground: bool,
    pub phase: FlightPhase,
    /// Simulator acceleration seconds saved so far, repaid as a delayed
    /// reappearance if the flight is aborted airborne.
    #[serde(default)]
    pub time_warp_seconds: i64,
    pub reported_at: DateTime<Utc>,
}

impl TelemetrySnapshot {
    /// Total fuel on board across all tanks.
    pub fn total_fuel_gal(&self) -> f64 {
        self.fuel_tanks_gal.iter().sum()
    }
}

/// A planned or in-progress journey.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flight {
    pub id: String,
    pub flight_number: i32,
    pub operator: Operator,
    pub origin_icao: Option<String>,
    pub destination_icao: Option<String>,
    pub alternate_icao: Option<String>,
    pub aircraft_registry: Option<String>,
    pub planned_fuel_gal: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub paused_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub telemetry: Option<TelemetrySnapshot>,
    pub fuel_loading_complete: Option<DateTime<Utc>>,
    pub payload_loading_complete: Option<DateTime<Utc>>,
    /// Final report blob persisted on completion.
    pub final_log: Option<serde_json::Value>,
    pub navlog: Vec<NavFix>,
    /// Payloads assigned to this plan, replaced wholesale on edits.
    pub payload_ids: Vec<String>,
}

impl Flight {
    pub fn state(&self) -> FlightState {
        if self.completed_at.is_some() {
            FlightState::Completed
        } else if self.started_at.is_none() {
            FlightState::Planning
        } else if self.paused_at.is_some() {
            FlightState::Paused
        } else {
            FlightState::Active
        }
    }

    /// Started, not paused, not completed. The invariant counts these.
    pub fn is_active(&self) -> bool {
        self.state() == FlightState::Active
    }
}

/// Check the flight number is within the accepted range.
pub fn flight_number_valid(n: i32) -> bool {
    (FLIGHT_NUMBER_MIN..=FLIGHT_NUMBER_MAX).contains(&n)
}

// ========== AIRCRAFT ==========

/// Broad airframe category indexing the ground-operation rate tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AircraftCategory {
    Piston,
    Turboprop,
    Jet,
    Airliner,
    Helicopter,
    Glider,
}

/// Powerplant type indexing the synthetic-return cruise speed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineType {
    Piston,
    Turboprop,
    Jet,
    HeloTurbine,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelType {
    AvGas,
    JetFuel,
}

/// A physical asset parked at an airport or committed to a flight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aircraft {
    /// Registration, unique key.
    pub registry: String,
    pub type_name: String,
    pub category: AircraftCategory,
    pub engine_type: EngineType,
    pub engine_count: u8,
    pub fuel_type: FuelType,
    pub tank_capacity_gal: f64,
    pub mtow_lb: f64,
    pub current_airport: String,
    /// None = system-owned (for sale or rent from the world populator).
    pub owner: Option<OwnerRef>,
    pub fuel_gal: f64,
    /// Advisory deadlines for in-progress ground operations.
    pub fuelling_until: Option<DateTime<Utc>>,
    pub loading_until: Option<DateTime<Utc>>,
    /// Deferred time-warp repayment; the aircraft is unavailable until then.
    pub warping_until: Option<DateTime<Utc>>,
    pub maintenance_until: Option<DateTime<Utc>>,
    pub lifetime_income: Cents,
    pub lifetime_expense: Cents,
    pub airframe_hours: f64,
    /// Accumulated hours per engine; only the first `engine_count` are live.
    pub engine_hours: [f64; 4],
    pub sale_price: Option<Cents>,
    pub rent_price: Option<Cents>,
}

impl Aircraft {
    /// Whether the airframe itself can begin a flight right now.
    /// Active-flight checks live in the engine since they need the store.
    pub fn can_start_flight(&self, now: DateTime<Utc>) -> bool {
        let pending = |t: &Option<DateTime<Utc>>| t.map(|t| t > now).unwrap_or(false);
        !pending(&self.warping_until) && !pending(&self.maintenance_until)
    }

    /// Add `hours` to the airframe and every installed engine.
    pub fn accrue_hours(&mut self, hours: f64) {
        self.airframe_hours += hours;
        for i in 0..usize::from(self.engine_count).min(4) {
            self.engine_hours[i] += hours;
        }
    }
}

// ========== AIRPORT ==========

/// Simulators an airport can appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Simulator {
    Msfs,
    Xplane,
    Fsx,
    P3d,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airport {
    pub icao: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// 0..=5, drives the landing-fee schedule.
    pub size: i32,
    pub military: bool,
    pub closed: bool,
    pub sells_avgas: bool,
    pub sells_jetfuel: bool,
    pub avgas_price_cents_per_gal: Cents,
    pub jetfuel_price_cents_per_gal: Cents,
    pub simulators: Vec<Simulator>,
}

impl Airport {
    pub fn sells(&self, fuel: FuelType) -> bool {
        match fuel {
            FuelType::AvGas => self.sells_avgas,
            FuelType::JetFuel => self.sells_jetfuel,
        }
    }

    pub fn fuel_price_cents(&self, fuel: FuelType) -> Cents {
        match fuel {
            FuelType::AvGas => self.avgas_price_cents_per_gal,
            FuelType::JetFuel => self.jetfuel_price_cents_per_gal,
        }
    }
}

// ========== JOBS & PAYLOADS ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    CargoLong,
    CargoShort,
}

/// A commercial contract owning 1..=3 payloads. Deleted on completion or abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub origin_icao: String,
    pub category: String,
    pub job_type: JobType,
    pub value: Cents,
    pub expires_at: DateTime<Utc>,
    /// None = still listed as available.
    pub operator: Option<OwnerRef>,
    pub created_at: DateTime<Utc>,
}

/// Where a payload currently sits: never both at an airport and aboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PayloadLocation {
    Airport(String),
    Aircraft(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payload {
    pub id: String,
    pub job_id: String,
    pub weight_lb: f64,
    pub location: PayloadLocation,
    pub destination_icao: String,
}

impl Payload {
    /// True once the payload sits at its declared destination airport.
    pub fn delivered(&self) -> bool {
        matches!(&self.location, PayloadLocation::Airport(icao) if *icao == self.destination_icao)
    }
}

// ========== FINANCIAL RECORDS ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    /// Top-level settlement record for a completed flight.
    Flight,
    Aircraft,
    Fuel,
    Cargo,
    AirportFees,
    Fines,
}

/// Income xor expense, enforced by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "side", content = "cents", rename_all = "snake_case")]
pub enum LedgerAmount {
    Income(Cents),
    Expense(Cents),
}

impl LedgerAmount {
    pub fn cents(&self) -> Cents {
        match self {
            LedgerAmount::Income(c) | LedgerAmount::Expense(c) => *c,
        }
    }

    pub fn is_income(&self) -> bool {
        matches!(self, LedgerAmount::Income(_))
    }
}

/// Immutable ledger entry. The only permitted update after creation is
/// retroactively setting `parent_record_id` when a flight claims
/// pre-existing fuel charges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinancialRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub category: RecordCategory,
    pub account: OwnerRef,
    pub amount: LedgerAmount,
    pub description: String,
    pub aircraft_registry: Option<String>,
    /// Airport at which the charge was incurred, when location-bound.
    pub airport_icao: Option<String>,
    pub parent_record_id: Option<String>,
}
