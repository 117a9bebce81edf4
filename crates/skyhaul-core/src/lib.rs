pub mod ground_ops;
pub mod models;
pub mod rates;
pub mod settlement;
pub mod spatial;

pub use ground_ops::{
    plan_fuel_transfer, plan_payload_transfer, FuelPlan, FuelTransferRequest, GroundOpsError,
    PayloadTransferRequest,
};
pub use models::{
    flight_number_valid, Aircraft, AircraftCategory, Airport, Cents, EngineType, FinancialRecord,
    Flight, FlightPhase, FlightState, FuelType, Job, JobType, LedgerAmount, NavFix, Operator,
    OwnerRef, Payload, PayloadLocation, RecordCategory, Simulator, TelemetrySnapshot,
    FUEL_TANK_COUNT,
};
pub use settlement::{
    job_abort_penalty, landing_fee_cents, late_penalty_multiplier, settle_job, JobSettlement,
};
pub use spatial::{coverage_bbox, haversine_distance, nearest_airport, BoundingBox};
