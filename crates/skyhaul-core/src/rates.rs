//! Transfer-rate and cruise-speed tables.
//!
//! These tables are the single source of truth for ground-operation timing.
//! The same numbers back aircraft-side ground operations, flight Start, and
//! flight Complete, so they live here rather than at any one call site.

use crate::models::{AircraftCategory, EngineType};

/// Fixed setup overhead before fuel starts flowing.
pub const FUEL_OVERHEAD_SECS: i64 = 180;

/// Fixed setup overhead before payload starts moving.
pub const PAYLOAD_OVERHEAD_SECS: i64 = 60;

/// Fuel transfer rate in gallons per minute. Zero means the category
/// does not support fuel ground operations.
pub fn fuel_transfer_gpm(category: AircraftCategory) -> f64 {
    match category {
        AircraftCategory::Piston => 10.0,
        AircraftCategory::Turboprop => 25.0,
        AircraftCategory::Jet => 50.0,
        AircraftCategory::Airliner => 120.0,
        AircraftCategory::Helicopter => 15.0,
        AircraftCategory::Glider => 0.0,
    }
}

/// Payload transfer rate in pounds per minute.
pub fn payload_transfer_ppm(category: AircraftCategory) -> f64 {
    match category {
        AircraftCategory::Piston => 150.0,
        AircraftCategory::Turboprop => 400.0,
        AircraftCategory::Jet => 500.0,
        AircraftCategory::Airliner => 2000.0,
        AircraftCategory::Helicopter => 250.0,
        AircraftCategory::Glider => 0.0,
    }
}

/// Cruise speed in knots used for the synthetic return flight after an
/// airborne abort.
pub fn cruise_speed_kt(engine: EngineType) -> f64 {
    match engine {
        EngineType::Jet => 400.0,
        EngineType::Turboprop => 250.0,
        EngineType::Piston => 100.0,
        EngineType::HeloTurbine => 150.0,
        EngineType::None => 0.0,
    }
}
