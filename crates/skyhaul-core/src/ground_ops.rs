//! Ground operations calculator.
//!
//! Pure timing and pricing math for fuel and payload transfers. Callers
//! (aircraft-side ground operations, flight Start, flight Complete) apply
//! the resulting plan to persistent state; nothing here mutates anything.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use crate::models::{AircraftCategory, Airport, Cents, FuelType};
use crate::rates::{fuel_transfer_gpm, payload_transfer_ppm, FUEL_OVERHEAD_SECS, PAYLOAD_OVERHEAD_SECS};

#[derive(Debug, Error, PartialEq)]
pub enum GroundOpsError {
    #[error("requested fuel {requested} gal is outside 0..={capacity} gal")]
    FuelOutOfRange { requested: f64, capacity: f64 },
    #[error("airport {icao} does not sell {fuel:?}")]
    FuelNotSold { icao: String, fuel: FuelType },
    #[error("{category:?} aircraft cannot perform this ground operation")]
    UnsupportedCategory { category: AircraftCategory },
}

/// Inputs for a fuel transfer plan.
#[derive(Debug, Clone)]
pub struct FuelTransferRequest<'a> {
    pub current_gal: f64,
    pub capacity_gal: f64,
    pub target_gal: f64,
    pub category: AircraftCategory,
    pub fuel_type: FuelType,
    pub airport: &'a Airport,
    /// Skip fuelling at zero cost instead of failing when the airport
    /// does not sell the required fuel type.
    pub skip_when_not_sold: bool,
    /// Already-running fuelling timer to merge with, if any.
    pub in_progress_until: Option<DateTime<Utc>>,
}

/// Outcome of planning a fuel transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct FuelPlan {
    /// Gallons actually moved (absolute; defuelling moves fuel out).
    pub gallons_moved: f64,
    /// Resulting tank quantity to persist.
    pub resulting_gal: f64,
    /// Charge to the operator; zero when defuelling or skipped.
    pub cost_cents: Cents,
    /// Advisory completion deadline; None when nothing moves.
    pub completes_at: Option<DateTime<Utc>>,
    /// True when fuelling was skipped because the airport sells no
    /// matching fuel and the caller asked to proceed anyway.
    pub skipped: bool,
}

/// Plan a fuel transfer toward `target_gal`.
///
/// Increasing fuel prices the transfer at the airport's per-gallon rate.
/// Decreasing fuel is free. Timing is a fixed 3-minute overhead plus the
/// category transfer rate, or an extension of an in-progress timer.
pub fn plan_fuel_transfer(
    req: &FuelTransferRequest<'_>,
    now: DateTime<Utc>,
) -> Result<FuelPlan, GroundOpsError> {
    if req.target_gal < 0.0 || req.target_gal > req.capacity_gal {
        return Err(GroundOpsError::FuelOutOfRange {
            requested: req.target_gal,
            capacity: req.capacity_gal,
        });
    }

    let delta = req.target_gal - req.current_gal;
    if delta == 0.0 {
        return Ok(FuelPlan {
            gallons_moved: 0.0,
            resulting_gal: req.current_gal,
            cost_cents: 0,
            completes_at: req.in_progress_until.filter(|t| *t > now),
            skipped: false,
        });
    }

    if delta > 0.0 && !req.airport.sells(req.fuel_type) {
        if req.skip_when_not_sold {
            return Ok(FuelPlan {
                gallons_moved: 0.0,
                resulting_gal: req.current_gal,
                cost_cents: 0,
                completes_at: req.in_progress_until.filter(|t| *t > now),
                skipped: true,
            });
        }
        return Err(GroundOpsError::FuelNotSold {
            icao: req.airport.icao.clone(),
            fuel: req.fuel_type,
        });
    }

    let gpm = fuel_transfer_gpm(req.category);
    if gpm <= 0.0 {
        return Err(GroundOpsError::UnsupportedCategory { category: req.category });
    }

    let gallons = delta.abs();
    let cost_cents = if delta > 0.0 {
        (gallons * req.airport.fuel_price_cents(req.fuel_type) as f64).round() as Cents
    } else {
        0
    };

    let transfer = Duration::seconds((gallons / gpm * 60.0).round() as i64);
    let completes_at = merge_timer(req.in_progress_until, now, FUEL_OVERHEAD_SECS, transfer);

    Ok(FuelPlan {
        gallons_moved: gallons,
        resulting_gal: req.target_gal,
        cost_cents,
        completes_at: Some(completes_at),
        skipped: false,
    })
}

/// Inputs for a payload transfer plan.
#[derive(Debug, Clone)]
pub struct PayloadTransferRequest {
    /// Total payload weight moving on or off the aircraft.
    pub weight_lb: f64,
    pub category: AircraftCategory,
    /// Already-running loading timer to merge with, if any.
    pub in_progress_until: Option<DateTime<Utc>>,
}

/// Plan a payload transfer. 1 minute fixed overhead plus the category
/// lbs/min rate, merged with any in-progress loading timer.
pub fn plan_payload_transfer(
    req: &PayloadTransferRequest,
    now: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, GroundOpsError> {
    if req.weight_lb <= 0.0 {
        return Ok(req.in_progress_until.filter(|t| *t > now));
    }

    let ppm = payload_transfer_ppm(req.category);
    if ppm <= 0.0 {
        return Err(GroundOpsError::UnsupportedCategory { category: req.category });
    }

    let transfer = Duration::seconds((req.weight_lb / ppm * 60.0).round() as i64);
    Ok(Some(merge_timer(req.in_progress_until, now, PAYLOAD_OVERHEAD_SECS, transfer)))
}

/// A fresh operation pays the fixed overhead; an in-progress timer is
/// extended by the transfer time only.
fn merge_timer(
    in_progress: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    overhead_secs: i64,
    transfer: Duration,
) -> DateTime<Utc> {
    match in_progress.filter(|t| *t > now) {
        Some(running) => running + transfer,
        None => now + Duration::seconds(overhead_secs) + transfer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Simulator;

    fn airport(sells_jetfuel: bool, jetfuel_cents: Cents) -> Airport {
        Airport {
            icao: "KSFO".into(),
            name: "San Francisco".into(),
            lat: 37.6188,
            lon: -122.3754,
            size: 5,
            military: false,
            closed: false,
            sells_avgas: true,
            sells_jetfuel,
            avgas_price_cents_per_gal: 550,
            jetfuel_price_cents_per_gal: jetfuel_cents,
            simulators: vec![Simulator::Msfs],
        }
    }

    #[test]
    fn jet_hundred_gallons_at_two_dollars() {
        // 100 gal at $2/gal, 50 gal/min: $200, done at now + 3min + 2min.
        let now = Utc::now();
        let apt = airport(true, 200);
        let plan = plan_fuel_transfer(
            &FuelTransferRequest {
                current_gal: 0.0,
                capacity_gal: 500.0,
                target_gal: 100.0,
                category: AircraftCategory::Jet,
                fuel_type: FuelType::JetFuel,
                airport: &apt,
                skip_when_not_sold: false,
                in_progress_until: None,
            },
            now,
        )
        .unwrap();

        assert_eq!(plan.cost_cents, 20000);
        assert_eq!(plan.gallons_moved, 100.0);
        assert_eq!(plan.completes_at, Some(now + Duration::minutes(5)));
        assert!(!plan.skipped);
    }

    #[test]
    fn capacity_is_an_inclusive_bound() {
        let now = Utc::now();
        let apt = airport(true, 200);
        let base = FuelTransferRequest {
            current_gal: 0.0,
            capacity_gal: 500.0,
            target_gal: 500.0,
            category: AircraftCategory::Jet,
            fuel_type: FuelType::JetFuel,
            airport: &apt,
            skip_when_not_sold: false,
            in_progress_until: None,
        };
        assert!(plan_fuel_transfer(&base, now).is_ok());

        let over = FuelTransferRequest { target_gal: 501.0, ..base.clone() };
        assert_eq!(
            plan_fuel_transfer(&over, now),
            Err(GroundOpsError::FuelOutOfRange { requested: 501.0, capacity: 500.0 })
        );

        let negative = FuelTransferRequest { target_gal: -1.0, ..base };
        assert!(plan_fuel_transfer(&negative, now).is_err());
    }

    #[test]
    fn defuelling_is_free_but_takes_time() {
        let now = Utc::now();
        let apt = airport(true, 200);
        let plan = plan_fuel_transfer(
            &FuelTransferRequest {
                current_gal: 100.0,
                capacity_gal: 500.0,
                target_gal: 50.0,
                category: AircraftCategory::Jet,
                fuel_type: FuelType::JetFuel,
                airport: &apt,
                skip_when_not_sold: false,
                in_progress_until: None,
            },
            now,
        )
        .unwrap();
        assert_eq!(plan.cost_cents, 0);
        assert_eq!(plan.resulting_gal, 50.0);
        assert_eq!(plan.completes_at, Some(now + Duration::minutes(4)));
    }

    #[test]
    fn missing_fuel_type_fails_or_skips() {
        let now = Utc::now();
        let apt = airport(false, 200);
        let req = FuelTransferRequest {
            current_gal: 0.0,
            capacity_gal: 500.0,
            target_gal: 100.0,
            category: AircraftCategory::Jet,
            fuel_type: FuelType::JetFuel,
            airport: &apt,
            skip_when_not_sold: false,
            in_progress_until: None,
        };
        assert!(matches!(
            plan_fuel_transfer(&req, now),
            Err(GroundOpsError::FuelNotSold { .. })
        ));

        let skip = FuelTransferRequest { skip_when_not_sold: true, ..req };
        let plan = plan_fuel_transfer(&skip, now).unwrap();
        assert!(plan.skipped);
        assert_eq!(plan.cost_cents, 0);
        assert_eq!(plan.gallons_moved, 0.0);
    }

    #[test]
    fn running_timer_extends_without_overhead() {
        let now = Utc::now();
        let apt = airport(true, 200);
        let running = now + Duration::minutes(10);
        let plan = plan_fuel_transfer(
            &FuelTransferRequest {
                current_gal: 0.0,
                capacity_gal: 500.0,
                target_gal: 100.0,
                category: AircraftCategory::Jet,
                fuel_type: FuelType::JetFuel,
                airport: &apt,
                skip_when_not_sold: false,
                in_progress_until: Some(running),
            },
            now,
        )
        .unwrap();
        // 100 gal at 50 gal/min appended to the running window.
        assert_eq!(plan.completes_at, Some(running + Duration::minutes(2)));
    }

    #[test]
    fn payload_timing_merges_running_loader() {
        let now = Utc::now();
        // 1000 lb at 500 lb/min: 1 min overhead + 2 min transfer.
        let fresh = plan_payload_transfer(
            &PayloadTransferRequest {
                weight_lb: 1000.0,
                category: AircraftCategory::Jet,
                in_progress_until: None,
            },
            now,
        )
        .unwrap();
        assert_eq!(fresh, Some(now + Duration::minutes(3)));

        let running = now + Duration::minutes(4);
        let merged = plan_payload_transfer(
            &PayloadTransferRequest {
                weight_lb: 1000.0,
                category: AircraftCategory::Jet,
                in_progress_until: Some(running),
            },
            now,
        )
        .unwrap();
        assert_eq!(merged, Some(running + Duration::minutes(2)));
    }

    #[test]
    fn zero_weight_keeps_existing_timer() {
        let now = Utc::now();
        let running = now + Duration::minutes(2);
        let kept = plan_payload_transfer(
            &PayloadTransferRequest {
                weight_lb: 0.0,
                category: AircraftCategory::Piston,
                in_progress_until: Some(running),
            },
            now,
        )
        .unwrap();
        assert_eq!(kept, Some(running));
    }
}
