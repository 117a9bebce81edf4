//! Settlement math: late penalties, job payouts, landing fees.

use chrono::{DateTime, Utc};

use crate::models::Cents;

const LB_PER_TONNE: f64 = 2204.622_621_8;
const MILITARY_SURCHARGE_CENTS: Cents = 500_00;

/// Payout multiplier for a job delivered at `completed_at`.
///
/// 1.0 on time; 0.7 immediately upon expiry; a further 0.05 off per
/// additional full day late, floored at 0 from 14 days. The full-day
/// truncation is deliberate and load-bearing for payout amounts.
pub fn late_penalty_multiplier(expires_at: DateTime<Utc>, completed_at: DateTime<Utc>) -> f64 {
    if completed_at <= expires_at {
        return 1.0;
    }
    let days_late = (completed_at - expires_at).num_days();
    (0.7 - 0.05 * days_late as f64).max(0.0)
}

/// Amounts to post when a job completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JobSettlement {
    pub multiplier: f64,
    pub payout_cents: Cents,
    /// Withheld portion posted as a fine when late; zero on time.
    pub fine_cents: Cents,
}

/// Compute the payout and fine for a job of `value` completing now.
pub fn settle_job(
    value: Cents,
    expires_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
) -> JobSettlement {
    let multiplier = late_penalty_multiplier(expires_at, completed_at);
    let payout_cents = (value as f64 * multiplier).round() as Cents;
    let fine_cents = if multiplier < 1.0 { value - payout_cents } else { 0 };
    JobSettlement { multiplier, payout_cents, fine_cents }
}

/// Penalty charged to the operator when a job is aborted: 30% of value.
pub fn job_abort_penalty(value: Cents) -> Cents {
    (value as f64 * 0.30).round() as Cents
}

/// Landing fee by MTOW tonnage and airport size, plus a flat military
/// surcharge.
pub fn landing_fee_cents(mtow_lb: f64, airport_size: i32, military: bool) -> Cents {
    let tonnes = mtow_lb / LB_PER_TONNE;
    let base_dollars = if airport_size >= 5 {
        220.0 + 6.0 * (tonnes - 45.0).max(0.0)
    } else if airport_size >= 2 {
        15.0 * tonnes
    } else if airport_size == 1 {
        10.0
    } else {
        0.0
    };
    let surcharge = if military { MILITARY_SURCHARGE_CENTS } else { 0 };
    (base_dollars * 100.0).round() as Cents + surcharge
}

/// Fine for landing at a closed airport.
pub const CLOSED_AIRPORT_FINE_CENTS: Cents = 500_00;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn on_time_pays_in_full() {
        let t = Utc::now();
        let s = settle_job(100_000, t, t - Duration::hours(1));
        assert_eq!(s.multiplier, 1.0);
        assert_eq!(s.payout_cents, 100_000);
        assert_eq!(s.fine_cents, 0);
    }

    #[test]
    fn thirty_six_hours_late_pays_sixty_five_percent() {
        // $1000 job, 1.5 days late: 0.7 - 0.05*1 = 0.65, $650 payout, $350 fine.
        let t = Utc::now();
        let s = settle_job(100_000, t, t + Duration::hours(36));
        assert!((s.multiplier - 0.65).abs() < 1e-9);
        assert_eq!(s.payout_cents, 65_000);
        assert_eq!(s.fine_cents, 35_000);
    }

    #[test]
    fn expiry_instant_drops_to_seventy_percent() {
        let t = Utc::now();
        let s = settle_job(100_000, t, t + Duration::seconds(1));
        assert!((s.multiplier - 0.7).abs() < 1e-9);
        assert_eq!(s.payout_cents, 70_000);
    }

    #[test]
    fn fourteen_days_late_pays_nothing() {
        let t = Utc::now();
        let s = settle_job(100_000, t, t + Duration::days(14));
        assert_eq!(s.multiplier, 0.0);
        assert_eq!(s.payout_cents, 0);
        assert_eq!(s.fine_cents, 100_000);

        // Thirteen full days still pays a sliver.
        let s = settle_job(100_000, t, t + Duration::days(13) + Duration::hours(1));
        assert!((s.multiplier - 0.05).abs() < 1e-9);
    }

    #[test]
    fn day_boundary_truncates() {
        let t = Utc::now();
        // 47 hours late is still one additional full day.
        let s = settle_job(100_000, t, t + Duration::hours(47));
        assert!((s.multiplier - 0.65).abs() < 1e-9);
        // 48 hours crosses into the second day.
        let s = settle_job(100_000, t, t + Duration::hours(48));
        assert!((s.multiplier - 0.60).abs() < 1e-9);
    }

    #[test]
    fn abort_penalty_is_thirty_percent() {
        assert_eq!(job_abort_penalty(100_000), 30_000);
        assert_eq!(job_abort_penalty(333), 100);
    }

    #[test]
    fn landing_fee_schedule() {
        // 45 tonnes at a size-5 field: flat $220.
        let mtow_45t = 45.0 * 2204.622_621_8;
        assert_eq!(landing_fee_cents(mtow_45t, 5, false), 220_00);

        // 50 tonnes: $220 + 6 * 5 = $250.
        let mtow_50t = 50.0 * 2204.622_621_8;
        assert_eq!(landing_fee_cents(mtow_50t, 5, false), 250_00);

        // Size 2-4: $15 per tonne.
        let mtow_4t = 4.0 * 2204.622_621_8;
        assert_eq!(landing_fee_cents(mtow_4t, 3, false), 60_00);

        // Size 1: flat $10.
        assert_eq!(landing_fee_cents(mtow_4t, 1, false), 10_00);

        // Size 0: surcharge only.
        assert_eq!(landing_fee_cents(mtow_4t, 0, false), 0);
        assert_eq!(landing_fee_cents(mtow_4t, 0, true), 500_00);

        // Military surcharge stacks on the base fee.
        assert_eq!(landing_fee_cents(mtow_4t, 1, true), 510_00);
    }
}
