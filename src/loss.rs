use serde::{Deserialize, Serialize};

use crate::events::DeathEvent;
use crate::types::{Month, RunId};

/// One row of the output table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub run: RunId,
    /// Seed of the generator the run drew from; rerunning it alone with this
    /// seed reproduces the row.
    pub seed: u64,
    /// Currency units.
    pub accumulated_loss: f64,
    pub death_count: u64,
}

/// Months of payments made after a death in `month` and billed as loss.
///
/// The natural delay is the time left until the end of the horizon; it is
/// capped at `max_delay` so every undetected death costs at most
/// `max_delay` months of salary.
pub fn billable_delay(month: Month, horizon: u32, max_delay: u32) -> u32 {
    month.months_until(horizon).min(max_delay)
}

pub fn loss_contribution(event: &DeathEvent, horizon: u32, max_delay: u32) -> f64 {
    billable_delay(event.month, horizon, max_delay) as f64 * event.salary
}

/// Sum the delay-capped losses of one run's death events.
pub fn accumulate(deaths: &[DeathEvent], horizon: u32, max_delay: u32) -> f64 {
    deaths.iter().map(|e| loss_contribution(e, horizon, max_delay)).sum()
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::types::BeneficiaryId;

    fn death(month: u32, salary: f64) -> DeathEvent {
        DeathEvent { beneficiary: BeneficiaryId(0), month: Month(month), salary }
    }

    #[test]
    fn delay_capped_early_in_horizon() {
        // 12-month horizon, cap 6: a death in month 1 has 11 months left.
        assert_eq!(billable_delay(Month(1), 12, 6), 6);
        assert_eq!(billable_delay(Month(6), 12, 6), 6);
    }

    #[test]
    fn delay_uncapped_near_end_of_horizon() {
        assert_eq!(billable_delay(Month(7), 12, 6), 5);
        assert_eq!(billable_delay(Month(11), 12, 6), 1);
        assert_eq!(billable_delay(Month(12), 12, 6), 0);
    }

    #[test]
    fn death_in_last_month_costs_nothing() {
        assert_eq!(loss_contribution(&death(60, 9_999.0), 60, 6), 0.0);
    }

    #[test]
    fn accumulate_sums_contributions() {
        let deaths = vec![death(1, 1_000.0), death(10, 2_000.0), death(12, 500.0)];
        // 6 × 1000 + 2 × 2000 + 0 × 500
        assert_relative_eq!(accumulate(&deaths, 12, 6), 10_000.0);
    }

    #[test]
    fn accumulate_empty_is_zero() {
        assert_eq!(accumulate(&[], 60, 6), 0.0);
    }

    proptest! {
        #[test]
        fn billable_delay_within_cap(horizon in 1u32..=120, month_frac in 0.0f64..1.0, max_delay in 1u32..=24) {
            let month = 1 + ((horizon - 1) as f64 * month_frac) as u32;
            let delay = billable_delay(Month(month), horizon, max_delay);
            prop_assert!(delay <= max_delay);
            prop_assert!(delay <= horizon - month);
        }

        #[test]
        fn full_horizon_cap_never_binds(horizon in 1u32..=120, month_frac in 0.0f64..1.0) {
            let month = 1 + ((horizon - 1) as f64 * month_frac) as u32;
            prop_assert_eq!(billable_delay(Month(month), horizon, horizon), horizon - month);
        }

        #[test]
        fn accumulated_loss_is_non_negative(
            deaths in proptest::collection::vec((1u32..=60, 0.0f64..50_000.0), 0..50),
        ) {
            let events: Vec<DeathEvent> = deaths.iter().map(|&(m, s)| death(m, s)).collect();
            prop_assert!(accumulate(&events, 60, 6) >= 0.0);
        }
    }
}
