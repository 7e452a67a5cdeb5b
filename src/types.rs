use serde::{Deserialize, Serialize};

/// Stable identity of a beneficiary: its position in the cohort at the start
/// of the run. Survives removals of other beneficiaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BeneficiaryId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunId(pub u64);

/// Simulated month, 1-based. Month 1 is the first month of the horizon and
/// `Month::last(years)` the final one; nothing happens at month 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month(pub u32);

impl Month {
    pub const MONTHS_PER_YEAR: u32 = 12;

    /// Number of months in a horizon of `years` simulated years. Saturates at
    /// `u32::MAX`; `SimulationConfig::validate` rejects such horizons.
    pub fn horizon(years: u32) -> u32 {
        years.saturating_mul(Self::MONTHS_PER_YEAR)
    }

    /// Like `horizon`, but `None` when the month count does not fit a `u32`.
    pub fn checked_horizon(years: u32) -> Option<u32> {
        years.checked_mul(Self::MONTHS_PER_YEAR)
    }

    pub fn last(years: u32) -> Self {
        Month(Self::horizon(years))
    }

    /// Months remaining between this month and the end of a `horizon`-month run.
    pub fn months_until(self, horizon: u32) -> u32 {
        horizon.saturating_sub(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_is_twelve_months_per_year() {
        assert_eq!(Month::horizon(1), 12);
        assert_eq!(Month::horizon(5), 60);
        assert_eq!(Month::last(2), Month(24));
    }

    #[test]
    fn horizon_saturates_past_u32_range() {
        assert_eq!(Month::checked_horizon(u32::MAX / 12), Some(u32::MAX / 12 * 12));
        assert_eq!(Month::checked_horizon(u32::MAX / 12 + 1), None);
        assert_eq!(Month::horizon(400_000_000), u32::MAX);
    }

    #[test]
    fn months_until_counts_down_to_zero() {
        assert_eq!(Month(1).months_until(12), 11);
        assert_eq!(Month(12).months_until(12), 0);
    }

    #[test]
    fn month_serializes_as_bare_number() {
        let json = serde_json::to_string(&Month(7)).unwrap();
        assert_eq!(json, "7");
    }
}
