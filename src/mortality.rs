use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Poisson};
use serde::{Deserialize, Serialize};

use crate::cohort::Cohort;
use crate::error::SamplingError;
use crate::events::DeathEvent;
use crate::types::Month;

/// Population-wide monthly mortality, applied uniformly to every beneficiary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NationalMortality {
    /// Poisson λ: expected national deaths per month.
    pub monthly_rate: f64,
    pub total_population: f64,
}

impl NationalMortality {
    pub fn new(monthly_rate: f64, total_population: f64) -> Self {
        NationalMortality { monthly_rate, total_population }
    }

    /// Draw one national death count per month, independent across months.
    pub fn sample_deaths(&self, months: u32, rng: &mut impl Rng) -> Result<Vec<u64>, SamplingError> {
        // Poisson rejects λ = 0; the count is then 0 with certainty.
        if self.monthly_rate == 0.0 {
            return Ok(vec![0; months as usize]);
        }
        let poisson = Poisson::new(self.monthly_rate)?;
        Ok((0..months)
            .map(|_| {
                let d: f64 = poisson.sample(rng);
                d as u64
            })
            .collect())
    }

    /// Per-beneficiary probability of dying in a month with `national_deaths`
    /// deaths nationwide. Not renormalized by cohort size. Returns the
    /// probability and whether it had to be clamped to 1.
    pub fn death_probability(&self, national_deaths: u64) -> (f64, bool) {
        let p = national_deaths as f64 / self.total_population;
        if p > 1.0 { (1.0, true) } else { (p, false) }
    }
}

/// What happened to the cohort in one month of one run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthRecord {
    pub month: Month,
    pub national_deaths: u64,
    pub death_probability: f64,
    /// National deaths exceeded the population; probability clamped to 1.
    pub clamped: bool,
    pub deaths: u64,
    /// Cohort size after this month's removals.
    pub active_after: u64,
}

/// Death events and month-by-month trace of one run's mortality pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MortalityTrace {
    /// In month order; within a month, in cohort order.
    pub deaths: Vec<DeathEvent>,
    pub months: Vec<MonthRecord>,
}

/// Advance `cohort` by one month.
///
/// Every active beneficiary gets one Bernoulli trial, all decided against the
/// cohort as it stands at the start of the month; removals are applied
/// afterwards in a single pass.
pub fn step_month(
    cohort: &mut Cohort,
    month: Month,
    national_deaths: u64,
    mortality: &NationalMortality,
    rng: &mut impl Rng,
    deaths: &mut Vec<DeathEvent>,
) -> Result<MonthRecord, SamplingError> {
    let (p, clamped) = mortality.death_probability(national_deaths);
    if clamped {
        log::warn!(
            "month {}: {national_deaths} national deaths exceed population {}, clamping death probability to 1",
            month.0,
            mortality.total_population
        );
    }
    let trial = Bernoulli::new(p)
        .map_err(|source| SamplingError::DeathTrial { month: month.0, source })?;

    let flags: Vec<bool> = (0..cohort.len()).map(|_| trial.sample(rng)).collect();
    let removed = cohort.remove_flagged(&flags);

    deaths.extend(removed.iter().map(|b| DeathEvent {
        beneficiary: b.id,
        month,
        salary: b.salary,
    }));

    Ok(MonthRecord {
        month,
        national_deaths,
        death_probability: p,
        clamped,
        deaths: removed.len() as u64,
        active_after: cohort.len() as u64,
    })
}

/// Age `cohort` through `horizon` months, one national death count per month.
pub fn run_mortality(
    cohort: &mut Cohort,
    horizon: u32,
    mortality: &NationalMortality,
    rng: &mut impl Rng,
) -> Result<MortalityTrace, SamplingError> {
    let national = mortality.sample_deaths(horizon, rng)?;
    let mut trace = MortalityTrace { deaths: Vec::new(), months: Vec::with_capacity(national.len()) };

    for (i, &d) in national.iter().enumerate() {
        let month = Month(i as u32 + 1);
        let record = step_month(cohort, month, d, mortality, rng, &mut trace.deaths)?;
        trace.months.push(record);
    }

    Ok(trace)
}
