use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Month;

/// National deaths recorded by the civil registry in 2022, spread evenly
/// over twelve months.
pub const NATIONAL_MONTHLY_DEATHS: f64 = 1_544_611.0 / 12.0;

pub const NATIONAL_POPULATION: f64 = 210e6;

/// Parameters of one invocation of the model. Immutable once the runs start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub simulated_years: u32,
    /// Cap on the number of months of payments billed per death.
    pub max_delay_months: u32,
    /// Initial cohort size.
    pub recipient_count: u64,
    /// Arithmetic-scale mean of the salary distribution (currency units).
    pub salary_mean: f64,
    /// Arithmetic-scale standard deviation of the salary distribution.
    pub salary_std_dev: f64,
    pub num_runs: u64,
    /// Poisson mean of national deaths per month.
    pub monthly_death_rate: f64,
    /// National population used to turn national deaths into a
    /// per-beneficiary probability.
    pub total_population: f64,
    /// Base seed. Run `i` draws from a generator seeded with `seed + i`.
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::canonical()
    }
}

impl SimulationConfig {
    pub fn canonical() -> Self {
        SimulationConfig {
            simulated_years: 5,
            max_delay_months: 6,
            recipient_count: 10_000,
            salary_mean: 5_000.0,
            salary_std_dev: 2_000.0,
            num_runs: 1_000,
            monthly_death_rate: NATIONAL_MONTHLY_DEATHS,
            total_population: NATIONAL_POPULATION,
            seed: 42,
        }
    }

    /// Read a JSON configuration file. Missing fields take canonical values.
    pub fn from_json_file(path: &Path) -> Result<Self, std::io::Error> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).map_err(std::io::Error::from)
    }

    pub fn horizon_months(&self) -> u32 {
        Month::horizon(self.simulated_years)
    }

    /// Reject configurations the model cannot run. Called once, before any
    /// run is attempted.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.salary_mean > 0.0 && self.salary_mean.is_finite()) {
            return Err(ConfigError::NonPositiveSalaryMean(self.salary_mean));
        }
        if !(self.salary_std_dev >= 0.0 && self.salary_std_dev.is_finite()) {
            return Err(ConfigError::NegativeSalaryStdDev(self.salary_std_dev));
        }
        if self.num_runs == 0 {
            return Err(ConfigError::NoRuns);
        }
        if self.simulated_years == 0 {
            return Err(ConfigError::EmptyHorizon);
        }
        if Month::checked_horizon(self.simulated_years).is_none() {
            return Err(ConfigError::HorizonTooLong(self.simulated_years));
        }
        if self.max_delay_months == 0 {
            return Err(ConfigError::ZeroMaxDelay);
        }
        // Zero is accepted: every month then has no national deaths.
        if !(self.monthly_death_rate >= 0.0 && self.monthly_death_rate.is_finite()) {
            return Err(ConfigError::NegativeDeathRate(self.monthly_death_rate));
        }
        if !(self.total_population > 0.0 && self.total_population.is_finite()) {
            return Err(ConfigError::NonPositivePopulation(self.total_population));
        }
        Ok(())
    }
}
