//! Error types for configuration validation and per-run sampling.

use thiserror::Error;

use crate::types::RunId;

/// A configuration rejected before any run starts.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("salary_mean must be a positive finite number, got {0}")]
    NonPositiveSalaryMean(f64),

    #[error("salary_std_dev must be a non-negative finite number, got {0}")]
    NegativeSalaryStdDev(f64),

    #[error("num_runs must be at least 1")]
    NoRuns,

    #[error("simulated_years must be at least 1")]
    EmptyHorizon,

    #[error("simulated_years {0} is too long: the horizon in months overflows u32")]
    HorizonTooLong(u32),

    #[error("max_delay_months must be at least 1")]
    ZeroMaxDelay,

    #[error("monthly_death_rate must be a non-negative finite number, got {0}")]
    NegativeDeathRate(f64),

    #[error("total_population must be a positive finite number, got {0}")]
    NonPositivePopulation(f64),
}

/// A distribution rejected its parameters mid-run.
#[derive(Debug, Error, Clone)]
pub enum SamplingError {
    #[error("salary distribution: {0}")]
    Salary(#[from] rand_distr::NormalError),

    #[error("national death distribution: {0}")]
    NationalDeaths(#[from] rand_distr::PoissonError),

    #[error("death trial in month {month}: {source}")]
    DeathTrial {
        month: u32,
        #[source]
        source: rand_distr::BernoulliError,
    },
}

/// Unified simulation error.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("run {} aborted: {source}", .run.0)]
    RunAborted {
        run: RunId,
        #[source]
        source: SamplingError,
    },
}
