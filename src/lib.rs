//! Monte Carlo estimate of the payroll loss caused by deaths of beneficiaries
//! being reported late.
//!
//! Each run draws a lognormal salary cohort, ages it month by month against
//! Poisson-distributed national deaths, and bills every death the salary paid
//! until it is detected, capped at a configured maximum delay. Runs are
//! independent and execute in parallel.

pub mod analysis;
pub mod cohort;
pub mod config;
pub mod error;
pub mod events;
pub mod loss;
pub mod mortality;
pub mod simulation;
pub mod types;

pub use config::SimulationConfig;
pub use error::{ConfigError, SamplingError, SimError};
pub use loss::RunResult;
pub use simulation::{Execution, RunTable, Simulation, run_all, run_with};
