use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use rayon::prelude::*;

use crate::cohort::{Cohort, SalaryModel};
use crate::config::SimulationConfig;
use crate::error::{ConfigError, SamplingError, SimError};
use crate::events::DeathEvent;
use crate::loss::{self, RunResult};
use crate::mortality::{self, MonthRecord, NationalMortality};
use crate::types::RunId;

/// One independent run of the model: cohort draw, monthly mortality, loss.
pub struct Simulation {
    run: RunId,
    seed: u64,
    rng: ChaCha20Rng,
    salary_model: SalaryModel,
    mortality: NationalMortality,
    recipient_count: u64,
    horizon: u32,
    max_delay: u32,
}

/// Everything a run produced, not just its table row.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub result: RunResult,
    pub deaths: Vec<DeathEvent>,
    pub months: Vec<MonthRecord>,
}

impl Simulation {
    /// Construct run `run` of `config`. Its generator is seeded with
    /// `config.seed + run`, so any run can be replayed on its own. The
    /// configuration is validated first.
    pub fn from_config(config: &SimulationConfig, run: RunId) -> Result<Self, ConfigError> {
        config.validate()?;
        let salary_model = SalaryModel::from_moments(config.salary_mean, config.salary_std_dev)?;
        let seed = config.seed.wrapping_add(run.0);
        Ok(Simulation {
            run,
            seed,
            rng: ChaCha20Rng::seed_from_u64(seed),
            salary_model,
            mortality: NationalMortality::new(config.monthly_death_rate, config.total_population),
            recipient_count: config.recipient_count,
            horizon: config.horizon_months(),
            max_delay: config.max_delay_months,
        })
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn run(mut self) -> Result<RunOutcome, SamplingError> {
        let mut cohort = Cohort::initialise(self.recipient_count, &self.salary_model, &mut self.rng)?;
        let trace = mortality::run_mortality(&mut cohort, self.horizon, &self.mortality, &mut self.rng)?;
        let accumulated_loss = loss::accumulate(&trace.deaths, self.horizon, self.max_delay);

        let result = RunResult {
            run: self.run,
            seed: self.seed,
            accumulated_loss,
            death_count: cohort.removed_count(),
        };
        log::debug!(
            "run {} complete: {} deaths, loss {:.2}",
            self.run.0,
            result.death_count,
            result.accumulated_loss
        );
        Ok(RunOutcome { result, deaths: trace.deaths, months: trace.months })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Execution {
    /// Runs spread over the rayon thread pool.
    #[default]
    Parallel,
    Sequential,
}

/// A run that aborted mid-sampling. The other runs are unaffected.
#[derive(Debug, Clone)]
pub struct RunFailure {
    pub run: RunId,
    pub seed: u64,
    pub error: SamplingError,
}

/// The engine's output: one row per successful run, in run order, plus any
/// runs that aborted.
#[derive(Debug, Clone, Default)]
pub struct RunTable {
    pub rows: Vec<RunResult>,
    pub failures: Vec<RunFailure>,
}

impl RunTable {
    /// Split per-run results, given in run order, into rows and failures.
    pub fn from_results(results: Vec<Result<RunResult, RunFailure>>) -> Self {
        let mut table = RunTable::default();
        for result in results {
            match result {
                Ok(row) => table.rows.push(row),
                Err(failure) => {
                    log::error!(
                        "run {} (seed {}) aborted: {}",
                        failure.run.0,
                        failure.seed,
                        failure.error
                    );
                    table.failures.push(failure);
                }
            }
        }
        table
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The rows, or the first aborted run as an error.
    pub fn into_rows(self) -> Result<Vec<RunResult>, SimError> {
        match self.failures.into_iter().next() {
            Some(f) => Err(SimError::RunAborted { run: f.run, source: f.error }),
            None => Ok(self.rows),
        }
    }
}

/// Execute every run of `config`, handing each run's full outcome to `sink`
/// on the worker that produced it.
///
/// Only the reduced `RunResult` outlives the worker; death events and the
/// month trace are dropped as soon as `sink` returns. The configuration is
/// validated once up front and nothing runs if it is rejected. Rows come
/// back in run order whatever the execution mode.
pub fn run_with<F>(config: &SimulationConfig, execution: Execution, sink: F) -> Result<RunTable, SimError>
where
    F: Fn(&RunOutcome) + Sync,
{
    config.validate()?;
    log::info!(
        "starting {} runs ({:?}): {} recipients over {} months, seed {}",
        config.num_runs,
        execution,
        config.recipient_count,
        config.horizon_months(),
        config.seed
    );

    let one = |i: u64| -> Result<Result<RunResult, RunFailure>, ConfigError> {
        let run = RunId(i);
        let sim = Simulation::from_config(config, run)?;
        let seed = sim.seed();
        Ok(match sim.run() {
            Ok(outcome) => {
                sink(&outcome);
                Ok(outcome.result)
            }
            Err(error) => Err(RunFailure { run, seed, error }),
        })
    };

    let results = match execution {
        Execution::Parallel => (0..config.num_runs).into_par_iter().map(one).collect::<Result<Vec<_>, _>>()?,
        Execution::Sequential => (0..config.num_runs).map(one).collect::<Result<Vec<_>, _>>()?,
    };
    let table = RunTable::from_results(results);
    log::info!("{} runs complete, {} aborted", table.rows.len(), table.failures.len());
    Ok(table)
}

/// Execute every run of `config` and assemble the output table.
pub fn run_all(config: &SimulationConfig, execution: Execution) -> Result<RunTable, SimError> {
    run_with(config, execution, |_| {})
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::loss::billable_delay;

    fn small_config() -> SimulationConfig {
        SimulationConfig {
            simulated_years: 2,
            max_delay_months: 6,
            recipient_count: 500,
            salary_mean: 5_000.0,
            salary_std_dev: 2_000.0,
            num_runs: 8,
            monthly_death_rate: 20.0,
            total_population: 1_000.0,
            seed: 42,
        }
    }

    fn run_one(config: &SimulationConfig, run: u64) -> RunOutcome {
        Simulation::from_config(config, RunId(run)).unwrap().run().unwrap()
    }

    // ── Run-level invariants ──────────────────────────────────────────────────

    #[test]
    fn death_count_matches_death_events() {
        let outcome = run_one(&small_config(), 0);
        assert_eq!(outcome.result.death_count, outcome.deaths.len() as u64);
        assert!(outcome.result.death_count > 0, "expected deaths with p ≈ 0.02 over 24 months");
    }

    #[test]
    fn loss_positive_whenever_deaths_before_last_month() {
        let outcome = run_one(&small_config(), 0);
        let horizon = small_config().horizon_months();
        if outcome.deaths.iter().any(|d| d.month.0 < horizon) {
            assert!(outcome.result.accumulated_loss > 0.0);
        }
    }

    #[test]
    fn month_trace_covers_horizon() {
        let outcome = run_one(&small_config(), 3);
        let months: Vec<u32> = outcome.months.iter().map(|m| m.month.0).collect();
        assert_eq!(months, (1..=24).collect::<Vec<_>>());
        let last = outcome.months.last().unwrap();
        assert_eq!(last.active_after, 500 - outcome.result.death_count);
    }

    #[test]
    fn empty_cohort_single_run() {
        let config = SimulationConfig { recipient_count: 0, num_runs: 1, ..small_config() };
        let table = run_all(&config, Execution::Sequential).unwrap();
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0].death_count, 0);
        assert_eq!(table.rows[0].accumulated_loss, 0.0);
    }

    #[test]
    fn zero_death_rate_yields_no_deaths() {
        let config = SimulationConfig { monthly_death_rate: 0.0, num_runs: 50, ..small_config() };
        let table = run_all(&config, Execution::Parallel).unwrap();
        assert_eq!(table.rows.len(), 50);
        assert!(table.rows.iter().all(|r| r.death_count == 0 && r.accumulated_loss == 0.0));
    }

    #[test]
    fn full_horizon_cap_bills_natural_delay() {
        let base = small_config();
        let config = SimulationConfig { max_delay_months: base.horizon_months(), ..base };
        let horizon = config.horizon_months();
        let outcome = run_one(&config, 0);
        assert!(!outcome.deaths.is_empty());

        let expected: f64 =
            outcome.deaths.iter().map(|d| d.month.months_until(horizon) as f64 * d.salary).sum();
        for d in &outcome.deaths {
            assert_eq!(billable_delay(d.month, horizon, horizon), horizon - d.month.0);
        }
        assert!((outcome.result.accumulated_loss - expected).abs() <= 1e-6 * expected.max(1.0));
    }

    #[test]
    fn clamped_probability_kills_everyone_in_month_one() {
        let config = SimulationConfig {
            recipient_count: 40,
            monthly_death_rate: 5_000.0,
            total_population: 100.0,
            ..small_config()
        };
        let outcome = run_one(&config, 0);
        assert_eq!(outcome.result.death_count, 40);
        assert!(outcome.months[0].clamped);
        assert!(outcome.deaths.iter().all(|d| d.month.0 == 1));

        // Every death is capped: 23 months left, cap 6.
        let salaries: f64 = outcome.deaths.iter().map(|d| d.salary).sum();
        assert!((outcome.result.accumulated_loss - 6.0 * salaries).abs() <= 1e-6 * salaries);
    }

    // ── Reproducibility ──────────────────────────────────────────────────────

    #[test]
    fn same_seed_reproduces_run() {
        let config = small_config();
        assert_eq!(run_one(&config, 2), run_one(&config, 2));
    }

    #[test]
    fn runs_draw_from_distinct_seeds() {
        let config = small_config();
        let a = run_one(&config, 0);
        let b = run_one(&config, 1);
        assert_eq!(a.result.seed, 42);
        assert_eq!(b.result.seed, 43);
        assert_ne!(a.deaths, b.deaths, "distinct seeds should give distinct runs");
    }

    #[test]
    fn run_replays_from_its_seed_alone() {
        let config = small_config();
        let table = run_all(&config, Execution::Parallel).unwrap();
        let row = table.rows[5];
        let replay_config = SimulationConfig { seed: row.seed, ..config };
        let replay = run_one(&replay_config, 0);
        assert_eq!(replay.result.accumulated_loss, row.accumulated_loss);
        assert_eq!(replay.result.death_count, row.death_count);
    }

    // ── Aggregation ──────────────────────────────────────────────────────────

    #[test]
    fn rows_in_run_order() {
        let table = run_all(&small_config(), Execution::Parallel).unwrap();
        let runs: Vec<u64> = table.rows.iter().map(|r| r.run.0).collect();
        assert_eq!(runs, (0..8).collect::<Vec<_>>());
        assert!(table.is_complete());
    }

    #[test]
    fn parallel_matches_sequential() {
        let config = small_config();
        let par = run_all(&config, Execution::Parallel).unwrap();
        let seq = run_all(&config, Execution::Sequential).unwrap();
        assert_eq!(par.rows, seq.rows);
    }

    #[test]
    fn invalid_config_fails_before_any_run() {
        let config = SimulationConfig { salary_mean: 0.0, ..small_config() };
        let err = run_all(&config, Execution::Parallel).unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConfiguration(ConfigError::NonPositiveSalaryMean(_))
        ));
    }

    #[test]
    fn aborted_run_surfaces_without_dropping_others() {
        let config = small_config();
        let results = (0..config.num_runs)
            .map(|i| {
                let mut sim = Simulation::from_config(&config, RunId(i)).unwrap();
                if i == 3 {
                    sim.mortality.monthly_rate = f64::NAN;
                }
                let seed = sim.seed();
                sim.run()
                    .map(|outcome| outcome.result)
                    .map_err(|error| RunFailure { run: RunId(i), seed, error })
            })
            .collect();

        let table = RunTable::from_results(results);
        assert_eq!(table.rows.len(), 7);
        assert_eq!(table.failures.len(), 1);
        assert_eq!(table.failures[0].run, RunId(3));
        assert!(matches!(table.failures[0].error, SamplingError::NationalDeaths(_)));
        assert!(matches!(
            table.into_rows(),
            Err(SimError::RunAborted { run: RunId(3), .. })
        ));
    }

    #[test]
    fn sink_sees_each_run_once_and_keeps_only_rows() {
        let config = small_config();
        let seen = std::sync::Mutex::new(Vec::new());
        let table = run_with(&config, Execution::Parallel, |outcome| {
            let mut seen = seen.lock().unwrap();
            seen.push((outcome.result.run, outcome.deaths.len() as u64, outcome.months.len()));
        })
        .unwrap();

        let mut seen = seen.into_inner().unwrap();
        seen.sort_by_key(|(run, _, _)| run.0);
        assert_eq!(seen.len(), 8);
        for ((run, deaths, months), row) in seen.iter().zip(&table.rows) {
            assert_eq!(*run, row.run);
            assert_eq!(*deaths, row.death_count);
            assert_eq!(*months, config.horizon_months() as usize);
        }
        assert_eq!(table.rows, run_all(&config, Execution::Sequential).unwrap().rows);
    }

    #[test]
    fn sink_not_called_for_rejected_config() {
        let config = SimulationConfig { simulated_years: 400_000_000, ..small_config() };
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let err = run_with(&config, Execution::Parallel, |_| {
            calls.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        })
        .unwrap_err();
        assert!(matches!(
            err,
            SimError::InvalidConfiguration(ConfigError::HorizonTooLong(400_000_000))
        ));
        assert_eq!(calls.into_inner(), 0);
    }

    #[test]
    fn simulation_rejects_horizon_overflow() {
        let config = SimulationConfig { simulated_years: u32::MAX / 12 + 1, ..small_config() };
        assert!(matches!(
            Simulation::from_config(&config, RunId(0)),
            Err(ConfigError::HorizonTooLong(_))
        ));
    }

    // ── National-scale scenario ──────────────────────────────────────────────

    /// Monthly p ≈ 6.1e-4 over 12 months on 10k beneficiaries: ≈ 73 deaths.
    #[test]
    fn national_scenario_death_count_is_plausible() {
        let config = SimulationConfig {
            simulated_years: 1,
            max_delay_months: 6,
            recipient_count: 10_000,
            salary_mean: 5_000.0,
            salary_std_dev: 2_000.0,
            num_runs: 1,
            monthly_death_rate: 128_717.6,
            total_population: 210e6,
            seed: 42,
        };
        let rows = run_all(&config, Execution::Sequential).unwrap().into_rows().unwrap();
        assert_eq!(rows.len(), 1);
        let r = rows[0];
        assert!((30..=130).contains(&r.death_count), "death_count {} implausible", r.death_count);
        assert!(r.accumulated_loss > 0.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn run_results_respect_bounds(
            recipients in 0u64..200,
            years in 1u32..=3,
            max_delay in 1u32..=12,
            rate in 0.0f64..200.0,
            seed in any::<u64>(),
        ) {
            let config = SimulationConfig {
                simulated_years: years,
                max_delay_months: max_delay,
                recipient_count: recipients,
                num_runs: 3,
                monthly_death_rate: rate,
                total_population: 1_000.0,
                seed,
                ..small_config()
            };
            let table = run_all(&config, Execution::Sequential).unwrap();
            prop_assert_eq!(table.rows.len(), 3);
            for r in &table.rows {
                prop_assert!(r.death_count <= recipients);
                prop_assert!(r.accumulated_loss >= 0.0);
            }
        }
    }
}
