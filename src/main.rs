use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, bail};
use clap::Parser;

use lateloss::analysis;
use lateloss::config::SimulationConfig;
use lateloss::events::write_ndjson;
use lateloss::simulation::{self, Execution, RunOutcome, RunTable};

/// Monte Carlo estimate of the loss caused by late reporting of payroll
/// beneficiaries' deaths.
#[derive(Parser, Debug)]
#[command(name = "lateloss", version, about, long_about = None)]
struct Cli {
    /// JSON configuration file; flags below override its fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Simulated time in years
    #[arg(long)]
    years: Option<u32>,

    /// Maximum billable delay between a death and its reporting, in months
    #[arg(long)]
    max_delay: Option<u32>,

    /// Number of beneficiaries on the payroll
    #[arg(long)]
    recipients: Option<u64>,

    /// Mean monthly salary
    #[arg(long)]
    salary_mean: Option<f64>,

    /// Standard deviation of the monthly salary
    #[arg(long)]
    salary_std_dev: Option<f64>,

    /// Number of independent runs
    #[arg(long)]
    runs: Option<u64>,

    /// Average national deaths per month
    #[arg(long)]
    death_rate: Option<f64>,

    /// National population
    #[arg(long)]
    population: Option<f64>,

    /// Base seed; run i uses seed + i
    #[arg(long)]
    seed: Option<u64>,

    /// Write the run table to this CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Write each run's death events and month trace as NDJSON into this
    /// directory (`deaths_seed_{seed}.ndjson`, `months_seed_{seed}.ndjson`)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Execute runs one after another instead of on the thread pool
    #[arg(long, default_value_t = false)]
    sequential: bool,

    /// Suppress the summary on stdout
    #[arg(short, long, default_value_t = false)]
    quiet: bool,
}

impl Cli {
    fn to_config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_json_file(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?,
            None => SimulationConfig::canonical(),
        };
        if let Some(v) = self.years {
            config.simulated_years = v;
        }
        if let Some(v) = self.max_delay {
            config.max_delay_months = v;
        }
        if let Some(v) = self.recipients {
            config.recipient_count = v;
        }
        if let Some(v) = self.salary_mean {
            config.salary_mean = v;
        }
        if let Some(v) = self.salary_std_dev {
            config.salary_std_dev = v;
        }
        if let Some(v) = self.runs {
            config.num_runs = v;
        }
        if let Some(v) = self.death_rate {
            config.monthly_death_rate = v;
        }
        if let Some(v) = self.population {
            config.total_population = v;
        }
        if let Some(v) = self.seed {
            config.seed = v;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = cli.to_config()?;
    let execution = if cli.sequential { Execution::Sequential } else { Execution::Parallel };

    if let Some(dir) = &cli.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
    }
    let write_errors: Mutex<Vec<anyhow::Error>> = Mutex::new(Vec::new());
    let table = simulation::run_with(&config, execution, |outcome| {
        let Some(dir) = &cli.output_dir else { return };
        if let Err(e) = write_run_streams(outcome, dir) {
            log::error!("run {}: {e:#}", outcome.result.run.0);
            if let Ok(mut errors) = write_errors.lock() {
                errors.push(e);
            }
        }
    })?;
    if let Some(e) = write_errors.into_inner().ok().and_then(|errors| errors.into_iter().next()) {
        return Err(e);
    }

    if let Some(path) = &cli.csv {
        write_runs_csv(&table, path)?;
        log::info!("wrote {} rows to {}", table.rows.len(), path.display());
    }

    if !cli.quiet {
        match analysis::summarise(&table.rows) {
            Some(summary) => println!("{summary}"),
            None => println!("No completed runs."),
        }
    }

    if !table.is_complete() {
        bail!("{} of {} runs aborted", table.failures.len(), config.num_runs);
    }
    Ok(())
}

fn write_run_streams(outcome: &RunOutcome, dir: &Path) -> anyhow::Result<()> {
    let seed = outcome.result.seed;
    let deaths = dir.join(format!("deaths_seed_{seed}.ndjson"));
    write_ndjson_file(&deaths, &outcome.deaths)?;
    let months = dir.join(format!("months_seed_{seed}.ndjson"));
    write_ndjson_file(&months, &outcome.months)?;
    log::debug!("seed {seed}: {} death events -> {}", outcome.deaths.len(), deaths.display());
    Ok(())
}

fn write_ndjson_file<T: serde::Serialize>(path: &Path, records: &[T]) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_ndjson(&mut BufWriter::new(file), records)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn write_runs_csv(table: &RunTable, path: &Path) -> anyhow::Result<()> {
    let mut w = csv::Writer::from_path(path).with_context(|| format!("failed to create {}", path.display()))?;
    for row in &table.rows {
        w.serialize(row)?;
    }
    w.flush()?;
    Ok(())
}
