//! Summarise a run table written by `lateloss --csv`.
//!
//! Prints the loss and death-count distribution across runs.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use lateloss::analysis;
use lateloss::loss::RunResult;

#[derive(Parser, Debug)]
#[command(name = "summarise", about = "Summarise a lateloss run table", long_about = None)]
struct Args {
    /// Run table CSV written by `lateloss --csv`
    #[arg(default_value = "runs.csv")]
    path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let path = args.path.display();

    let mut reader = csv::Reader::from_path(&args.path)
        .with_context(|| format!("cannot open {path}; run `lateloss --csv {path}` first"))?;

    let mut rows: Vec<RunResult> = Vec::new();
    for (line_no, record) in reader.deserialize().enumerate() {
        let row: RunResult =
            record.with_context(|| format!("failed to deserialize row {}", line_no + 1))?;
        rows.push(row);
    }
    log::info!("loaded {} runs from {path}", rows.len());

    match analysis::summarise(&rows) {
        Some(summary) => println!("{summary}"),
        None => println!("{path} contains no runs."),
    }
    Ok(())
}
