//! Cross-run statistics over the output table.
//!
//! These are the figures the reporting layer presents; formatting (currency,
//! locale) and plotting are left to it.

use std::fmt;

use crate::loss::RunResult;

/// Distribution statistics for a continuous metric across N runs.
#[derive(Debug, Clone, PartialEq)]
pub struct DistStats {
    pub n: usize,
    pub min: f64,
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub max: f64,
    pub mean: f64,
    /// Sample standard deviation (n − 1 denominator).
    pub std_dev: f64,
    /// Bias-corrected sample excess kurtosis. `None` below four values.
    pub kurtosis: Option<f64>,
}

impl DistStats {
    pub fn iqr(&self) -> f64 {
        self.p75 - self.p25
    }
}

/// Distribution statistics for an integer count metric.
#[derive(Debug, Clone, PartialEq)]
pub struct CountDist {
    pub n: usize,
    pub min: u64,
    /// Interpolated, so may fall halfway between two counts.
    pub p50: f64,
    pub max: u64,
    pub mean: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub accumulated_loss: DistStats,
    pub death_count: CountDist,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let l = &self.accumulated_loss;
        let d = &self.death_count;
        writeln!(f, "=== Accumulated loss (N={} runs) ===", l.n)?;
        writeln!(
            f,
            "{:>14} | {:>14} | {:>14} | {:>14} | {:>14} | {:>14} | {:>14}",
            "min", "p25", "p50", "p75", "max", "mean", "stddev"
        )?;
        writeln!(
            f,
            "{:>14.2} | {:>14.2} | {:>14.2} | {:>14.2} | {:>14.2} | {:>14.2} | {:>14.2}",
            l.min, l.p25, l.p50, l.p75, l.max, l.mean, l.std_dev
        )?;
        writeln!(f, "  IQR:             {:.2}", l.iqr())?;
        match l.kurtosis {
            Some(k) => writeln!(f, "  Excess kurtosis: {k:.4}")?,
            None => writeln!(f, "  Excess kurtosis: n/a (< 4 runs)")?,
        }
        writeln!(f, "\n=== Deaths per run ===")?;
        write!(f, "  min {} | p50 {:.1} | max {} | mean {:.2}", d.min, d.p50, d.max, d.mean)
    }
}

/// Linear interpolation between closest ranks on sorted `values`.
fn quantile(values: &[f64], p: f64) -> f64 {
    let n = values.len();
    let h = p * (n - 1) as f64;
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    values[lo] * (1.0 - frac) + values[hi] * frac
}

fn excess_kurtosis(values: &[f64], mean: f64) -> Option<f64> {
    let n = values.len();
    if n < 4 {
        return None;
    }
    let m2: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    if m2 == 0.0 {
        return Some(0.0);
    }
    let m4: f64 = values.iter().map(|x| (x - mean).powi(4)).sum();
    let n = n as f64;
    let numer = n * (n + 1.0) * (n - 1.0) * m4;
    let denom = (n - 2.0) * (n - 3.0) * m2 * m2;
    let adj = 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    Some(numer / denom - adj)
}

pub fn dist_stats(values: &mut [f64]) -> Option<DistStats> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();

    let mean = values.iter().sum::<f64>() / n as f64;
    let variance = if n > 1 {
        values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1) as f64
    } else {
        0.0
    };

    Some(DistStats {
        n,
        min: values[0],
        p5: quantile(values, 0.05),
        p25: quantile(values, 0.25),
        p50: quantile(values, 0.50),
        p75: quantile(values, 0.75),
        p95: quantile(values, 0.95),
        max: values[n - 1],
        mean,
        std_dev: variance.sqrt(),
        kurtosis: excess_kurtosis(values, mean),
    })
}

pub fn count_dist(values: &mut [u64]) -> Option<CountDist> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable();
    let n = values.len();
    let mean = values.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let as_f64: Vec<f64> = values.iter().map(|&x| x as f64).collect();

    Some(CountDist { n, min: values[0], p50: quantile(&as_f64, 0.5), max: values[n - 1], mean })
}

/// Summarise a run table. `None` for an empty table.
pub fn summarise(rows: &[RunResult]) -> Option<RunSummary> {
    let mut losses: Vec<f64> = rows.iter().map(|r| r.accumulated_loss).collect();
    let mut deaths: Vec<u64> = rows.iter().map(|r| r.death_count).collect();
    Some(RunSummary {
        accumulated_loss: dist_stats(&mut losses)?,
        death_count: count_dist(&mut deaths)?,
    })
}
