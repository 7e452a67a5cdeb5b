use rand::Rng;
use rand_distr::{Distribution, LogNormal};

use crate::error::{ConfigError, SamplingError};
use crate::types::BeneficiaryId;

/// Log-normal salary model; ln-space params.
/// E[X] = exp(mu + sigma²/2), matched to the configured arithmetic mean.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SalaryModel {
    pub mu: f64,
    pub sigma: f64,
}

impl SalaryModel {
    /// Moment-match an arithmetic mean and standard deviation:
    /// sigma² = ln(1 + (sd/mean)²), mu = ln(mean) − sigma²/2.
    pub fn from_moments(mean: f64, std_dev: f64) -> Result<Self, ConfigError> {
        if !(mean > 0.0 && mean.is_finite()) {
            return Err(ConfigError::NonPositiveSalaryMean(mean));
        }
        if !(std_dev >= 0.0 && std_dev.is_finite()) {
            return Err(ConfigError::NegativeSalaryStdDev(std_dev));
        }
        let cv = std_dev / mean;
        let sigma = (1.0 + cv * cv).ln().sqrt();
        let mu = mean.ln() - sigma * sigma / 2.0;
        Ok(SalaryModel { mu, sigma })
    }

    pub fn mean(&self) -> f64 {
        (self.mu + self.sigma * self.sigma / 2.0).exp()
    }

    pub fn distribution(&self) -> Result<LogNormal<f64>, SamplingError> {
        Ok(LogNormal::new(self.mu, self.sigma)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beneficiary {
    pub id: BeneficiaryId,
    /// Monthly payment, drawn once at run start.
    pub salary: f64,
}

/// Beneficiaries still on the payroll in one run.
///
/// Order is the initialization order and is preserved by removals, so
/// position `i` always holds the `i`-th surviving beneficiary by id.
#[derive(Debug, Clone)]
pub struct Cohort {
    beneficiaries: Vec<Beneficiary>,
    initial_size: u64,
}

impl Cohort {
    /// Draw `recipient_count` independent salaries from `model`.
    pub fn initialise(
        recipient_count: u64,
        model: &SalaryModel,
        rng: &mut impl Rng,
    ) -> Result<Self, SamplingError> {
        let dist = model.distribution()?;
        let beneficiaries = (0..recipient_count)
            .map(|i| Beneficiary { id: BeneficiaryId(i), salary: dist.sample(rng) })
            .collect();
        Ok(Cohort { beneficiaries, initial_size: recipient_count })
    }

    pub fn len(&self) -> usize {
        self.beneficiaries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beneficiaries.is_empty()
    }

    pub fn initial_size(&self) -> u64 {
        self.initial_size
    }

    /// Beneficiaries removed since initialization.
    pub fn removed_count(&self) -> u64 {
        self.initial_size - self.beneficiaries.len() as u64
    }

    pub fn beneficiaries(&self) -> &[Beneficiary] {
        &self.beneficiaries
    }

    /// Remove every beneficiary whose position is flagged in `flags`, where
    /// `flags` was computed against the cohort as it is now. Returns the
    /// removed beneficiaries in cohort order.
    pub fn remove_flagged(&mut self, flags: &[bool]) -> Vec<Beneficiary> {
        debug_assert_eq!(flags.len(), self.beneficiaries.len());
        let mut removed = Vec::new();
        let mut flags = flags.iter();
        // retain visits each element exactly once, in order.
        self.beneficiaries.retain(|b| {
            let dead = flags.next().copied().unwrap_or(false);
            if dead {
                removed.push(*b);
            }
            !dead
        });
        removed
    }
}
