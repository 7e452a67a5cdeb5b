use std::io::{self, Write};

use serde::{Deserialize, Serialize};

use crate::types::{BeneficiaryId, Month};

/// A beneficiary removed from the payroll by death. Produced once by the
/// mortality sampler and consumed once by the loss accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeathEvent {
    pub beneficiary: BeneficiaryId,
    pub month: Month,
    /// Monthly salary still being paid at the time of death.
    pub salary: f64,
}

/// Write `records` as NDJSON: one compact JSON object per line.
pub fn write_ndjson<W: Write, T: Serialize>(writer: &mut W, records: &[T]) -> io::Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writeln!(writer)?;
    }
    writer.flush()
}
