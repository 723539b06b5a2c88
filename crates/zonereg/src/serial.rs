//! Date-encoded SOA serial numbers (`YYYYMMDDNN`).

use chrono::{Datelike, NaiveDate};
use zonereg_core::{RegistryError, Result};

/// Highest daily sequence number.
pub const MAX_SEQUENCE: u64 = 99;

/// `YYYYMMDD` of `date` as an integer.
fn date_part(date: NaiveDate) -> u64 {
    // Years before 0 are not representable in a serial; clamp to zero.
    let year = u64::try_from(date.year()).unwrap_or(0);
    year * 10_000 + u64::from(date.month()) * 100 + u64::from(date.day())
}

/// Next serial after `previous` on `today`.
///
/// A new day starts over at `NN = 01`. The same day, or a previous serial
/// dated in the future, advances the sequence so the serial never regresses.
pub fn create_serial(previous: Option<u64>, today: NaiveDate) -> Result<u64> {
    let today = date_part(today);
    let Some(previous) = previous else {
        return Ok(today * 100 + 1);
    };

    if previous / 100 < today {
        return Ok(today * 100 + 1);
    }

    if previous % 100 >= MAX_SEQUENCE {
        tracing::warn!(serial = previous, "daily serial sequence exhausted");
        return Err(RegistryError::SerialExhausted { previous });
    }
    Ok(previous + 1)
}
