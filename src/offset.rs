//! The trimmed-mean offset estimator (§4.D): turns the last 59 pulses'
//! sub-second timing jitter into a single microsecond correction, used in
//! place of the raw minute-marker timestamp whenever a full minute of
//! history is available.

use crate::time::Timestamp;
use thiserror::Error;

/// Exactly this many of the most recent pulses are required to produce
/// an estimate.
pub const SAMPLE_COUNT: usize = 59;

/// Samples are rejected if the signed microsecond deviation they reduce
/// to is larger in magnitude than this.
const MAX_DEVIATION_USEC: i32 = 128_000;

/// Indices `[TRIM_LOW, TRIM_HIGH)` of the sorted sample array are
/// averaged; 30 of the middle samples, trimmed asymmetrically.
const TRIM_LOW: usize = 15;
const TRIM_HIGH: usize = 45;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OffsetError {
    /// Fewer than [`SAMPLE_COUNT`] pulse timestamps are available.
    #[error("fewer than {SAMPLE_COUNT} pulse timestamps available")]
    InsufficientSamples,
    /// At least one of the 59 samples deviates by more than
    /// [`MAX_DEVIATION_USEC`] from the nearest whole second.
    #[error("a pulse timing sample deviates by more than {MAX_DEVIATION_USEC}us")]
    ExcessiveDeviation,
}

/// Reduce a timestamp's microsecond-of-second field to a signed
/// deviation from the nearest whole second, in `-500_000..=500_000`.
fn signed_deviation(t: &Timestamp) -> i32 {
    if t.usec > 500_000 {
        t.usec - 1_000_000
    } else {
        t.usec
    }
}

/// Estimate the mean sub-second offset from the most recent 59 pulses.
/// `samples` must contain at least [`SAMPLE_COUNT`] timestamps, oldest
/// first; only the trailing `SAMPLE_COUNT` are used.
pub fn estimate(samples: &[Timestamp]) -> Result<i32, OffsetError> {
    if samples.len() < SAMPLE_COUNT {
        return Err(OffsetError::InsufficientSamples);
    }
    let window = &samples[samples.len() - SAMPLE_COUNT..];

    let mut deviations = Vec::with_capacity(SAMPLE_COUNT);
    for t in window {
        let d = signed_deviation(t);
        if d.abs() > MAX_DEVIATION_USEC {
            return Err(OffsetError::ExcessiveDeviation);
        }
        deviations.push(d);
    }

    deviations.sort_unstable();

    let trimmed = &deviations[TRIM_LOW..TRIM_HIGH];
    let sum: i64 = trimmed.iter().map(|&d| d as i64).sum();
    Ok((sum / trimmed.len() as i64) as i32)
}
