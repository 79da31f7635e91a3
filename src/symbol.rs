//! The pulse alphabet shared by every decoder, and the duration bands used
//! to classify a low/high interval into one of its symbols.

/// One classified pulse, as observed on a single modem-status line.
///
/// Station identity is never encoded in the symbol itself: DCF77, MSF and
/// WWVB streams share this alphabet and are told apart only by which
/// minute-marker condition fires (see [`crate::classifier`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PulseSymbol {
    /// Short zero: 60-149ms low.
    ShortZero = 0,
    /// Short one: 160-249ms low.
    ShortOne = 1,
    /// MSF bit-A+B: 260-349ms low.
    MsfAB = 2,
    /// MSF bit-B flag, retrofitted onto the previous slot on a short high.
    MsfBFlag = 3,
    /// WWVB "1" / MSF marker: 460-549ms low.
    LongFour = 4,
    /// WWVB marker / DCF77 long: 760-849ms low.
    LongFive = 5,
}

impl PulseSymbol {
    /// The raw numeric code used in frame layouts and logs.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Classify a low-duration interval (in milliseconds) into a symbol.
    /// Returns `None` if the duration falls outside every known band,
    /// which the caller treats as a hard reset condition.
    pub fn from_low_duration_ms(ms: i64) -> Option<PulseSymbol> {
        match ms {
            60..=149 => Some(PulseSymbol::ShortZero),
            160..=249 => Some(PulseSymbol::ShortOne),
            260..=349 => Some(PulseSymbol::MsfAB),
            460..=549 => Some(PulseSymbol::LongFour),
            760..=849 => Some(PulseSymbol::LongFive),
            _ => None,
        }
    }
}

/// Duration band (in milliseconds) used for the MSF bit-B retrofit check on
/// a high interval, and for the DCF77 missing-second-mark check.
pub mod bands {
    use std::ops::RangeInclusive;

    /// High-duration band (ms) that marks an MSF bit-B extension.
    pub const MSF_BIT_B_HIGH_MS: RangeInclusive<i64> = 60..=150;

    /// High-duration band (ms) for the DCF77 missing-second-mark minute
    /// marker.
    pub const DCF77_MARKER_HIGH_MS: RangeInclusive<i64> = 1_760..=1_950;
}

/// Logical level of a modem-status line after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Level {
    Low,
    High,
}
