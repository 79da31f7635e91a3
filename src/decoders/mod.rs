//! Frame decoders (§4.C): validate parity/framing on the buffered symbol
//! sequence ending at `count - 1` and decode the calendar fields into a
//! UTC instant.

mod dcf77;
mod msf;
mod wwvb;

use crate::channel::Channel;
use crate::classifier::StationKind;
use crate::symbol::PulseSymbol;
use thiserror::Error;

/// A successfully decoded minute frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedTime {
    /// Seconds since the Unix epoch, UTC.
    pub utc_seconds: i64,
}

/// Why a frame failed to decode. All variants are "frame-corruption" in
/// the taxonomy of §7: the channel is reset and no sample is published,
/// but nothing is logged above `debug`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer is shorter than the frame layout requires, or an
    /// unexpected symbol appeared where only a data bit was expected.
    #[error("frame too short or malformed for this station's layout")]
    Framing,
    /// A parity check failed.
    #[error("parity check failed")]
    Parity,
    /// The decoded civil-time fields are out of range, or do not compose
    /// into a valid calendar instant.
    #[error("decoded civil time is not sane")]
    Sanity,
}

/// Decode the frame currently buffered in `channel`, dispatching on which
/// minute-marker condition fired.
pub fn decode(channel: &Channel, station: StationKind) -> Result<DecodedTime, DecodeError> {
    match station {
        StationKind::Dcf77 => dcf77::decode(channel),
        StationKind::Msf => msf::decode(channel),
        StationKind::Wwvb => wwvb::decode(channel),
    }
}

/// DCF77's bit convention: 1 if the symbol is a short one, 0 for
/// anything else (including a stray marker symbol landing inside the
/// covered span) — there is no error case.
pub(crate) fn loose_bit(symbol: PulseSymbol) -> u32 {
    if symbol == PulseSymbol::ShortOne {
        1
    } else {
        0
    }
}

/// MSF's bit convention: 1 iff the symbol is exactly a short one, 0 iff
/// exactly a short zero, and a framing error for anything else. Unlike
/// DCF77, MSF treats an unexpected symbol inside the covered span as
/// frame corruption rather than silently reading it as a zero bit.
pub(crate) fn short_bit(symbol: PulseSymbol) -> Result<u32, DecodeError> {
    match symbol {
        PulseSymbol::ShortZero => Ok(0),
        PulseSymbol::ShortOne => Ok(1),
        _ => Err(DecodeError::Framing),
    }
}

/// Extract one BCD segment of `width` symbols starting at `*cursor`,
/// advancing the cursor past it. `msb_first` selects DCF77's LSB-first
/// packing (`false`) or MSF's MSB-first packing (`true`). `bit` is the
/// station's bit-extraction convention (`loose_bit` or `short_bit`).
pub(crate) fn extract_segment(
    channel: &Channel,
    cursor: &mut usize,
    width: usize,
    msb_first: bool,
    bit: impl Fn(PulseSymbol) -> Result<u32, DecodeError>,
) -> Result<u32, DecodeError> {
    let mut sum = 0u32;
    for j in 0..width {
        let symbol = channel.symbol_at(*cursor).ok_or(DecodeError::Framing)?;
        let b = bit(symbol)?;
        let shift = if msb_first { width - j - 1 } else { j };
        sum |= b << shift;
        *cursor += 1;
    }
    Ok(sum)
}
