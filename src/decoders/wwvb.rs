//! WWVB frame decoding (§4.C).
//!
//! Unlike DCF77/MSF, WWVB carries no parity; instead every one of the 58
//! symbols at `count - 60 .. count - 3` is framing-checked: every tenth
//! position must be the `LongFive` frame marker, every other position
//! must be `ShortOne` or `LongFour` (the station's 0/1 data pulses). The
//! leading 53 of those 58 symbols, starting at `count - 60`, are then
//! read as 17 BCD segments (MSB-first, a `LongFour` symbol is a `1` bit,
//! anything else is `0`) encoding day-of-year rather than month/day
//! directly; day-of-year is converted to a calendar date via a cumulative
//! days-per-month table, adjusted for the leap-year flag at `count - 6`.
//! WWVB transmits the timestamp for the minute that has just elapsed, so
//! the decoded instant is advanced by 60 seconds.

use super::{DecodeError, DecodedTime};
use crate::calendar::{utc_time, CivilTime};
use crate::channel::Channel;
use crate::symbol::PulseSymbol;

const FRAMING_SPAN_START_OFFSET: usize = 60;
const FRAMING_SPAN_END_OFFSET: usize = 3;
const SEGMENT_WIDTHS: [usize; 17] = [3, 1, 4, 3, 2, 1, 4, 3, 2, 1, 4, 1, 4, 11, 4, 1, 4];
const SEGMENT_START_OFFSET: usize = 60;
const LEAP_FLAG_OFFSET: usize = 6;
const MONTH_CUMULATIVE_DAYS: [u32; 12] = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];

fn bit_value(symbol: PulseSymbol) -> u32 {
    if symbol == PulseSymbol::LongFour {
        1
    } else {
        0
    }
}

pub(crate) fn decode(channel: &Channel) -> Result<DecodedTime, DecodeError> {
    let length = channel.count;
    let frame_start = length
        .checked_sub(FRAMING_SPAN_START_OFFSET)
        .ok_or(DecodeError::Framing)?;
    let frame_end = length
        .checked_sub(FRAMING_SPAN_END_OFFSET)
        .ok_or(DecodeError::Framing)?;

    for pos in frame_start..=frame_end {
        let i = length - pos - 1;
        let symbol = channel.symbol_at(pos).ok_or(DecodeError::Framing)?;
        let k = (i - 1) % 10;
        if k == 0 {
            if symbol != PulseSymbol::LongFive {
                return Err(DecodeError::Framing);
            }
        } else if symbol != PulseSymbol::ShortOne && symbol != PulseSymbol::LongFour {
            return Err(DecodeError::Framing);
        }
    }

    let mut cursor = length
        .checked_sub(SEGMENT_START_OFFSET)
        .ok_or(DecodeError::Framing)?;
    let mut seg = [0u32; 17];
    for (idx, &width) in SEGMENT_WIDTHS.iter().enumerate() {
        let mut sum = 0u32;
        for j in 0..width {
            let symbol = channel.symbol_at(cursor).ok_or(DecodeError::Framing)?;
            sum |= bit_value(symbol) << (width - j - 1);
            cursor += 1;
        }
        seg[idx] = sum;
    }

    let year = 2000 + seg[16] + 10 * seg[14];
    let yday = seg[12] + 10 * seg[10] + 100 * seg[8];
    if yday == 0 {
        return Err(DecodeError::Sanity);
    }
    let yday0 = yday - 1;
    let hour = seg[6] + 10 * seg[4];
    let minute = seg[2] + 10 * seg[0];

    if minute > 59 || hour > 23 || yday0 > 365 {
        return Err(DecodeError::Sanity);
    }

    let leap_index = length
        .checked_sub(LEAP_FLAG_OFFSET)
        .ok_or(DecodeError::Framing)?;
    let is_leap = channel.symbol_at(leap_index).ok_or(DecodeError::Framing)? == PulseSymbol::LongFour;

    let mut found = None;
    for i in (0..12).rev() {
        if MONTH_CUMULATIVE_DAYS[i] <= yday0 {
            found = Some((i as u32, 1 + yday0 - MONTH_CUMULATIVE_DAYS[i]));
            break;
        }
    }
    let (mut month, mut day) = found.ok_or(DecodeError::Sanity)?;

    if is_leap {
        if yday0 > 59 {
            day = day.checked_sub(1).ok_or(DecodeError::Sanity)?;
        } else if yday0 == 59 {
            month = 1;
            day = 29;
        }
    }

    let civil = CivilTime {
        year: year as i32,
        month: month + 1,
        day,
        hour,
        minute,
        second: 0,
    };
    let utc = utc_time(civil).map_err(|_| DecodeError::Sanity)?;

    Ok(DecodedTime {
        utc_seconds: utc + 60,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LineName;
    use crate::symbol::PulseSymbol::{LongFive, LongFour, ShortOne};
    use crate::time::Timestamp;

    const FRAME_LEN: usize = 60;

    /// Fill the whole buffer with the "all zero data bit" pattern
    /// (`ShortOne`) and stamp in the five frame markers. A fully-zero
    /// frame is exactly what day-of-year 59 (with the leap flag set)
    /// needs, aside from the `seg10` digit encoding the tens-of-days
    /// field.
    fn leap_day_frame() -> Channel {
        let mut c = Channel::new(LineName::Dcd, 0);
        for i in 1..=FRAME_LEN {
            c.set_symbol(i, ShortOne, Timestamp::new(i as i64, 0));
        }
        c.count = FRAME_LEN + 1;
        let length = c.count;

        for &marker_offset in &[12usize, 22, 32, 42, 52] {
            let pos = length - marker_offset;
            c.set_symbol(pos, LongFive, Timestamp::new(pos as i64, 0));
        }

        // seg10 (positions 25-28, MSB-first) encodes the value 6, giving
        // yday = seg12 + 10*seg10 + 100*seg8 = 60 (yday0 = 59).
        let bits = [0u32, 1, 1, 0];
        for (j, &bit) in bits.iter().enumerate() {
            let pos = 25 + j;
            let symbol = if bit == 1 { LongFour } else { ShortOne };
            c.set_symbol(pos, symbol, Timestamp::new(pos as i64, 0));
        }

        // leap-year flag at count - 6.
        let leap_index = length - LEAP_FLAG_OFFSET;
        c.set_symbol(leap_index, LongFour, Timestamp::new(0, 0));

        c
    }

    #[test]
    fn decodes_leap_day_as_february_29() {
        let c = leap_day_frame();
        let decoded = decode(&c).expect("frame should decode");
        // 2000-02-29T00:01:00 UTC (the +60s minute-just-gone adjustment
        // applied to 2000-02-29T00:00:00 UTC).
        assert_eq!(decoded.utc_seconds, 951_782_460);
    }

    #[test]
    fn rejects_frame_with_displaced_marker() {
        let mut c = leap_day_frame();
        let length = c.count;
        let pos = length - 12;
        c.set_symbol(pos, ShortOne, Timestamp::new(0, 0));
        assert_eq!(decode(&c), Err(DecodeError::Framing));
    }

    #[test]
    fn rejects_short_buffer() {
        let mut c = Channel::new(LineName::Dcd, 0);
        c.set_symbol(1, ShortOne, Timestamp::new(0, 0));
        c.count = 2;
        assert_eq!(decode(&c), Err(DecodeError::Framing));
    }
}
