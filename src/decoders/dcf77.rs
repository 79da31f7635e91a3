//! DCF77 frame decoding (§4.C).
//!
//! Frame length is `count`; 13 BCD segments of widths
//! `[4,3,1,4,2,1,4,2,3,4,1,4,4]` start at `count - 38`, LSB-first within
//! each segment. Three even-parity groups of widths `[8,7,23]` cover the
//! same span. The CEST/CET flag sits four symbols before the segment
//! start (`count - 42`) — ahead of the start-of-time marker — per §9.
//!
//! Each bit is 1 if the symbol is a short one, else 0 — a stray marker
//! symbol inside the covered span reads as a data zero rather than
//! failing the frame.

use super::{extract_segment, loose_bit, DecodeError, DecodedTime};
use crate::calendar::{utc_time, CivilTime};
use crate::channel::Channel;

const PARITY_WIDTHS: [usize; 3] = [8, 7, 23];
const SEGMENT_WIDTHS: [usize; 13] = [4, 3, 1, 4, 2, 1, 4, 2, 3, 4, 1, 4, 4];
const SEGMENT_START_OFFSET: usize = 38;
const DST_FLAG_OFFSET: usize = 42;

pub(crate) fn decode(channel: &Channel) -> Result<DecodedTime, DecodeError> {
    let length = channel.count;
    let start = length
        .checked_sub(SEGMENT_START_OFFSET)
        .ok_or(DecodeError::Framing)?;

    let mut cursor = start;
    for &width in &PARITY_WIDTHS {
        let mut sum = 0u32;
        for _ in 0..width {
            let symbol = channel.symbol_at(cursor).ok_or(DecodeError::Framing)?;
            sum += loose_bit(symbol);
            cursor += 1;
        }
        if sum % 2 != 0 {
            return Err(DecodeError::Parity);
        }
    }

    let mut cursor = start;
    let mut seg = [0u32; 13];
    for (i, &width) in SEGMENT_WIDTHS.iter().enumerate() {
        seg[i] = extract_segment(channel, &mut cursor, width, false, |s| Ok(loose_bit(s)))?;
    }

    let year = 2000 + seg[11] + 10 * seg[12];
    let month = seg[9] + 10 * seg[10];
    let day = seg[6] + 10 * seg[7];
    let hour = seg[3] + 10 * seg[4];
    let minute = seg[0] + 10 * seg[1];

    if minute > 59 || hour > 23 || day == 0 || day > 31 || month == 0 || month > 12 {
        return Err(DecodeError::Sanity);
    }

    let civil = CivilTime {
        year: year as i32,
        month,
        day,
        hour,
        minute,
        second: 0,
    };
    let utc = utc_time(civil).map_err(|_| DecodeError::Sanity)?;

    let dst_index = length
        .checked_sub(DST_FLAG_OFFSET)
        .ok_or(DecodeError::Framing)?;
    let cest = channel.symbol_at(dst_index).ok_or(DecodeError::Framing)? == crate::symbol::PulseSymbol::ShortOne;
    let offset = if cest { 7_200 } else { 3_600 };

    Ok(DecodedTime {
        utc_seconds: utc - offset,
    })
}
