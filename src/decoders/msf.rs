//! MSF frame decoding (§4.C).
//!
//! Frame length is `count`; 11 BCD segments of widths
//! `[4,4,1,4,2,4,3,2,4,3,4]` start at `count - 44`, MSB-first within each
//! segment. Four odd-parity groups of widths `[8,11,3,13]` cover the same
//! 35-symbol span, each seeded by an extra bit at `count - 7 + i` (`i` the
//! 0-based group index) that counts into the checksum when it reads as the
//! bit-A/B marker symbol.
//!
//! Unlike the source this was distilled from, an unexpected symbol inside
//! the covered span is treated as frame corruption rather than silently
//! read as a zero bit.

use super::{extract_segment, short_bit, DecodeError, DecodedTime};
use crate::calendar::{utc_time, CivilTime};
use crate::channel::Channel;
use crate::symbol::PulseSymbol;

const PARITY_WIDTHS: [usize; 4] = [8, 11, 3, 13];
const SEGMENT_WIDTHS: [usize; 11] = [4, 4, 1, 4, 2, 4, 3, 2, 4, 3, 4];
const SEGMENT_START_OFFSET: usize = 44;
const DST_FLAG_OFFSET: usize = 3;

pub(crate) fn decode(channel: &Channel) -> Result<DecodedTime, DecodeError> {
    let length = channel.count;
    let start = length
        .checked_sub(SEGMENT_START_OFFSET)
        .ok_or(DecodeError::Framing)?;

    let mut cursor = start;
    for (g, &width) in PARITY_WIDTHS.iter().enumerate() {
        let seed_index = length - 7 + g;
        let seed_symbol = channel.symbol_at(seed_index).ok_or(DecodeError::Framing)?;
        let mut sum = if seed_symbol == PulseSymbol::MsfAB { 1 } else { 0 };
        for _ in 0..width {
            let symbol = channel.symbol_at(cursor).ok_or(DecodeError::Framing)?;
            sum += short_bit(symbol)?;
            cursor += 1;
        }
        if sum % 2 == 0 {
            return Err(DecodeError::Parity);
        }
    }

    let mut cursor = start;
    let mut seg = [0u32; 11];
    for (i, &width) in SEGMENT_WIDTHS.iter().enumerate() {
        seg[i] = extract_segment(channel, &mut cursor, width, true, short_bit)?;
    }

    let year = 2000 + 10 * seg[0] + seg[1];
    let month = seg[2] * 10 + seg[3];
    let day = seg[4] * 10 + seg[5];
    let hour = seg[7] * 10 + seg[8];
    let minute = seg[9] * 10 + seg[10];

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
    let bst = channel.symbol_at(dst_index).ok_or(DecodeError::Framing)? == PulseSymbol::MsfAB;
    let offset = if bst { 3_600 } else { 0 };

    Ok(DecodedTime {
        utc_seconds: utc - offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LineName;
    use crate::symbol::PulseSymbol::{MsfAB, ShortOne, ShortZero};
    use crate::time::Timestamp;

    const FRAME_LEN: usize = 44;
    const CAL_BASE: usize = FRAME_LEN + 1 - 44;

    fn blank_channel() -> Channel {
        let mut c = Channel::new(LineName::Dcd, 0);
        for i in 1..=FRAME_LEN {
            c.set_symbol(i, ShortZero, Timestamp::new(i as i64, 0));
        }
        c.count = FRAME_LEN + 1;
        c
    }

    fn put_msb(c: &mut Channel, base: usize, value: u32, width: usize) {
        for j in 0..width {
            let shift = width - j - 1;
            let bit = (value >> shift) & 1;
            let symbol = if bit == 1 { ShortOne } else { ShortZero };
            c.set_symbol(base + j, symbol, Timestamp::new((base + j) as i64, 0));
        }
    }

    fn sum_bits(c: &Channel, base: usize, width: usize) -> u32 {
        (0..width)
            .map(|j| short_bit(c.symbol_at(base + j).unwrap()).unwrap())
            .sum()
    }

    /// Seat the seed bit for group `g` (0-based) at `length - 7 + g` and
    /// write the group's data bits so seed + data sums to odd.
    fn seed_and_balance(c: &mut Channel, length: usize, g: usize, group_start: usize, width: usize) {
        let seed_index = length - 7 + g;
        c.set_symbol(seed_index, MsfAB, Timestamp::new(seed_index as i64, 0));
        let sum = 1 + sum_bits(c, group_start, width);
        if sum % 2 == 0 {
            let last = group_start + width - 1;
            let flipped = match c.symbol_at(last) {
                Some(ShortOne) => ShortZero,
                _ => ShortOne,
            };
            c.set_symbol(last, flipped, Timestamp::new(last as i64, 0));
        }
    }

    /// Encode 2002-03-31 00:59 UTC, no BST in effect.
    fn frame() -> Channel {
        let mut c = blank_channel();
        let start = CAL_BASE;
        let length = c.count;

        put_msb(&mut c, start, 0, 4); // year tens -> seg0
        put_msb(&mut c, start + 4, 2, 4); // year units -> seg1 => year 2002
        put_msb(&mut c, start + 8, 0, 1); // month tens -> seg2
        put_msb(&mut c, start + 9, 3, 4); // month units -> seg3 => month 3
        put_msb(&mut c, start + 13, 3, 2); // day tens -> seg4
        put_msb(&mut c, start + 15, 1, 4); // day units -> seg5 => day 31
        put_msb(&mut c, start + 19, 0, 3); // weekday, unused -> seg6
        put_msb(&mut c, start + 22, 0, 2); // hour tens -> seg7
        put_msb(&mut c, start + 24, 0, 4); // hour units -> seg8 => hour 0
        put_msb(&mut c, start + 28, 5, 3); // minute tens -> seg9
        put_msb(&mut c, start + 31, 9, 4); // minute units -> seg10 => minute 59

        seed_and_balance(&mut c, length, 0, start, 8);
        seed_and_balance(&mut c, length, 1, start + 8, 11);
        seed_and_balance(&mut c, length, 2, start + 19, 3);
        seed_and_balance(&mut c, length, 3, start + 22, 13);

        let dst_index = length - DST_FLAG_OFFSET;
        c.set_symbol(dst_index, ShortZero, Timestamp::new(0, 0));

        c
    }

    #[test]
    fn decodes_without_bst() {
        let c = frame();
        let decoded = decode(&c).expect("frame should decode");
        assert_eq!(decoded.utc_seconds, 1_017_536_340);
    }

    #[test]
    fn applies_bst_offset() {
        let mut c = frame();
        let length = c.count;
        let dst_index = length - DST_FLAG_OFFSET;
        c.set_symbol(dst_index, MsfAB, Timestamp::new(0, 0));
        let decoded = decode(&c).expect("frame should decode");
        assert_eq!(decoded.utc_seconds, 1_017_536_340 - 3_600);
    }

    #[test]
    fn rejects_broken_parity_seed() {
        let mut c = frame();
        let length = c.count;
        let seed_index = length - 7;
        c.set_symbol(seed_index, ShortZero, Timestamp::new(0, 0));
        assert_eq!(decode(&c), Err(DecodeError::Parity));
    }

    #[test]
    fn rejects_short_buffer() {
        let mut c = Channel::new(LineName::Dcd, 0);
        c.set_symbol(1, ShortOne, Timestamp::new(0, 0));
        c.count = 2;
        assert_eq!(decode(&c), Err(DecodeError::Framing));
    }
}
