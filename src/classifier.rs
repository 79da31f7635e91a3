//! The edge-timing front end (§4.B): converts asynchronous line-transition
//! events into a classified stream of pulse symbols, and recognises the
//! three station-specific minute-marker conditions.
//!
//! Station identity is never carried in the symbol stream itself — it is
//! inferred purely from which of the three marker conditions fires.

use crate::channel::Channel;
use crate::symbol::{bands, Level, PulseSymbol};
use crate::time::Timestamp;

/// Which transmitter's minute-marker condition just fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationKind {
    Dcf77,
    Msf,
    Wwvb,
}

/// Result of feeding one edge event into [`on_edge`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Nothing decodable yet; more edges are needed.
    None,
    /// A minute marker was recognised. `raw_mark` is the falling edge that
    /// opened the current (or missing) pulse — the fallback "most recent
    /// second mark" timestamp used by the offset estimator on failure.
    MinuteMarker {
        station: StationKind,
        raw_mark: Timestamp,
    },
}

/// Feed one line-transition event into the channel's classifier state.
/// `new_level` is the level the line transitioned *to*.
pub fn on_edge(channel: &mut Channel, new_level: Level, t: Timestamp) -> EdgeOutcome {
    let previous = channel.level;
    channel.level = new_level;

    match (previous, new_level) {
        (Level::High, Level::Low) => falling_edge(channel, t),
        (Level::Low, Level::High) => rising_edge(channel, t),
        // No-op transitions (duplicate reports of the same level) carry no
        // timing information.
        _ => EdgeOutcome::None,
    }
}

fn falling_edge(channel: &mut Channel, t: Timestamp) -> EdgeOutcome {
    channel.t_fall = Some(t);

    let high_duration = match channel.t_rise {
        Some(t_rise) => t.diff_micros(&t_rise),
        None => return EdgeOutcome::None,
    };

    if bands::DCF77_MARKER_HIGH_MS.contains(&(high_duration / 1_000)) && channel.count > 44 {
        channel.record_marker_timestamp(t);
        return EdgeOutcome::MinuteMarker {
            station: StationKind::Dcf77,
            raw_mark: t,
        };
    }

    if bands::MSF_BIT_B_HIGH_MS.contains(&(high_duration / 1_000)) {
        channel.retrofit_last_symbol(PulseSymbol::MsfBFlag);
        channel.correct = true;
    }

    EdgeOutcome::None
}

fn rising_edge(channel: &mut Channel, t: Timestamp) -> EdgeOutcome {
    channel.t_rise = Some(t);

    if channel.correct {
        channel.correct = false;
        return EdgeOutcome::None;
    }

    let t_fall = match channel.t_fall {
        Some(t_fall) => t_fall,
        None => {
            channel.hard_reset();
            return EdgeOutcome::None;
        }
    };
    let low_duration_ms = t.diff_micros(&t_fall) / 1_000;

    let symbol = match PulseSymbol::from_low_duration_ms(low_duration_ms) {
        Some(symbol) => symbol,
        None => {
            channel.hard_reset();
            return EdgeOutcome::None;
        }
    };

    let outcome = match symbol {
        PulseSymbol::ShortZero => {
            channel.record_pulse(symbol, t_fall);
            channel.marker <<= 1;
            channel.frame = 0;
            EdgeOutcome::None
        }
        PulseSymbol::ShortOne | PulseSymbol::MsfAB => {
            channel.record_pulse(symbol, t_fall);
            channel.marker = (channel.marker << 1) | 1;
            channel.frame = 0;
            EdgeOutcome::None
        }
        PulseSymbol::LongFour => {
            channel.record_pulse(symbol, t_fall);
            channel.frame = 0;
            if channel.marker == 0x7e && channel.count > 42 {
                EdgeOutcome::MinuteMarker {
                    station: StationKind::Msf,
                    raw_mark: t_fall,
                }
            } else {
                EdgeOutcome::None
            }
        }
        PulseSymbol::LongFive => {
            channel.record_pulse(symbol, t_fall);
            channel.frame += 1;
            if channel.frame == 2 && channel.count > 60 {
                EdgeOutcome::MinuteMarker {
                    station: StationKind::Wwvb,
                    raw_mark: t_fall,
                }
            } else {
                EdgeOutcome::None
            }
        }
        // MsfBFlag is never produced by duration classification; it is
        // only ever retrofitted onto a prior slot in `falling_edge`.
        PulseSymbol::MsfBFlag => unreachable!("MsfBFlag is not a primary classification"),
    };

    if matches!(outcome, EdgeOutcome::None) && channel.count >= crate::channel::FRAME_CAPACITY {
        channel.hard_reset();
    }

    outcome
}

impl Channel {
    /// Store a newly classified symbol at the current slot and advance
    /// `count`.
    fn record_pulse(&mut self, symbol: PulseSymbol, t_fall: Timestamp) {
        let index = self.count;
        self.set_symbol(index, symbol, t_fall);
        self.count += 1;
    }

    /// Record only the falling-edge timestamp of a missing (DCF77 marker)
    /// pulse, without allocating a symbol slot or advancing `count`.
    fn record_marker_timestamp(&mut self, t_fall: Timestamp) {
        let index = self.count;
        self.set_marker_timestamp(index, t_fall);
    }

    /// Retrofit the symbol at the previous slot (`count - 1`) into an MSF
    /// bit-B flag, observed on the falling edge that follows it.
    fn retrofit_last_symbol(&mut self, symbol: PulseSymbol) {
        if self.count > 1 {
            self.retrofit_symbol(self.count - 1, symbol);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::LineName;

    fn ms(sec: i64, usec_ms: i64) -> Timestamp {
        Timestamp::new(sec, (usec_ms * 1_000) as i32)
    }

    #[test]
    fn classifies_a_short_one_on_rising_edge() {
        let mut c = Channel::new(LineName::Dcd, 0);
        // first falling edge establishes t_fall with no prior t_rise
        assert_eq!(
            on_edge(&mut c, Level::Low, Timestamp::new(0, 0)),
            EdgeOutcome::None
        );
        // 200ms low -> ShortOne
        assert_eq!(
            on_edge(&mut c, Level::High, ms(0, 200)),
            EdgeOutcome::None
        );
        assert_eq!(c.symbol_at(1), Some(PulseSymbol::ShortOne));
        assert_eq!(c.count, 2);
        assert_eq!(c.marker, 1);
    }

    #[test]
    fn unclassifiable_duration_hard_resets() {
        let mut c = Channel::new(LineName::Dcd, 0);
        c.count = 10;
        c.marker = 0xAB;
        on_edge(&mut c, Level::Low, Timestamp::new(0, 0));
        // 1s low: outside every band
        on_edge(&mut c, Level::High, Timestamp::new(1, 0));
        assert_eq!(c.count, 1);
        assert_eq!(c.marker, 0);
    }

    #[test]
    fn msf_bit_b_retrofit_consumes_the_next_rising_edge() {
        let mut c = Channel::new(LineName::Dcd, 0);
        on_edge(&mut c, Level::Low, Timestamp::new(0, 0));
        on_edge(&mut c, Level::High, ms(0, 100)); // ShortZero at index 1
        assert_eq!(c.symbol_at(1), Some(PulseSymbol::ShortZero));

        // A short high (100ms) triggers the bit-B retrofit of slot 1.
        on_edge(&mut c, Level::Low, ms(0, 200));
        assert_eq!(c.symbol_at(1), Some(PulseSymbol::MsfBFlag));
        assert!(c.correct);

        // The next rising edge is consumed, not classified as a new pulse.
        let outcome = on_edge(&mut c, Level::High, ms(0, 250));
        assert_eq!(outcome, EdgeOutcome::None);
        assert!(!c.correct);
        assert_eq!(c.count, 2);
    }

    #[test]
    fn msf_marker_fires_on_0x7e_after_count_42() {
        let mut c = Channel::new(LineName::Dcd, 0);
        c.count = 43;
        c.marker = 0x3f; // will become 0x7e after one more "1" bit
        c.t_rise = Some(Timestamp::new(0, 0));
        on_edge(&mut c, Level::Low, Timestamp::new(0, 0));
        let outcome = on_edge(&mut c, Level::High, ms(0, 500)); // LongFour
        assert_eq!(
            outcome,
            EdgeOutcome::MinuteMarker {
                station: StationKind::Msf,
                raw_mark: Timestamp::new(0, 0),
            }
        );
    }

    #[test]
    fn wwvb_marker_fires_on_two_consecutive_long_fives() {
        let mut c = Channel::new(LineName::Dcd, 0);
        c.count = 61;
        c.frame = 1;
        on_edge(&mut c, Level::Low, Timestamp::new(0, 0));
        let outcome = on_edge(&mut c, Level::High, ms(0, 800)); // LongFive
        assert_eq!(
            outcome,
            EdgeOutcome::MinuteMarker {
                station: StationKind::Wwvb,
                raw_mark: Timestamp::new(0, 0),
            }
        );
    }

    #[test]
    fn dcf77_marker_fires_on_missing_second_mark() {
        let mut c = Channel::new(LineName::Dcd, 0);
        c.count = 45;
        c.t_rise = Some(Timestamp::new(0, 0));
        let outcome = on_edge(&mut c, Level::Low, Timestamp::new(1, 800_000));
        assert_eq!(
            outcome,
            EdgeOutcome::MinuteMarker {
                station: StationKind::Dcf77,
                raw_mark: Timestamp::new(1, 800_000),
            }
        );
    }
}
