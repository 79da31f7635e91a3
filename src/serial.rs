//! The serial transport abstraction (§6.1): everything the supervisor
//! needs from a receiver attached to a serial port's modem-status lines.
//!
//! Production backends (interrupt-driven `TIOCMIWAIT`, or polling
//! `TIOCMGET` in a loop) are a thin, OS-specific `ioctl` wrapper around
//! this trait and are intentionally left unimplemented here; the trait
//! contract, and a deterministic test double that drives it, are what
//! this crate ships.

use crate::channel::LineName;
use crate::time::Timestamp;
use std::io;
use std::time::Duration;

/// The state of a single modem-status line at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModemBits {
    pub dcd: bool,
    pub cts: bool,
    pub dsr: bool,
}

impl ModemBits {
    pub fn get(&self, line: LineName) -> bool {
        match line {
            LineName::Dcd => self.dcd,
            LineName::Cts => self.cts,
            LineName::Dsr => self.dsr,
        }
    }
}

/// The outcome of one bounded wait for a modem-status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeWaitResult {
    /// A line changed; the new snapshot and the instant it was observed.
    Changed(ModemBits, Timestamp),
    /// No line changed before the timeout elapsed.
    Timeout,
}

/// A source of modem-status line transitions. One edge wait corresponds
/// to one call to `TIOCMIWAIT` (or one polling cycle) in the original
/// design.
pub trait ModemStatusLine {
    /// Power the receiver(s) on (the original asserted DTR/RTS).
    fn assert_power(&mut self) -> io::Result<()>;

    /// Read the current modem-status bits without waiting for a change,
    /// used by polling backends to seed their first comparison.
    fn read_bits(&mut self) -> io::Result<ModemBits>;

    /// Block until any of DCD/CTS/DSR changes or `timeout` elapses,
    /// returning the new line state and the instant it was observed.
    fn wait_for_change(&mut self, timeout: Duration) -> io::Result<EdgeWaitResult>;
}

/// A scripted [`ModemStatusLine`] for tests: replays a fixed sequence of
/// `(bits, timestamp)` events, then reports a timeout.
pub struct SimulatedLine {
    events: std::vec::IntoIter<(ModemBits, Timestamp)>,
    last: ModemBits,
    powered: bool,
}

impl SimulatedLine {
    pub fn new(events: Vec<(ModemBits, Timestamp)>) -> Self {
        SimulatedLine {
            events: events.into_iter(),
            last: ModemBits {
                dcd: false,
                cts: false,
                dsr: false,
            },
            powered: false,
        }
    }
}

impl ModemStatusLine for SimulatedLine {
    fn assert_power(&mut self) -> io::Result<()> {
        self.powered = true;
        Ok(())
    }

    fn read_bits(&mut self) -> io::Result<ModemBits> {
        Ok(self.last)
    }

    fn wait_for_change(&mut self, _timeout: Duration) -> io::Result<EdgeWaitResult> {
        match self.events.next() {
            Some((bits, t)) => {
                self.last = bits;
                Ok(EdgeWaitResult::Changed(bits, t))
            }
            None => Ok(EdgeWaitResult::Timeout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(dcd: bool) -> ModemBits {
        ModemBits {
            dcd,
            cts: false,
            dsr: false,
        }
    }

    #[test]
    fn replays_events_in_order_then_times_out() {
        let mut line = SimulatedLine::new(vec![
            (bits(true), Timestamp::new(0, 0)),
            (bits(false), Timestamp::new(1, 0)),
        ]);
        line.assert_power().unwrap();
        assert_eq!(
            line.wait_for_change(Duration::from_secs(1)).unwrap(),
            EdgeWaitResult::Changed(bits(true), Timestamp::new(0, 0))
        );
        assert_eq!(
            line.wait_for_change(Duration::from_secs(1)).unwrap(),
            EdgeWaitResult::Changed(bits(false), Timestamp::new(1, 0))
        );
        assert_eq!(
            line.wait_for_change(Duration::from_secs(1)).unwrap(),
            EdgeWaitResult::Timeout
        );
    }

    #[test]
    fn read_bits_reports_the_most_recent_change() {
        let mut line = SimulatedLine::new(vec![(bits(true), Timestamp::new(0, 0))]);
        assert_eq!(line.read_bits().unwrap(), bits(false));
        line.wait_for_change(Duration::from_secs(1)).unwrap();
        assert_eq!(line.read_bits().unwrap(), bits(true));
    }

    #[test]
    fn modem_bits_get_selects_the_right_line() {
        let b = ModemBits {
            dcd: true,
            cts: false,
            dsr: true,
        };
        assert!(b.get(LineName::Dcd));
        assert!(!b.get(LineName::Cts));
        assert!(b.get(LineName::Dsr));
    }
}
