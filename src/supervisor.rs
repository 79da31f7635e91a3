//! The channel supervisor (§4.F): owns the three modem-status-line
//! channels, routes edge events into the classifier, and on every
//! minute marker drives decode → offset estimate → publish, exactly as
//! `ProcessStatusChange`/`ProcessTimeCode` did for the three lines in
//! the original daemon.

use crate::channel::{Channel, ChannelDiagnostics, LineName};
use crate::classifier::{self, EdgeOutcome, StationKind};
use crate::decoders::{self, DecodeError, DecodedTime};
use crate::offset::{self, OffsetError};
use crate::publisher::{Leap, PublishError, ShmHandle};
use crate::serial::ModemBits;
use crate::symbol::Level;
use crate::time::Timestamp;
use log::{debug, error, info, warn};

/// A decoded time differing from the local clock by more than this many
/// seconds is rejected rather than published — it is far more likely to
/// be a framing coincidence than an actual 1000-second clock error.
const GROSS_SKEW_SECONDS: i64 = 1_000;

/// No warning is logged until this many seconds have passed without a
/// valid decode.
const NO_SIGNAL_WARNING_SECONDS: i64 = 300;

/// What happened as a result of feeding one edge into a line's channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// No minute marker fired.
    Idle,
    /// A minute marker fired and the frame decoded and published.
    Published { utc_seconds: i64 },
    /// A minute marker fired but the frame was corrupt.
    DecodeFailed(DecodeError),
    /// The frame decoded but failed the gross-skew sanity gate.
    SkewRejected { decoded: i64, local: i64 },
    /// The frame decoded but the shared-memory segment couldn't be
    /// attached; the sample was dropped and the error logged, but
    /// decoding keeps running.
    PublishFailed { utc_seconds: i64 },
}

/// One of the three supervised lines, bundling its channel state with
/// the bookkeeping `ProcessStatusChange`/`LogNoSignalWarning` needed.
pub struct SupervisedLine {
    pub channel: Channel,
    last_valid: Option<i64>,
    warned: bool,
}

impl SupervisedLine {
    pub fn new(line_name: LineName, unit: u8) -> Self {
        SupervisedLine {
            channel: Channel::new(line_name, unit),
            last_valid: None,
            warned: false,
        }
    }

    pub fn diagnostics(&self) -> &ChannelDiagnostics {
        &self.channel.diagnostics
    }

    /// Whether the no-signal warning latch is currently tripped.
    pub fn is_warned(&self) -> bool {
        self.warned
    }

    /// Feed one transition, decode and publish on a minute marker, and
    /// report what happened. `now` is the wall-clock reading used for
    /// the gross-skew sanity check and as the receive timestamp; `test`
    /// suppresses shared-memory publication (mirroring the original
    /// `-t`/`--test` mode) while still reporting what would have been
    /// published.
    pub fn process_edge(
        &mut self,
        level: Level,
        t: Timestamp,
        now: Timestamp,
        test: bool,
    ) -> ProcessOutcome {
        let outcome = classifier::on_edge(&mut self.channel, level, t);

        let (station, raw_mark) = match outcome {
            EdgeOutcome::None => return ProcessOutcome::Idle,
            EdgeOutcome::MinuteMarker { station, raw_mark } => (station, raw_mark),
        };

        self.channel.diagnostics.frames_attempted += 1;
        let decoded = match decoders::decode(&self.channel, station) {
            Ok(decoded) => decoded,
            Err(err) => {
                self.tally_decode_error(err);
                self.channel.hard_reset();
                debug!(
                    "{} line: frame rejected: {}",
                    self.channel.line_name.as_str(),
                    err
                );
                return ProcessOutcome::DecodeFailed(err);
            }
        };

        if (now.sec - decoded.utc_seconds).abs() > GROSS_SKEW_SECONDS {
            self.channel.diagnostics.skew_rejects += 1;
            self.channel.hard_reset();
            warn!(
                "{} line: decoded time differs from system time by more than {}s, ignored",
                self.channel.line_name.as_str(),
                GROSS_SKEW_SECONDS
            );
            return ProcessOutcome::SkewRejected {
                decoded: decoded.utc_seconds,
                local: now.sec,
            };
        }

        if !test {
            if let Err(err) = self.publish(decoded, raw_mark) {
                self.channel.diagnostics.publish_failures += 1;
                self.channel.hard_reset();
                error!(
                    "{} line: failed to publish decoded sample: {}",
                    self.channel.line_name.as_str(),
                    err
                );
                return ProcessOutcome::PublishFailed {
                    utc_seconds: decoded.utc_seconds,
                };
            }
        }

        self.channel.diagnostics.frames_decoded += 1;
        self.note_recovery(decoded.utc_seconds);
        self.last_valid = Some(decoded.utc_seconds);
        self.channel.hard_reset();

        ProcessOutcome::Published {
            utc_seconds: decoded.utc_seconds,
        }
    }

    fn tally_decode_error(&mut self, err: DecodeError) {
        match err {
            DecodeError::Framing => self.channel.diagnostics.framing_failures += 1,
            DecodeError::Parity => self.channel.diagnostics.parity_failures += 1,
            DecodeError::Sanity => self.channel.diagnostics.sanity_rejects += 1,
        }
    }

    /// `raw_mark` is the timestamp of the minute-marker edge itself,
    /// used as the receive-time fallback when fewer than 59 pulses of
    /// history are available to average.
    fn publish(&mut self, decoded: DecodedTime, raw_mark: Timestamp) -> Result<(), PublishError> {
        if self.channel.shm.is_none() {
            self.channel.shm = Some(ShmHandle::attach(self.channel.unit)?);
        }

        let (receive, clock) = self.resolve_publish_timestamps(decoded, raw_mark);
        if let Some(shm) = &mut self.channel.shm {
            shm.publish(receive, clock, Leap::NoWarning);
        }
        Ok(())
    }

    /// Compute the pair `ShmHandle::publish` expects: `clock` is the
    /// decoded radio reading itself (the reference-clock timestamp),
    /// `receive` is the offset-refined estimate of the local system
    /// clock at the moment that second-mark arrived, falling back to
    /// the marker edge's own raw timestamp when too few pulses have
    /// been buffered to average.
    fn resolve_publish_timestamps(
        &self,
        decoded: DecodedTime,
        raw_mark: Timestamp,
    ) -> (Timestamp, Timestamp) {
        let clock = Timestamp::new(decoded.utc_seconds, 0);

        let receive = match offset::estimate(
            &self
                .channel
                .recent_pulse_times(offset::SAMPLE_COUNT)
                .unwrap_or_default(),
        ) {
            Ok(average) if average < 0 => Timestamp::new(decoded.utc_seconds - 1, average + 1_000_000),
            Ok(average) => Timestamp::new(decoded.utc_seconds, average),
            Err(OffsetError::InsufficientSamples) | Err(OffsetError::ExcessiveDeviation) => {
                raw_mark
            }
        };

        (receive, clock)
    }

    /// Log how long it has been since the previous valid time, matching
    /// the original's `%ldh %ldm` / `%ldm` phrasing, only once recovery
    /// follows a logged warning.
    fn note_recovery(&mut self, decoded: i64) {
        if let Some(last) = self.last_valid {
            let gap = decoded - last;
            if self.warned && gap > 3_600 {
                info!(
                    "{} line: {}h {}m since previous valid time",
                    self.channel.line_name.as_str(),
                    gap / 3_600,
                    (gap % 3_600) / 60
                );
            } else if self.warned && gap > NO_SIGNAL_WARNING_SECONDS {
                info!(
                    "{} line: {}m since previous valid time",
                    self.channel.line_name.as_str(),
                    gap / 60
                );
            }
        }
        self.warned = false;
    }

    /// Warn once if no valid time has been decoded in the last five
    /// minutes, matching `LogNoSignalWarning`.
    pub fn check_no_signal(&mut self, now: i64) {
        if let Some(last) = self.last_valid {
            if (now - last) > NO_SIGNAL_WARNING_SECONDS && !self.warned {
                self.warned = true;
                warn!(
                    "no valid time received in last five minutes for {} line",
                    self.channel.line_name.as_str()
                );
            }
        }
    }
}

/// Owns all three supervised lines and fans one modem-status snapshot
/// out to each of them.
pub struct Supervisor {
    pub dcd: SupervisedLine,
    pub cts: SupervisedLine,
    pub dsr: SupervisedLine,
}

impl Supervisor {
    pub fn new() -> Self {
        Supervisor {
            dcd: SupervisedLine::new(LineName::Dcd, 0),
            cts: SupervisedLine::new(LineName::Cts, 1),
            dsr: SupervisedLine::new(LineName::Dsr, 2),
        }
    }

    /// Dispatch one observed modem-status snapshot to all three lines.
    /// `level_of` converts the raw high/low reading for each line; the
    /// caller is responsible for deriving it from whatever the serial
    /// backend reports.
    pub fn dispatch(
        &mut self,
        bits: ModemBits,
        t: Timestamp,
        now: Timestamp,
        test: bool,
    ) -> [ProcessOutcome; 3] {
        let level = |up: bool| if up { Level::High } else { Level::Low };
        [
            self.dcd.process_edge(level(bits.dcd), t, now, test),
            self.cts.process_edge(level(bits.cts), t, now, test),
            self.dsr.process_edge(level(bits.dsr), t, now, test),
        ]
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}
