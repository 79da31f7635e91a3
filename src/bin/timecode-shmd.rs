//! Foreground daemon driving a [`Supervisor`] off a [`ModemStatusLine`]
//! implementation. Daemonization (fork/setsid/PID file) is out of scope;
//! this always runs in the foreground, logging through `env_logger`.

use anyhow::{Context, Result};
use log::{info, warn};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use structopt::StructOpt;
use timecode_shmd::config::Config;
use timecode_shmd::serial::{EdgeWaitResult, ModemStatusLine, SimulatedLine};
use timecode_shmd::supervisor::{ProcessOutcome, Supervisor};
use timecode_shmd::time::Timestamp;

/// How long each `wait_for_change` call blocks before reporting a
/// timeout back to the main loop.
const WAIT_TIMEOUT: Duration = Duration::from_secs(5);

fn wall_clock_now() -> Timestamp {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    Timestamp::new(d.as_secs() as i64, d.subsec_micros() as i32)
}

fn run(line: &mut impl ModemStatusLine, supervisor: &mut Supervisor, test: bool) -> Result<()> {
    line.assert_power().context("failed to power on receiver(s)")?;

    loop {
        let (bits, t) = match line
            .wait_for_change(WAIT_TIMEOUT)
            .context("serial line error")?
        {
            EdgeWaitResult::Changed(bits, t) => (bits, t),
            EdgeWaitResult::Timeout => break,
        };

        let now = wall_clock_now();
        let outcomes = supervisor.dispatch(bits, t, now, test);
        for outcome in outcomes {
            match outcome {
                ProcessOutcome::Idle => {}
                ProcessOutcome::Published { utc_seconds } => {
                    info!("published time {}", utc_seconds);
                }
                ProcessOutcome::DecodeFailed(err) => {
                    info!("frame rejected: {}", err);
                }
                ProcessOutcome::SkewRejected { decoded, local } => {
                    warn!("decoded {} differs too far from local {}", decoded, local);
                }
                ProcessOutcome::PublishFailed { utc_seconds } => {
                    warn!("decoded time {} could not be published", utc_seconds);
                }
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let config = Config::from_args();

    info!(
        "opening {:?} ({})",
        config.device,
        if config.poll { "poll" } else { "interrupt-driven" }
    );
    warn!(
        "no production serial backend is linked into this build; \
         running against a simulated, event-less line"
    );

    let mut line = SimulatedLine::new(Vec::new());
    let mut supervisor = Supervisor::new();

    run(&mut line, &mut supervisor, config.test)
}
