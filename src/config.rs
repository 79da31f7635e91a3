//! Command-line configuration for the `timecode-shmd` executable (§6.2).
//! Library consumers of `timecode_shmd` never see this module; it only
//! exists to support the `bin` feature's entry point.

use std::path::PathBuf;
use structopt::StructOpt;

#[derive(StructOpt, Debug)]
#[structopt(
    name = "timecode-shmd",
    about = "Decode DCF77/MSF/WWVB time signals from a receiver attached to a serial port and publish samples to ntpd via its SHM reference clock driver."
)]
pub struct Config {
    /// Poll the serial port's modem-status lines instead of blocking on
    /// TIOCMIWAIT.
    #[structopt(short, long)]
    pub poll: bool,

    /// Print pulse lengths and decoded times to stdout instead of
    /// publishing to shared memory.
    #[structopt(short, long)]
    pub test: bool,

    /// Serial device the receiver(s) are attached to.
    #[structopt(name = "DEVICE", parse(from_os_str))]
    pub device: PathBuf,
}
