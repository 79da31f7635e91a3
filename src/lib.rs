//! A decoder for the DCF77, MSF and WWVB longwave time-code broadcasts,
//! built to run as a daemon that reads pulse-width-modulated signals off
//! a serial port's modem-status lines and republishes decoded samples to
//! `ntpd` via its SHM reference clock driver.
//!
//! The pipeline is sans-I/O: [`classifier`] turns raw line-level edges
//! into a [`symbol`] stream, [`decoders`] turns a buffered frame of
//! symbols into a UTC instant, [`offset`] refines the sub-second timing
//! of that instant, and [`publisher`] writes the result out. None of
//! these know how the edges were obtained; [`serial`] and
//! [`supervisor`] wire them to an actual transport.
//!
//! Common abbreviations:
//!
//! - BCD: binary-coded decimal;
//! - DST: daylight saving time (CEST for DCF77, BST for MSF);
//! - SHM: shared memory, here specifically `ntpd`'s SHM driver ABI;
//! - PPS: pulse-per-second.

pub mod calendar;
pub mod channel;
pub mod classifier;
pub mod decoders;
pub mod offset;
pub mod publisher;
pub mod serial;
pub mod supervisor;
pub mod symbol;
pub mod time;

#[cfg(feature = "bin")]
pub mod config;
