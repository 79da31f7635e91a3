//! The NTP SHM reference-clock publisher (§4.E, §6.3): attaches the
//! per-unit System V shared memory segment and writes samples into it
//! using the lock-free tear-detection protocol the `ntpd` SHM driver
//! expects.

use crate::time::Timestamp;
use libc::{c_void, shmat, shmdt, shmget, IPC_CREAT};
use std::sync::atomic::{compiler_fence, Ordering};
use thiserror::Error;

/// Base of the per-unit SHM key space, matching `ntpd`'s `SHM` driver
/// (`unit` 0/1/2 select `/dev/shm`-backed segments 0x4e545030..32).
const SHM_KEY_BASE: i32 = 0x4e54_5030;

/// Clock precision advertised to `ntpd`: `2^PRECISION` seconds, about
/// 980 microseconds.
const PRECISION: i32 = -10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Leap {
    NoWarning,
    NotInSync,
}

impl Leap {
    fn code(self) -> i32 {
        match self {
            Leap::NoWarning => 0x00,
            Leap::NotInSync => 0x03,
        }
    }
}

/// Layout of the shared-memory segment the `ntpd` SHM reference clock
/// driver maps. Field order and widths are fixed by that driver's ABI
/// and must not be changed.
#[repr(C)]
struct ShmTime {
    mode: i32,
    count: i32,
    clock_sec: i64,
    clock_usec: i32,
    receive_sec: i64,
    receive_usec: i32,
    leap: i32,
    precision: i32,
    nsamples: i32,
    valid: i32,
    dummy: [i32; 10],
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("shmget failed for unit {unit}: {source}")]
    Get { unit: u8, source: std::io::Error },
    #[error("shmat failed for unit {unit}: {source}")]
    Attach { unit: u8, source: std::io::Error },
}

/// An attached SHM segment for one unit. Detaches on drop.
pub struct ShmHandle {
    unit: u8,
    segment: *mut ShmTime,
}

// The segment is exclusively owned by this handle; `ntpd` only ever
// reads it, and every write goes through the publish protocol's memory
// fences.
unsafe impl Send for ShmHandle {}

impl ShmHandle {
    /// Attach (creating if necessary) the SHM segment for `unit`.
    pub fn attach(unit: u8) -> Result<Self, PublishError> {
        let key = SHM_KEY_BASE + unit as i32;
        let size = std::mem::size_of::<ShmTime>();

        // SAFETY: `shmget`/`shmat` are called with a fixed-size, POD
        // struct and standard libc error-reporting conventions.
        let id = unsafe { shmget(key, size, IPC_CREAT | 0o700) };
        if id == -1 {
            return Err(PublishError::Get {
                unit,
                source: std::io::Error::last_os_error(),
            });
        }

        let segment = unsafe { shmat(id, std::ptr::null(), 0) };
        if segment as isize == -1 || segment.is_null() {
            return Err(PublishError::Attach {
                unit,
                source: std::io::Error::last_os_error(),
            });
        }

        Ok(ShmHandle {
            unit,
            segment: segment as *mut ShmTime,
        })
    }

    pub fn unit(&self) -> u8 {
        self.unit
    }

    /// Publish one sample using the tear-detection protocol: announce
    /// the write, update every field, then announce completion. A
    /// reader that observes `valid == 0` or a `count` that changed
    /// mid-read knows to retry.
    pub fn publish(&mut self, receive: Timestamp, clock: Timestamp, leap: Leap) {
        // SAFETY: `self.segment` was returned by a successful `shmat`
        // and is never aliased outside this handle.
        unsafe {
            let shm = &mut *self.segment;

            shm.mode = 1;
            shm.valid = 0;
            compiler_fence(Ordering::SeqCst);

            shm.leap = leap.code();
            shm.precision = PRECISION;
            shm.clock_sec = clock.sec;
            shm.clock_usec = clock.usec;
            shm.receive_sec = receive.sec;
            shm.receive_usec = receive.usec;

            compiler_fence(Ordering::SeqCst);
            shm.count += 1;
            shm.valid = 1;
        }
    }
}

impl Drop for ShmHandle {
    fn drop(&mut self) {
        unsafe {
            shmdt(self.segment as *const c_void);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shm_time_is_8_byte_aligned_for_the_two_time_t_fields() {
        assert_eq!(std::mem::align_of::<ShmTime>(), 8);
    }

    /// Regression guard for the `#[repr(C)]` layout `ntpd`'s SHM driver
    /// expects: any field addition/removal/reordering that changes the
    /// struct's size should be caught here rather than at a live `ntpd`.
    /// The same `ShmTime` type backs every per-channel `ShmHandle`
    /// instance, so this one assertion covers all three units' layout.
    #[test]
    fn shm_time_size_is_stable() {
        assert_eq!(std::mem::size_of::<ShmTime>(), 96);
    }

    #[test]
    fn leap_codes_match_the_legacy_constants() {
        assert_eq!(Leap::NoWarning.code(), 0x00);
        assert_eq!(Leap::NotInSync.code(), 0x03);
    }
}
