//! Sleeping wrappers.

use std::ffi::{c_int, c_uint};

use libc::timespec;
use rtcheck_core::CheckFlags;

intercept! {
    fn sleep(seconds: c_uint) -> c_uint => CheckFlags::SLEEP;
    fn usleep(usec: c_uint) -> c_int => CheckFlags::USLEEP;
    fn nanosleep(req: *const timespec, rem: *mut timespec) -> c_int => CheckFlags::NANOSLEEP;
}

// Rust's `thread::sleep` calls this rather than `nanosleep` on Linux.
#[cfg(target_os = "linux")]
intercept! {
    fn clock_nanosleep(clock: libc::clockid_t, flags: c_int, req: *const timespec, rem: *mut timespec)
        -> c_int => CheckFlags::NANOSLEEP;
}
