//! Raw system entry: `syscall` and, on Linux, `sched_yield`.
//!
//! There is no user-space `futex` symbol; futex operations go through
//! `syscall(SYS_futex, ...)` and are reported under the `futex` flag. Every
//! other number is reported as `syscall`.
//!
//! The syscall ABI passes at most six arguments, so six register-sized slots
//! are read and forwarded whatever the call number.

use std::ffi::c_long;

use rtcheck_core::CheckFlags;

use crate::reporter::report_if_violating;

/// Flag and report name for a syscall number.
#[cfg(target_os = "linux")]
#[must_use]
pub fn classify(number: c_long) -> (CheckFlags, &'static str) {
    if number == libc::SYS_futex {
        (CheckFlags::FUTEX, "futex")
    } else {
        (CheckFlags::SYSCALL, "syscall")
    }
}

#[cfg(not(target_os = "linux"))]
#[must_use]
pub fn classify(_number: c_long) -> (CheckFlags, &'static str) {
    (CheckFlags::SYSCALL, wrapper_name!(syscall))
}

#[cfg(not(target_vendor = "apple"))]
type SyscallNumber = c_long;
#[cfg(target_vendor = "apple")]
type SyscallNumber = std::ffi::c_int;

type SyscallFn = unsafe extern "C" fn(SyscallNumber, ...) -> SyscallNumber;

#[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
pub unsafe extern "C" fn syscall(number: SyscallNumber, mut args: ...) -> SyscallNumber {
    let (flag, name) = classify(c_long::from(number));
    report_if_violating(flag, name);
    // SAFETY: reads the six argument slots of the syscall convention; slots
    // the call does not use are ignored by the kernel.
    let a: [c_long; 6] = unsafe {
        [
            args.next_arg::<c_long>(),
            args.next_arg::<c_long>(),
            args.next_arg::<c_long>(),
            args.next_arg::<c_long>(),
            args.next_arg::<c_long>(),
            args.next_arg::<c_long>(),
        ]
    };
    let real = real!(syscall: SyscallFn);
    // SAFETY: same number and argument bits as the caller's.
    unsafe { real(number, a[0], a[1], a[2], a[3], a[4], a[5]) }
}
substitute!(syscall);

#[cfg(target_os = "linux")]
intercept! {
    fn sched_yield() -> std::ffi::c_int => CheckFlags::SCHEDULE;
}
