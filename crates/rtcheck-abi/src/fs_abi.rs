//! Filesystem wrappers: `stat`, `fstat`, `open`, `openat`, `fopen`, `fcntl`
//! and, on glibc, their large-file aliases.
//!
//! The variadic ones are written by hand. `open`/`openat` read the mode only
//! when the flags say one was passed; `fcntl` forwards its optional third
//! argument as a single `unsigned long`, wide enough for both the integer and
//! the pointer forms.

use std::ffi::{c_char, c_int, c_uint, c_ulong};

use libc::FILE;
use rtcheck_core::CheckFlags;

use crate::open_mode::takes_mode;
use crate::reporter::report_if_violating;

type OpenFn = unsafe extern "C" fn(*const c_char, c_int, ...) -> c_int;
type OpenatFn = unsafe extern "C" fn(c_int, *const c_char, c_int, ...) -> c_int;
type FcntlFn = unsafe extern "C" fn(c_int, c_int, ...) -> c_int;

#[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mut args: ...) -> c_int {
    report_if_violating(CheckFlags::OPEN, wrapper_name!(open));
    // SAFETY: `takes_mode` holds exactly when the caller passed a mode.
    let mode: c_uint = if takes_mode(flags) { unsafe { args.next_arg::<c_uint>() } } else { 0 };
    let real = real!(open: OpenFn);
    // SAFETY: same path, flags and mode as the caller supplied.
    unsafe { real(path, flags, mode) }
}
substitute!(open);

#[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
pub unsafe extern "C" fn openat(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mut args: ...
) -> c_int {
    report_if_violating(CheckFlags::OPENAT, wrapper_name!(openat));
    // SAFETY: as in `open`.
    let mode: c_uint = if takes_mode(flags) { unsafe { args.next_arg::<c_uint>() } } else { 0 };
    let real = real!(openat: OpenatFn);
    // SAFETY: same arguments as the caller supplied.
    unsafe { real(dirfd, path, flags, mode) }
}
substitute!(openat);

#[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
pub unsafe extern "C" fn fcntl(fd: c_int, cmd: c_int, mut args: ...) -> c_int {
    report_if_violating(CheckFlags::FCNTL, wrapper_name!(fcntl));
    // SAFETY: reads one register-sized slot; commands without an argument
    // ignore whatever it holds.
    let arg: c_ulong = unsafe { args.next_arg::<c_ulong>() };
    let real = real!(fcntl: FcntlFn);
    // SAFETY: same descriptor, command and argument bits as the caller's.
    unsafe { real(fd, cmd, arg) }
}
substitute!(fcntl);

intercept! {
    fn stat(path: *const c_char, buf: *mut libc::stat) -> c_int => CheckFlags::STAT;
    fn fstat(fd: c_int, buf: *mut libc::stat) -> c_int => CheckFlags::FSTAT;
    fn fopen(path: *const c_char, mode: *const c_char) -> *mut FILE => CheckFlags::FOPEN;
}

/// glibc large-file entry points, reported under their base function's flag
/// and under the name actually called.
#[cfg(all(target_os = "linux", target_env = "gnu"))]
mod lfs {
    use std::ffi::{c_char, c_int, c_uint, c_ulong};

    use libc::FILE;
    use rtcheck_core::CheckFlags;

    use super::{FcntlFn, OpenFn, OpenatFn};
    use crate::open_mode::takes_mode;
    use crate::reporter::report_if_violating;

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mut args: ...) -> c_int {
        report_if_violating(CheckFlags::OPEN, "open64");
        // SAFETY: `takes_mode` holds exactly when the caller passed a mode.
        let mode: c_uint = if takes_mode(flags) { unsafe { args.next_arg::<c_uint>() } } else { 0 };
        let real = real!(open64: OpenFn);
        // SAFETY: same arguments as the caller supplied.
        unsafe { real(path, flags, mode) }
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn openat64(
        dirfd: c_int,
        path: *const c_char,
        flags: c_int,
        mut args: ...
    ) -> c_int {
        report_if_violating(CheckFlags::OPENAT, "openat64");
        // SAFETY: as in `open64`.
        let mode: c_uint = if takes_mode(flags) { unsafe { args.next_arg::<c_uint>() } } else { 0 };
        let real = real!(openat64: OpenatFn);
        // SAFETY: same arguments as the caller supplied.
        unsafe { real(dirfd, path, flags, mode) }
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn fcntl64(fd: c_int, cmd: c_int, mut args: ...) -> c_int {
        report_if_violating(CheckFlags::FCNTL, "fcntl64");
        // SAFETY: as in `fcntl`.
        let arg: c_ulong = unsafe { args.next_arg::<c_ulong>() };
        let real = real!(fcntl64: FcntlFn);
        // SAFETY: same arguments as the caller supplied.
        unsafe { real(fd, cmd, arg) }
    }

    intercept! {
        fn stat64(path: *const c_char, buf: *mut libc::stat64) -> c_int => CheckFlags::STAT;
        fn fstat64(fd: c_int, buf: *mut libc::stat64) -> c_int => CheckFlags::FSTAT;
        fn statx(
            dirfd: c_int,
            path: *const c_char,
            flags: c_int,
            mask: c_uint,
            buf: *mut libc::statx,
        ) -> c_int => CheckFlags::STAT;
        fn fopen64(path: *const c_char, mode: *const c_char) -> *mut FILE => CheckFlags::FOPEN;
    }
}
