//! Violation reporting.
//!
//! The hot path ([`report_if_violating`]) is a few atomic loads. Everything
//! else is `#[cold]` and runs inside a `NonRealtimeContext`, so the allocation,
//! locking and I/O done while reporting are never reported themselves.

use std::ffi::c_int;
use std::io::Write;

use backtrace::Frame;
use rtcheck_core::{CheckFlags, report};
use rtcheck_membrane::{NonRealtimeContext, config, policy};

use crate::bootstrap;

/// Report a call to the function behind `flag` if the calling thread is in a
/// real-time region and has not disabled `flag`.
#[inline]
pub fn report_if_violating(flag: CheckFlags, function: &'static str) {
    if policy::should_report(flag) && !bootstrap::is_resolving() {
        report_violation(function);
    }
}

/// Report `function` if the calling thread is in a real-time region. Used for
/// functions the host flags itself; the disabled mask does not apply.
pub fn log_function_if_realtime_context(function: &str) {
    if policy::should_report_unflagged() {
        report_violation(function);
    }
}

/// Print the diagnostic for `function` and apply the error mode.
///
/// The caller must be in a real-time region.
#[cold]
#[inline(never)]
pub fn report_violation(function: &str) {
    let _errno = ErrnoGuard::save();
    let _reporting = NonRealtimeContext::new();

    let frames = capture_frames(config::max_frames());
    let text = report::render_violation(function, &frames);
    {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(text.as_bytes());
        let _ = stderr.flush();
    }

    if config::error_mode().terminates() {
        std::process::exit(1);
    }
}

fn frame_name(frame: &Frame) -> String {
    let mut name = None;
    backtrace::resolve_frame(frame, |symbol| {
        if name.is_none() {
            name = symbol.name().map(|symbol| format!("{symbol:#}"));
        }
    });
    name.unwrap_or_else(|| format!("{:?}", frame.ip()))
}

/// Demangled names of the caller's frames, innermost first, with the
/// checker's own frames removed.
fn capture_frames(limit: usize) -> Vec<String> {
    let mut frames = Vec::new();
    backtrace::trace(|frame| {
        let name = frame_name(frame);
        if !report::is_internal_frame(&name) {
            frames.push(name);
        }
        frames.len() < limit
    });
    frames
}

/// Restores the caller's `errno` on drop so a `continue`-mode report does not
/// leak stderr or unwinder errors into the wrapped call's observable state.
struct ErrnoGuard(c_int);

impl ErrnoGuard {
    fn save() -> Self {
        // SAFETY: the errno location is valid for the calling thread.
        Self(unsafe { *errno_location() })
    }
}

impl Drop for ErrnoGuard {
    fn drop(&mut self) {
        // SAFETY: as in `save`.
        unsafe { *errno_location() = self.0 };
    }
}

#[cfg(target_vendor = "apple")]
unsafe fn errno_location() -> *mut c_int {
    // SAFETY: libSystem's per-thread errno accessor.
    unsafe { libc::__error() }
}

#[cfg(not(target_vendor = "apple"))]
unsafe fn errno_location() -> *mut c_int {
    // SAFETY: libc's per-thread errno accessor.
    unsafe { libc::__errno_location() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[inline(never)]
    fn capture_here() -> Vec<String> {
        capture_frames(64)
    }

    #[test]
    fn capture_is_bounded_and_skips_internal_frames() {
        let frames = capture_frames(3);
        assert!(frames.len() <= 3);
        assert!(frames.iter().all(|f| !report::is_internal_frame(f)));
    }

    #[test]
    fn capture_sees_the_calling_test() {
        let frames = capture_here();
        assert!(!frames.is_empty());
        if cfg!(debug_assertions) {
            assert!(
                frames.iter().any(|f| f.contains("capture_here")),
                "frames: {frames:?}"
            );
        }
    }

    #[test]
    fn errno_guard_restores_value() {
        unsafe { *errno_location() = libc::EAGAIN };
        {
            let _guard = ErrnoGuard::save();
            unsafe { *errno_location() = libc::EBADF };
        }
        assert_eq!(unsafe { *errno_location() }, libc::EAGAIN);
    }

    #[test]
    fn nothing_reported_outside_realtime() {
        std::thread::spawn(|| {
            config::mark_initialized();
            // Would print and exit the test binary if it reported.
            report_if_violating(CheckFlags::MALLOC, "malloc");
            log_function_if_realtime_context("user_fn");
        })
        .join()
        .unwrap();
    }
}
