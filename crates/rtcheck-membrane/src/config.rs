//! Process-wide checker configuration.
//!
//! Three atomics shared by every thread:
//! - the error mode (`RTCHECK_ERROR_MODE`, default `exit`),
//! - the initialization flag, false until the load-time constructor finishes,
//! - the stack capture limit (`RTCHECK_MAX_FRAMES`, default 128).
//!
//! The constructor reads the environment first and publishes the
//! initialization flag last, with `Release`. A thread that observes the flag
//! with `Acquire` therefore also observes the configured mode.

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicUsize, Ordering};

use rtcheck_core::ErrorMode;

pub const ERROR_MODE_ENV: &str = "RTCHECK_ERROR_MODE";
pub const MAX_FRAMES_ENV: &str = "RTCHECK_MAX_FRAMES";

pub const DEFAULT_MAX_FRAMES: usize = 128;
pub const MAX_FRAMES_LIMIT: usize = 256;

static ERROR_MODE: AtomicU8 = AtomicU8::new(ErrorMode::Exit.as_raw());
static INITIALIZED: AtomicBool = AtomicBool::new(false);
static MAX_FRAMES: AtomicUsize = AtomicUsize::new(DEFAULT_MAX_FRAMES);

#[must_use]
pub fn error_mode() -> ErrorMode {
    ErrorMode::from_raw(ERROR_MODE.load(Ordering::Acquire))
}

pub fn set_error_mode(mode: ErrorMode) {
    ERROR_MODE.store(mode.as_raw(), Ordering::Release);
}

/// True once the load-time constructor has completed. Never reset.
#[inline]
#[must_use]
pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::Acquire)
}

pub fn mark_initialized() {
    INITIALIZED.store(true, Ordering::Release);
}

#[must_use]
pub fn max_frames() -> usize {
    MAX_FRAMES.load(Ordering::Relaxed)
}

pub fn set_max_frames(frames: usize) {
    MAX_FRAMES.store(frames.clamp(1, MAX_FRAMES_LIMIT), Ordering::Relaxed);
}

fn parse_max_frames(raw: &str) -> Option<usize> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|frames| (1..=MAX_FRAMES_LIMIT).contains(frames))
}

/// Apply `RTCHECK_ERROR_MODE` and `RTCHECK_MAX_FRAMES`.
///
/// Must run before [`mark_initialized`]: reading the environment allocates,
/// and those allocations must not be checked.
pub fn apply_env_overrides() {
    if let Some(raw) = std::env::var_os(ERROR_MODE_ENV) {
        set_error_mode(ErrorMode::from_str_loose(&raw.to_string_lossy()));
    }
    if let Some(frames) = std::env::var_os(MAX_FRAMES_ENV)
        .and_then(|raw| parse_max_frames(&raw.to_string_lossy()))
    {
        set_max_frames(frames);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_round_trips_through_atomic() {
        let previous = ERROR_MODE.swap(ErrorMode::Exit.as_raw(), Ordering::SeqCst);
        assert_eq!(error_mode(), ErrorMode::Exit);
        set_error_mode(ErrorMode::Continue);
        assert_eq!(error_mode(), ErrorMode::Continue);
        set_error_mode(ErrorMode::Exit);
        assert_eq!(error_mode(), ErrorMode::Exit);

        ERROR_MODE.store(42, Ordering::SeqCst);
        assert_eq!(error_mode(), ErrorMode::Exit);
        ERROR_MODE.store(previous, Ordering::SeqCst);
    }

    #[test]
    fn max_frames_parsing() {
        assert_eq!(parse_max_frames("64"), Some(64));
        assert_eq!(parse_max_frames(" 1 "), Some(1));
        assert_eq!(parse_max_frames("256"), Some(256));
        assert_eq!(parse_max_frames("0"), None);
        assert_eq!(parse_max_frames("257"), None);
        assert_eq!(parse_max_frames("-3"), None);
        assert_eq!(parse_max_frames("lots"), None);
    }

    #[test]
    fn max_frames_setter_clamps() {
        let previous = MAX_FRAMES.swap(DEFAULT_MAX_FRAMES, Ordering::SeqCst);
        set_max_frames(0);
        assert_eq!(max_frames(), 1);
        set_max_frames(10_000);
        assert_eq!(max_frames(), MAX_FRAMES_LIMIT);
        set_max_frames(32);
        assert_eq!(max_frames(), 32);
        MAX_FRAMES.store(previous, Ordering::SeqCst);
    }
}
