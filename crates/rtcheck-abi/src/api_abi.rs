//! The `rtc_*` C API used by instrumented programs.
//!
//! | symbol | effect |
//! |---|---|
//! | `rtc_realtime_enter` / `rtc_realtime_exit` | enter / leave a real-time region |
//! | `rtc_non_realtime_enter` / `rtc_non_realtime_exit` | suspend / resume checking inside one |
//! | `rtc_is_realtime_context` | query |
//! | `rtc_log_function_if_realtime_context` | report a host function by name |
//! | `rtc_set_error_mode` / `rtc_get_error_mode` | 0 = exit, 1 = continue |
//! | `rtc_disable_checks_for_thread` | replace the thread's disabled mask |
//! | `rtc_is_check_enabled_for_thread` | query one flag |

use std::ffi::{CStr, c_char, c_int};

use rtcheck_core::{CheckFlags, ErrorMode};
use rtcheck_membrane::{config, thread_state};

use crate::reporter;

#[unsafe(no_mangle)]
pub extern "C" fn rtc_realtime_enter() {
    thread_state::enter_realtime();
}

#[unsafe(no_mangle)]
pub extern "C" fn rtc_realtime_exit() {
    thread_state::exit_realtime();
}

/// Aborts the process if the thread is not in a real-time region.
#[unsafe(no_mangle)]
pub extern "C" fn rtc_non_realtime_enter() {
    assert!(
        thread_state::is_realtime(),
        "rtc_non_realtime_enter called outside of a real-time region"
    );
    thread_state::exit_realtime();
}

#[unsafe(no_mangle)]
pub extern "C" fn rtc_non_realtime_exit() {
    thread_state::enter_realtime();
}

#[unsafe(no_mangle)]
pub extern "C" fn rtc_is_realtime_context() -> bool {
    thread_state::is_realtime()
}

/// Report `name` as a violation if the calling thread is real-time.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn rtc_log_function_if_realtime_context(name: *const c_char) {
    if name.is_null() {
        reporter::log_function_if_realtime_context("<null>");
        return;
    }
    // SAFETY: the caller passes a NUL-terminated string.
    let name = unsafe { CStr::from_ptr(name) };
    reporter::log_function_if_realtime_context(name.to_str().unwrap_or("<non-utf8>"));
}

#[unsafe(no_mangle)]
pub extern "C" fn rtc_set_error_mode(mode: c_int) {
    config::set_error_mode(error_mode_from_c(mode));
}

#[unsafe(no_mangle)]
pub extern "C" fn rtc_get_error_mode() -> c_int {
    c_int::from(config::error_mode().as_raw())
}

#[unsafe(no_mangle)]
pub extern "C" fn rtc_disable_checks_for_thread(mask: u64) {
    thread_state::disable_checks(CheckFlags::from_bits(mask));
}

/// Aborts the process unless exactly one bit of `flag` is set.
#[unsafe(no_mangle)]
pub extern "C" fn rtc_is_check_enabled_for_thread(flag: u64) -> bool {
    thread_state::is_check_enabled(CheckFlags::from_bits(flag))
}

fn error_mode_from_c(mode: c_int) -> ErrorMode {
    u8::try_from(mode).map_or(ErrorMode::Exit, ErrorMode::from_raw)
}
