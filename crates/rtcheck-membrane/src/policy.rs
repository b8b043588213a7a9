//! The reporting decision shared by every intercepted call.

use rtcheck_core::CheckFlags;

use crate::{config, thread_state};

/// True when a call to the function behind `flag` must be reported: the
/// checker is initialized, the thread is real-time and `flag` is not disabled
/// for the thread.
#[inline]
#[must_use]
pub fn should_report(flag: CheckFlags) -> bool {
    if !config::is_initialized() {
        return false;
    }
    thread_state::with_current(|state| {
        state.is_realtime() && flag.is_enabled_under(state.disabled())
    })
}

/// Decision for calls that carry no check flag, such as user-flagged
/// functions. The disabled mask does not apply.
#[inline]
#[must_use]
pub fn should_report_unflagged() -> bool {
    config::is_initialized() && thread_state::is_realtime()
}
