//! # rtcheck
//!
//! Mark real-time regions in a Rust program checked by the rtcheck
//! interposition library.
//!
//! ```ignore
//! let _rt = rtcheck::RealtimeContext::new();
//! process_audio_block(&mut buffer); // any malloc, lock or sleep in here is reported
//! ```
//!
//! The library exports a small C API (`rtc_*`). This crate binds to it at run
//! time, so a program built with it runs unchanged without the checker: every
//! guard and call is then a no-op and queries report "not real-time".
//!
//! All symbols are resolved together the first time any of them is needed,
//! and always before a guard enters a real-time region, so the lookup's own
//! allocations are never reported.

use std::ffi::{CStr, c_char, c_int};
use std::marker::PhantomData;
use std::sync::OnceLock;

pub use rtcheck_core::{Category, CheckFlags, ErrorMode};

struct Api {
    realtime_enter: unsafe extern "C" fn(),
    realtime_exit: unsafe extern "C" fn(),
    non_realtime_enter: unsafe extern "C" fn(),
    non_realtime_exit: unsafe extern "C" fn(),
    is_realtime_context: unsafe extern "C" fn() -> bool,
    log_function_if_realtime_context: unsafe extern "C" fn(*const c_char),
    set_error_mode: unsafe extern "C" fn(c_int),
    get_error_mode: unsafe extern "C" fn() -> c_int,
    disable_checks_for_thread: unsafe extern "C" fn(u64),
    is_check_enabled_for_thread: unsafe extern "C" fn(u64) -> bool,
}

fn lookup(name: &CStr) -> Option<*mut libc::c_void> {
    // SAFETY: `name` is NUL-terminated; RTLD_DEFAULT searches the global scope.
    let raw = unsafe { libc::dlsym(libc::RTLD_DEFAULT, name.as_ptr()) };
    (!raw.is_null()).then_some(raw)
}

macro_rules! bind {
    ($name:literal) => {
        // SAFETY: the exported symbol has the signature of the field it fills.
        unsafe { std::mem::transmute::<*mut libc::c_void, _>(lookup($name)?) }
    };
}

impl Api {
    fn resolve() -> Option<Self> {
        Some(Self {
            realtime_enter: bind!(c"rtc_realtime_enter"),
            realtime_exit: bind!(c"rtc_realtime_exit"),
            non_realtime_enter: bind!(c"rtc_non_realtime_enter"),
            non_realtime_exit: bind!(c"rtc_non_realtime_exit"),
            is_realtime_context: bind!(c"rtc_is_realtime_context"),
            log_function_if_realtime_context: bind!(c"rtc_log_function_if_realtime_context"),
            set_error_mode: bind!(c"rtc_set_error_mode"),
            get_error_mode: bind!(c"rtc_get_error_mode"),
            disable_checks_for_thread: bind!(c"rtc_disable_checks_for_thread"),
            is_check_enabled_for_thread: bind!(c"rtc_is_check_enabled_for_thread"),
        })
    }
}

static API: OnceLock<Option<Api>> = OnceLock::new();

fn api() -> Option<&'static Api> {
    API.get_or_init(Api::resolve).as_ref()
}

/// True when the checker is loaded into this process.
#[must_use]
pub fn is_loaded() -> bool {
    api().is_some()
}

/// Marks the calling thread real-time until dropped.
#[must_use = "the thread leaves the real-time region when the guard is dropped"]
pub struct RealtimeContext {
    _not_send: PhantomData<*const ()>,
}

impl RealtimeContext {
    pub fn new() -> Self {
        if let Some(api) = api() {
            // SAFETY: exported by the loaded checker; takes no arguments.
            unsafe { (api.realtime_enter)() };
        }
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for RealtimeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RealtimeContext {
    fn drop(&mut self) {
        if let Some(api) = api() {
            // SAFETY: as in `new`.
            unsafe { (api.realtime_exit)() };
        }
    }
}

/// Suspends checking for a deliberately unsafe stretch of a real-time region.
#[must_use = "checking resumes when the guard is dropped"]
pub struct NonRealtimeContext {
    _not_send: PhantomData<*const ()>,
}

impl NonRealtimeContext {
    /// # Panics
    ///
    /// The checker aborts the process if the thread is not in a real-time
    /// region.
    pub fn new() -> Self {
        if let Some(api) = api() {
            // SAFETY: exported by the loaded checker; takes no arguments.
            unsafe { (api.non_realtime_enter)() };
        }
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for NonRealtimeContext {
    fn drop(&mut self) {
        if let Some(api) = api() {
            // SAFETY: as in `new`.
            unsafe { (api.non_realtime_exit)() };
        }
    }
}

#[must_use]
pub fn is_realtime_context() -> bool {
    // SAFETY: exported by the loaded checker; takes no arguments.
    api().is_some_and(|api| unsafe { (api.is_realtime_context)() })
}

/// Report `name` as a violation if called inside a real-time region. Takes a
/// `CStr` so flagging a function never allocates.
pub fn log_function_if_realtime_context(name: &CStr) {
    if let Some(api) = api() {
        // SAFETY: `name` is NUL-terminated and outlives the call.
        unsafe { (api.log_function_if_realtime_context)(name.as_ptr()) };
    }
}

pub fn set_error_mode(mode: ErrorMode) {
    if let Some(api) = api() {
        // SAFETY: exported by the loaded checker.
        unsafe { (api.set_error_mode)(c_int::from(mode.as_raw())) };
    }
}

/// The checker's error mode, or the default when it is not loaded.
#[must_use]
pub fn error_mode() -> ErrorMode {
    api().map_or(ErrorMode::default(), |api| {
        // SAFETY: exported by the loaded checker.
        let raw = unsafe { (api.get_error_mode)() };
        u8::try_from(raw).map_or(ErrorMode::Exit, ErrorMode::from_raw)
    })
}

/// Replace the calling thread's disabled checks with `flags`.
pub fn disable_checks_for_thread(flags: CheckFlags) {
    if let Some(api) = api() {
        // SAFETY: exported by the loaded checker.
        unsafe { (api.disable_checks_for_thread)(flags.bits()) };
    }
}

/// Whether the single check `flag` is active on this thread.
///
/// # Panics
///
/// Panics unless exactly one bit of `flag` is set.
#[must_use]
pub fn is_check_enabled_for_thread(flag: CheckFlags) -> bool {
    assert!(
        flag.is_single(),
        "is_check_enabled_for_thread requires a single check flag, got {flag:?}"
    );
    // SAFETY: exported by the loaded checker; `flag` has a single bit.
    api().is_none_or(|api| unsafe { (api.is_check_enabled_for_thread)(flag.bits()) })
}
