//! Per-thread real-time flag and disabled-check mask.
//!
//! The state is strictly thread-private. Its fields are atomics only so a
//! guard dropped from a signal handler cannot tear a half-written value;
//! `Relaxed` ordering is enough because no other thread ever reads them.
//!
//! Two backends:
//! - Linux: a `const`-initialized `thread_local!` of a type without `Drop`.
//!   It lives in the static TLS block, so first access never allocates.
//! - Apple: a pthread key whose value is allocated straight from the default
//!   malloc zone. Darwin's lazy TLV setup calls `malloc`, which is
//!   interposed, so `thread_local!` would recurse into itself on the first
//!   intercepted allocation of every thread.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use rtcheck_core::CheckFlags;

pub struct ThreadState {
    realtime: AtomicBool,
    disabled: AtomicU64,
}

impl ThreadState {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            realtime: AtomicBool::new(false),
            disabled: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn is_realtime(&self) -> bool {
        self.realtime.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn set_realtime(&self, realtime: bool) {
        self.realtime.store(realtime, Ordering::Relaxed);
    }

    #[inline]
    pub fn disabled(&self) -> CheckFlags {
        CheckFlags::from_bits(self.disabled.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn set_disabled(&self, flags: CheckFlags) {
        self.disabled.store(flags.bits(), Ordering::Relaxed);
    }
}

impl Default for ThreadState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(not(target_vendor = "apple"))]
mod backend {
    use super::ThreadState;

    thread_local! {
        static STATE: ThreadState = const { ThreadState::new() };
    }

    #[inline]
    pub(super) fn with_current<R>(f: impl FnOnce(&ThreadState) -> R) -> R {
        STATE.with(f)
    }
}

#[cfg(target_vendor = "apple")]
#[allow(unsafe_code)]
mod backend {
    use std::ffi::c_void;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::ThreadState;

    unsafe extern "C" {
        fn malloc_default_zone() -> *mut c_void;
        fn malloc_zone_malloc(zone: *mut c_void, size: libc::size_t) -> *mut c_void;
        fn malloc_zone_free(zone: *mut c_void, ptr: *mut c_void);
    }

    // 0 = no key yet, otherwise key + 1.
    static KEY: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn release(state: *mut c_void) {
        if !state.is_null() {
            // SAFETY: `state` was allocated from the default zone by `create`.
            unsafe { malloc_zone_free(malloc_default_zone(), state) };
        }
    }

    fn fatal(message: &[u8]) -> ! {
        // SAFETY: plain write of a static buffer, then abort.
        unsafe {
            libc::write(libc::STDERR_FILENO, message.as_ptr().cast(), message.len());
            libc::abort()
        }
    }

    fn key() -> libc::pthread_key_t {
        let cached = KEY.load(Ordering::Acquire);
        if cached != 0 {
            return (cached - 1) as libc::pthread_key_t;
        }
        let mut key: libc::pthread_key_t = 0;
        // SAFETY: `key` is a valid out-pointer and `release` matches the
        // destructor signature.
        if unsafe { libc::pthread_key_create(&mut key, Some(release)) } != 0 {
            fatal(b"rtcheck: pthread_key_create failed\n");
        }
        match KEY.compare_exchange(0, key as usize + 1, Ordering::AcqRel, Ordering::Acquire) {
            Ok(_) => key,
            Err(winner) => {
                // SAFETY: our key was never handed out.
                unsafe { libc::pthread_key_delete(key) };
                (winner - 1) as libc::pthread_key_t
            }
        }
    }

    fn create(key: libc::pthread_key_t) -> *mut ThreadState {
        // SAFETY: the default zone is always valid; the allocation is checked
        // for null before it is written.
        unsafe {
            let raw = malloc_zone_malloc(malloc_default_zone(), size_of::<ThreadState>())
                .cast::<ThreadState>();
            if raw.is_null() {
                fatal(b"rtcheck: cannot allocate thread state\n");
            }
            raw.write(ThreadState::new());
            if libc::pthread_setspecific(key, raw.cast()) != 0 {
                fatal(b"rtcheck: pthread_setspecific failed\n");
            }
            raw
        }
    }

    pub(super) fn with_current<R>(f: impl FnOnce(&ThreadState) -> R) -> R {
        let key = key();
        // SAFETY: the key is live for the whole process.
        let mut state = unsafe { libc::pthread_getspecific(key) }.cast::<ThreadState>();
        if state.is_null() {
            state = create(key);
        }
        // SAFETY: the value belongs to this thread and is freed only by the
        // key destructor after the thread has stopped running user code.
        f(unsafe { &*state })
    }
}

/// Run `f` with the calling thread's state, creating it on first use.
#[inline]
pub fn with_current<R>(f: impl FnOnce(&ThreadState) -> R) -> R {
    backend::with_current(f)
}

pub fn enter_realtime() {
    with_current(|state| state.set_realtime(true));
}

pub fn exit_realtime() {
    with_current(|state| state.set_realtime(false));
}

#[must_use]
pub fn is_realtime() -> bool {
    with_current(ThreadState::is_realtime)
}

/// Replace the calling thread's disabled mask. The previous mask is discarded,
/// not merged.
pub fn disable_checks(flags: CheckFlags) {
    with_current(|state| state.set_disabled(flags));
}

#[must_use]
pub fn disabled_checks() -> CheckFlags {
    with_current(ThreadState::disabled)
}

/// Whether `flag` is still checked on this thread.
///
/// # Panics
///
/// Panics unless `flag` has exactly one bit set.
#[must_use]
pub fn is_check_enabled(flag: CheckFlags) -> bool {
    assert!(
        flag.is_single(),
        "is_check_enabled requires a single check flag, got {flag:?}"
    );
    flag.is_enabled_under(disabled_checks())
}
