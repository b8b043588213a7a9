//! Scope guards marking real-time regions.
//!
//! Neither guard can be cloned or sent to another thread: the state it flips
//! belongs to the thread that created it.

use std::marker::PhantomData;

use crate::thread_state;

/// Marks the calling thread real-time until dropped.
#[must_use = "the thread leaves the real-time region when the guard is dropped"]
pub struct RealtimeContext {
    _not_send: PhantomData<*const ()>,
}

impl RealtimeContext {
    pub fn new() -> Self {
        thread_state::enter_realtime();
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
        thread_state::exit_realtime();
    }
}

/// Suspends checking inside a real-time region until dropped.
#[must_use = "checking resumes when the guard is dropped"]
pub struct NonRealtimeContext {
    _not_send: PhantomData<*const ()>,
}

impl NonRealtimeContext {
    /// # Panics
    ///
    /// Panics if the calling thread is not inside a real-time region.
    pub fn new() -> Self {
        assert!(
            thread_state::is_realtime(),
            "NonRealtimeContext used outside of a real-time region"
        );
        thread_state::exit_realtime();
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Drop for NonRealtimeContext {
    fn drop(&mut self) {
        thread_state::enter_realtime();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::thread_state::is_realtime;

    #[test]
    fn realtime_guard_brackets_region() {
        std::thread::spawn(|| {
            assert!(!is_realtime());
            {
                let _rt = RealtimeContext::new();
                assert!(is_realtime());
            }
            assert!(!is_realtime());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn non_realtime_guard_suspends_and_resumes() {
        std::thread::spawn(|| {
            let _rt = RealtimeContext::new();
            {
                let _nrt = NonRealtimeContext::new();
                assert!(!is_realtime());
            }
            assert!(is_realtime());
        })
        .join()
        .unwrap();
    }

    #[test]
    fn non_realtime_guard_outside_region_panics() {
        let outcome = std::thread::spawn(|| {
            let _nrt = NonRealtimeContext::new();
        })
        .join();
        assert!(outcome.is_err());
    }
}
