use std::ffi::c_void;

/// One `__interpose` entry: dyld binds references to `original` to
/// `replacement` in every image except the one that carries the entry.
#[repr(C)]
pub struct Substitution {
    replacement: *const c_void,
    original: *const c_void,
}

// SAFETY: both fields are immutable code addresses.
unsafe impl Sync for Substitution {}

impl Substitution {
    #[must_use]
    pub const fn new(replacement: *const c_void, original: *const c_void) -> Self {
        Self {
            replacement,
            original,
        }
    }
}

/// The functions wrappers substitute for. Calls from this image are not
/// rebound, so calling these reaches the system implementation.
#[allow(non_snake_case)]
pub mod original {
    pub use libc::*;

    use std::ffi::c_void;

    // Declared here to pin the exact signatures the wrappers use.
    unsafe extern "C" {
        pub fn valloc(size: size_t) -> *mut c_void;
        pub fn reallocf(ptr: *mut c_void, size: size_t) -> *mut c_void;
        pub fn OSSpinLockLock(lock: *mut i32);
        pub fn os_unfair_lock_lock(lock: *mut c_void);
        pub fn _os_nospin_lock_lock(lock: *mut c_void);
    }
}
