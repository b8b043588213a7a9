//! Apple-only wrappers: `reallocf` and the Darwin lock primitives.
//!
//! Newer libsystem routes `os_unfair_lock_lock` through `_os_nospin_lock_lock`;
//! both report under the unfair-lock flag.

#![allow(non_snake_case)]

use std::ffi::c_void;

use libc::size_t;
use rtcheck_core::CheckFlags;

intercept! {
    fn reallocf(ptr: *mut c_void, size: size_t) -> *mut c_void => CheckFlags::REALLOCF;
    fn OSSpinLockLock(lock: *mut i32) => CheckFlags::OS_SPIN_LOCK_LOCK;
    fn os_unfair_lock_lock(lock: *mut c_void) => CheckFlags::OS_UNFAIR_LOCK_LOCK;
    fn _os_nospin_lock_lock(lock: *mut c_void) => CheckFlags::OS_UNFAIR_LOCK_LOCK;
}
