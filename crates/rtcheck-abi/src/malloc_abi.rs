//! Heap and mapping wrappers: `malloc`, `calloc`, `realloc`, `free`,
//! `valloc`, `posix_memalign`, `mmap`, `munmap`.
//!
//! `malloc`, `calloc`, `realloc` and `free` are written by hand: while the
//! calling thread is resolving a symbol they are served by the bootstrap arena
//! and never reach the (possibly unresolved) real allocator.

use std::ffi::{c_int, c_void};

use libc::{off_t, size_t};
use rtcheck_core::CheckFlags;

use crate::bootstrap;
use crate::reporter::report_if_violating;

type MallocFn = unsafe extern "C" fn(size_t) -> *mut c_void;

#[inline]
fn real_malloc() -> MallocFn {
    real!(malloc: MallocFn)
}

#[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
pub unsafe extern "C" fn malloc(size: size_t) -> *mut c_void {
    if bootstrap::is_resolving() {
        return bootstrap::alloc(size);
    }
    report_if_violating(CheckFlags::MALLOC, wrapper_name!(malloc));
    // SAFETY: forwards to the real allocator.
    unsafe { real_malloc()(size) }
}
substitute!(malloc);

#[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
pub unsafe extern "C" fn calloc(count: size_t, size: size_t) -> *mut c_void {
    if bootstrap::is_resolving() {
        return bootstrap::alloc_zeroed(count, size);
    }
    report_if_violating(CheckFlags::CALLOC, wrapper_name!(calloc));
    let real = real!(calloc: unsafe extern "C" fn(size_t, size_t) -> *mut c_void);
    // SAFETY: forwards to the real allocator.
    unsafe { real(count, size) }
}
substitute!(calloc);

#[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
pub unsafe extern "C" fn realloc(ptr: *mut c_void, size: size_t) -> *mut c_void {
    if bootstrap::owns(ptr) {
        let fresh = if bootstrap::is_resolving() {
            bootstrap::alloc(size)
        } else {
            // SAFETY: plain allocation from the real allocator.
            unsafe { real_malloc()(size) }
        };
        // SAFETY: `ptr` is an arena block; `fresh` is null or `size` bytes.
        return unsafe { bootstrap::migrate(ptr, fresh, size) };
    }
    if ptr.is_null() && bootstrap::is_resolving() {
        return bootstrap::alloc(size);
    }
    report_if_violating(CheckFlags::REALLOC, wrapper_name!(realloc));
    let real = real!(realloc: unsafe extern "C" fn(*mut c_void, size_t) -> *mut c_void);
    // SAFETY: forwards to the real allocator.
    unsafe { real(ptr, size) }
}
substitute!(realloc);

#[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
pub unsafe extern "C" fn free(ptr: *mut c_void) {
    if bootstrap::owns(ptr) {
        return;
    }
    if !ptr.is_null() {
        report_if_violating(CheckFlags::FREE, wrapper_name!(free));
    }
    let real = real!(free: unsafe extern "C" fn(*mut c_void));
    // SAFETY: forwards to the real allocator.
    unsafe { real(ptr) }
}
substitute!(free);

intercept! {
    fn valloc(size: size_t) -> *mut c_void => CheckFlags::VALLOC;
    fn posix_memalign(memptr: *mut *mut c_void, alignment: size_t, size: size_t) -> c_int
        => CheckFlags::POSIX_MEMALIGN;
    fn mmap(
        addr: *mut c_void,
        len: size_t,
        prot: c_int,
        flags: c_int,
        fd: c_int,
        offset: off_t,
    ) -> *mut c_void => CheckFlags::MMAP;
    fn munmap(addr: *mut c_void, len: size_t) -> c_int => CheckFlags::MUNMAP;
}
