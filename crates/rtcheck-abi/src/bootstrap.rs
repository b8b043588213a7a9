//! Allocation while the dynamic loader is resolving a symbol.
//!
//! `dlsym` may call `calloc`/`malloc` (glibc allocates its `dlerror` state on
//! first use). If the allocation wrapper is the one being resolved, that call
//! lands back in the same unresolved wrapper. While a thread is inside
//! [`ResolveScope`] the allocation wrappers serve requests from a fixed static
//! arena instead, so resolution never recurses into itself.
//!
//! Arena blocks are never reused. `free` of an arena block is a no-op and
//! `realloc` moves the contents to the real allocator.

use std::cell::UnsafeCell;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const ARENA_SIZE: usize = 64 * 1024;
const ALIGN: usize = 16;
// Each block is preceded by a header holding its usable size.
const HEADER: usize = ALIGN;

#[repr(C, align(16))]
struct Arena(UnsafeCell<[u8; ARENA_SIZE]>);

// SAFETY: disjoint blocks are handed out through the atomic bump cursor; no
// two callers ever receive overlapping bytes.
unsafe impl Sync for Arena {}

static ARENA: Arena = Arena(UnsafeCell::new([0; ARENA_SIZE]));
static CURSOR: AtomicUsize = AtomicUsize::new(0);

#[inline]
fn base() -> *mut u8 {
    ARENA.0.get().cast::<u8>()
}

const fn align_up(n: usize) -> Option<usize> {
    match n.checked_add(ALIGN - 1) {
        Some(v) => Some(v & !(ALIGN - 1)),
        None => None,
    }
}

/// Bump-allocate `size` bytes. Returns null once the arena is exhausted.
#[must_use]
pub fn alloc(size: usize) -> *mut c_void {
    let Some(needed) = align_up(size.max(1)).and_then(|n| n.checked_add(HEADER)) else {
        return ptr::null_mut();
    };
    let mut offset = CURSOR.load(Ordering::Relaxed);
    loop {
        let Some(end) = offset.checked_add(needed).filter(|end| *end <= ARENA_SIZE) else {
            return ptr::null_mut();
        };
        match CURSOR.compare_exchange_weak(offset, end, Ordering::AcqRel, Ordering::Relaxed) {
            Ok(_) => break,
            Err(current) => offset = current,
        }
    }
    // SAFETY: [offset, offset + needed) lies inside the arena and belongs to
    // this caller alone; the header slot is 16-aligned.
    unsafe {
        let block = base().add(offset);
        block.cast::<usize>().write(needed - HEADER);
        block.add(HEADER).cast()
    }
}

/// Arena counterpart of `calloc`. The arena starts zeroed and blocks are
/// never reused, so fresh blocks are already zero.
#[must_use]
pub fn alloc_zeroed(count: usize, size: usize) -> *mut c_void {
    match count.checked_mul(size) {
        Some(total) => alloc(total),
        None => ptr::null_mut(),
    }
}

/// True if `ptr` was handed out by [`alloc`].
#[inline]
#[must_use]
pub fn owns(ptr: *const c_void) -> bool {
    let start = base() as usize;
    let addr = ptr as usize;
    addr >= start + HEADER && addr < start + ARENA_SIZE
}

/// Usable size of an arena block.
///
/// # Safety
///
/// `ptr` must satisfy [`owns`].
#[must_use]
pub unsafe fn block_size(ptr: *const c_void) -> usize {
    // SAFETY: every arena block is preceded by its size header.
    unsafe { ptr.cast::<u8>().sub(HEADER).cast::<usize>().read() }
}

/// Copy an arena block into `fresh` (of `size` bytes) and return `fresh`.
///
/// # Safety
///
/// `old` must satisfy [`owns`]; `fresh` must be null or valid for `size`
/// bytes of writes.
pub unsafe fn migrate(old: *const c_void, fresh: *mut c_void, size: usize) -> *mut c_void {
    if !fresh.is_null() {
        // SAFETY: caller contract; the copy length is bounded by both blocks.
        unsafe {
            let len = block_size(old).min(size);
            ptr::copy_nonoverlapping(old.cast::<u8>(), fresh.cast::<u8>(), len);
        }
    }
    fresh
}

#[cfg(not(target_vendor = "apple"))]
thread_local! {
    static RESOLVING: std::cell::Cell<u32> = const { std::cell::Cell::new(0) };
}

/// Marks the calling thread as inside symbol resolution until dropped.
pub struct ResolveScope {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ResolveScope {
    #[must_use]
    pub fn enter() -> Self {
        #[cfg(not(target_vendor = "apple"))]
        RESOLVING.with(|depth| depth.set(depth.get() + 1));
        Self {
            _not_send: std::marker::PhantomData,
        }
    }
}

impl Drop for ResolveScope {
    fn drop(&mut self) {
        #[cfg(not(target_vendor = "apple"))]
        RESOLVING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// True while the calling thread is resolving a symbol. Always false where
/// symbols are bound at load time.
#[inline]
#[must_use]
pub fn is_resolving() -> bool {
    #[cfg(not(target_vendor = "apple"))]
    {
        RESOLVING.with(|depth| depth.get() > 0)
    }
    #[cfg(target_vendor = "apple")]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_aligned_disjoint_and_owned() {
        let a = alloc(3);
        let b = alloc(40);
        assert!(!a.is_null() && !b.is_null());
        assert_eq!(a as usize % ALIGN, 0);
        assert_eq!(b as usize % ALIGN, 0);
        assert!(owns(a) && owns(b));
        assert!(b as usize >= a as usize + 16 || a as usize >= b as usize + 48);
        unsafe {
            assert_eq!(block_size(a), 16);
            assert_eq!(block_size(b), 48);
        }
    }

    #[test]
    fn foreign_pointers_are_not_owned() {
        let boxed = Box::new(7u64);
        assert!(!owns((&*boxed as *const u64).cast()));
        assert!(!owns(ptr::null()));
    }

    #[test]
    fn zeroed_blocks_and_overflow() {
        let p = alloc_zeroed(4, 8).cast::<u8>();
        assert!(!p.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(p, 32) };
        assert!(bytes.iter().all(|b| *b == 0));
        assert!(alloc_zeroed(usize::MAX, 2).is_null());
        assert!(alloc(usize::MAX).is_null());
        assert!(alloc(ARENA_SIZE).is_null());
    }

    #[test]
    fn migrate_copies_the_smaller_length() {
        let old = alloc(8).cast::<u8>();
        unsafe { ptr::copy_nonoverlapping(b"arena!!!".as_ptr(), old, 8) };
        let mut fresh = vec![0u8; 32];
        let moved = unsafe { migrate(old.cast(), fresh.as_mut_ptr().cast(), fresh.len()) };
        assert_eq!(moved.cast::<u8>(), fresh.as_mut_ptr());
        assert_eq!(&fresh[..8], b"arena!!!");
        assert!(unsafe { migrate(old.cast(), ptr::null_mut(), 4) }.is_null());
    }

    #[cfg(not(target_vendor = "apple"))]
    #[test]
    fn resolve_scope_nests() {
        std::thread::spawn(|| {
            assert!(!is_resolving());
            {
                let _outer = ResolveScope::enter();
                {
                    let _inner = ResolveScope::enter();
                    assert!(is_resolving());
                }
                assert!(is_resolving());
            }
            assert!(!is_resolving());
        })
        .join()
        .unwrap();
    }
}
