use std::ffi::{c_char, c_void};
use std::marker::PhantomData;
use std::mem;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

use crate::bootstrap::ResolveScope;

/// The next definition of a symbol after this library, resolved on first use.
///
/// Concurrent first calls may each run `dlsym`; they all store the same
/// address.
pub struct NextSymbol<F> {
    name: &'static str,
    ptr: AtomicPtr<c_void>,
    _fn: PhantomData<F>,
}

// SAFETY: only an atomic pointer and a static name are shared.
unsafe impl<F> Sync for NextSymbol<F> {}

impl<F: Copy> NextSymbol<F> {
    /// `name` must be NUL-terminated.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            ptr: AtomicPtr::new(ptr::null_mut()),
            _fn: PhantomData,
        }
    }

    /// The real function. Aborts the process if it cannot be found.
    #[inline]
    pub fn get(&self) -> F {
        const { assert!(mem::size_of::<F>() == mem::size_of::<*mut c_void>()) };
        let mut raw = self.ptr.load(Ordering::Acquire);
        if raw.is_null() {
            raw = self.resolve();
        }
        // SAFETY: `raw` is the non-null address of `name`, whose signature the
        // caller states through `F`.
        unsafe { mem::transmute_copy::<*mut c_void, F>(&raw) }
    }

    #[cold]
    fn resolve(&self) -> *mut c_void {
        debug_assert!(self.name.ends_with('\0'));
        let _scope = ResolveScope::enter();
        // SAFETY: `name` is a NUL-terminated static string.
        let raw = unsafe { libc::dlsym(libc::RTLD_NEXT, self.name.as_ptr().cast::<c_char>()) };
        if raw.is_null() {
            unresolvable(self.name);
        }
        self.ptr.store(raw, Ordering::Release);
        raw
    }
}

/// No real implementation to forward to. Only raw `write(2)` here: the symbol
/// that failed may be the allocator.
#[cold]
fn unresolvable(name: &str) -> ! {
    let name = name.trim_end_matches('\0');
    let parts: [&[u8]; 3] = [
        b"rtcheck: cannot resolve the real implementation of ",
        name.as_bytes(),
        b"\n",
    ];
    for part in parts {
        // SAFETY: writes a valid buffer to stderr.
        unsafe { libc::write(libc::STDERR_FILENO, part.as_ptr().cast(), part.len()) };
    }
    // SAFETY: terminates the process.
    unsafe { libc::abort() }
}

#[cfg(test)]
mod tests {
    use super::*;

    type StrlenFn = unsafe extern "C" fn(*const c_char) -> usize;

    #[test]
    fn resolves_and_caches_next_definition() {
        static STRLEN: NextSymbol<StrlenFn> = NextSymbol::new("strlen\0");
        let first = STRLEN.get();
        let second = STRLEN.get();
        assert_eq!(first as usize, second as usize);
        let len = unsafe { first(c"real-time".as_ptr()) };
        assert_eq!(len, 9);
    }

    #[test]
    fn concurrent_first_resolution_agrees() {
        static GETPID: NextSymbol<unsafe extern "C" fn() -> libc::pid_t> =
            NextSymbol::new("getpid\0");
        let handles: Vec<_> = (0..4)
            .map(|_| std::thread::spawn(|| GETPID.get() as usize))
            .collect();
        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(unsafe { GETPID.get()() }, std::process::id() as libc::pid_t);
    }
}
