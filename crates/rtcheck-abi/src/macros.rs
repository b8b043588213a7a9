//! Helper macros for wrapper generation.
//!
//! `intercept!` turns one catalog line into a complete wrapper:
//!
//! ```ignore
//! intercept! {
//!     fn usleep(usec: c_uint) -> c_int => CheckFlags::USLEEP;
//! }
//! ```
//!
//! expands to a `pub unsafe extern "C" fn usleep` that reports a violation if
//! one is due, binds the real `usleep` and forwards the arguments untouched.
//! On lazy-resolution targets the wrapper is exported as `usleep`; on Apple it
//! stays private and an `__interpose` entry is emitted for it.

/// Name under which a wrapper reports itself.
#[allow(unused_macros)]
macro_rules! wrapper_name {
    ($name:ident) => {{
        #[cfg(target_vendor = "apple")]
        let name = concat!("wrap_", stringify!($name));
        #[cfg(not(target_vendor = "apple"))]
        let name = stringify!($name);
        name
    }};
}

/// The implementation `$name` replaces, as a `$ty` function pointer.
#[allow(unused_macros)]
macro_rules! real {
    ($name:ident : $ty:ty) => {{
        #[cfg(not(target_vendor = "apple"))]
        let real: $ty = {
            static NEXT: $crate::interpose::NextSymbol<$ty> =
                $crate::interpose::NextSymbol::new(concat!(stringify!($name), "\0"));
            NEXT.get()
        };
        #[cfg(target_vendor = "apple")]
        let real: $ty = $crate::interpose::original::$name;
        real
    }};
}

/// Emit the `__interpose` entry for wrapper `$name` on Apple; nothing elsewhere.
#[allow(unused_macros)]
macro_rules! substitute {
    ($name:ident) => {
        #[cfg(target_vendor = "apple")]
        const _: () = {
            #[used]
            #[unsafe(link_section = "__DATA,__interpose")]
            static SUBSTITUTION: $crate::interpose::Substitution =
                $crate::interpose::Substitution::new(
                    $name as *const ::std::ffi::c_void,
                    $crate::interpose::original::$name as *const ::std::ffi::c_void,
                );
        };
    };
}

/// Generate check-then-forward wrappers for non-variadic functions.
#[allow(unused_macros)]
macro_rules! intercept {
    ($(
        fn $name:ident( $($arg:ident : $argty:ty),* $(,)? ) $(-> $ret:ty)? => $flag:expr;
    )*) => {$(
        #[cfg_attr(not(target_vendor = "apple"), unsafe(no_mangle))]
        pub unsafe extern "C" fn $name( $($arg : $argty),* ) $(-> $ret)? {
            $crate::reporter::report_if_violating($flag, wrapper_name!($name));
            let real = real!($name: unsafe extern "C" fn($($argty),*) $(-> $ret)?);
            // SAFETY: the caller's arguments are forwarded unchanged to the
            // function this wrapper stands in for.
            unsafe { real($($arg),*) }
        }

        substitute!($name);
    )*};
}
