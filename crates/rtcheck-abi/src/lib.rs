#![feature(c_variadic)]
// Every exported wrapper takes the exact arguments of the function it stands
// in for; their contracts are those of the C library.
#![allow(clippy::missing_safety_doc)]
//! # rtcheck-abi
//!
//! The interposition library. Loaded ahead of the C library
//! (`LD_PRELOAD=librtcheck_abi.so`, or `DYLD_INSERT_LIBRARIES` on macOS), it
//! places a checking wrapper in front of every cataloged function:
//!
//! ```text
//! host call -> wrapper -> report_if_violating -> real implementation -> result
//! ```
//!
//! A call is a violation when the calling thread is inside a real-time region
//! and has not disabled the function's check flag. Violations print a stack
//! trace to stderr and, in the default `exit` mode, end the process with
//! status 1. The wrapper always forwards to the real function and returns its
//! result unchanged.

#[macro_use]
mod macros;

pub mod bootstrap;
pub mod interpose;
pub mod open_mode;
pub mod reporter;

pub mod api_abi;

// Gated behind cfg(not(test)): these export malloc, free, open, ... which
// would interpose the unit-test binary itself.
#[cfg(not(test))]
pub mod fs_abi;
#[cfg(not(test))]
pub mod malloc_abi;
#[cfg(not(test))]
pub mod pthread_abi;
#[cfg(not(test))]
pub mod sys_abi;
#[cfg(not(test))]
pub mod time_abi;

#[cfg(all(target_vendor = "apple", not(test)))]
pub mod darwin_abi;

#[cfg(not(test))]
mod startup_abi;

pub use rtcheck_core::{CheckFlags, ErrorMode};
