//! # rtcheck-core
//!
//! Platform-neutral building blocks of the real-time safety checker.
//!
//! - [`CheckFlags`]: the closed catalog of intercepted functions, one bit per
//!   function, grouped into composite categories.
//! - [`ErrorMode`]: what happens after a violation has been reported.
//! - [`report`]: rendering of the violation diagnostic written to stderr.
//!
//! Nothing in this crate touches thread state or the dynamic loader; that lives
//! in `rtcheck-membrane` and `rtcheck-abi`.

pub mod check_flags;
pub mod error_mode;
pub mod report;

pub use check_flags::{Category, CheckFlags, Leaf, Platform};
pub use error_mode::ErrorMode;
