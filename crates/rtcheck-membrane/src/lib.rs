//! Runtime state of the real-time checker.
//!
//! Everything an intercepted call consults before deciding to report lives
//! here, independent of how the call was intercepted:
//!
//! - **Thread state** (`thread_state`): per-thread real-time flag and disabled
//!   check mask. Creating it never calls the intercepted allocator.
//! - **Scope guards** (`guards`): `RealtimeContext` / `NonRealtimeContext`.
//! - **Configuration** (`config`): process-wide error mode, initialization
//!   flag and stack-depth limit, all atomics.
//! - **Policy** (`policy`): the single "should this call be reported" decision.

#![deny(unsafe_code)]

pub mod config;
pub mod guards;
pub mod policy;
pub mod thread_state;

pub use config::{error_mode, is_initialized, set_error_mode};
pub use guards::{NonRealtimeContext, RealtimeContext};
pub use policy::{should_report, should_report_unflagged};
pub use rtcheck_core::{CheckFlags, ErrorMode};
