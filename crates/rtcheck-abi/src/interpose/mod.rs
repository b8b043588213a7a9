//! Binding wrappers to the implementations they replace.
//!
//! - Lazy resolution (everything but Apple): wrappers are exported under the
//!   original names and reach the real function through [`NextSymbol`], a
//!   `dlsym(RTLD_NEXT)` lookup cached on first use.
//! - Link-time substitution (Apple): wrappers stay private and a
//!   [`Substitution`] pair per function is emitted into `__DATA,__interpose`.
//!   dyld rebinds every other image's references; calls made from this image
//!   still reach the original, so the real function is simply `original::name`.
//!
//! The `real!` and `substitute!` macros pick the strategy, so wrapper bodies are
//! written once for both.

#[cfg(not(target_vendor = "apple"))]
mod next_symbol;
#[cfg(not(target_vendor = "apple"))]
pub use next_symbol::NextSymbol;

#[cfg(target_vendor = "apple")]
mod darwin;
#[cfg(target_vendor = "apple")]
pub use darwin::{Substitution, original};
