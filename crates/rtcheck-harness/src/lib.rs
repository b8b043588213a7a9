//! Scenario harness for rtcheck.
//!
//! This crate provides:
//! - A catalog of scenario programs with their expected outcome under the
//!   preloaded checker (`scenario`)
//! - A runner that launches the `scenario` binary with the library injected
//!   and captures what it reports (`runner`)
//! - Parsing and fingerprinting of violation reports (`diagnostics`)
//! - JSONL run logs (`structured_log`)

#![forbid(unsafe_code)]

pub mod diagnostics;
pub mod error;
pub mod runner;
pub mod scenario;
pub mod structured_log;

pub use error::HarnessError;
pub use runner::{ScenarioRun, ScenarioRunner};
pub use scenario::{SCENARIOS, Scenario, Verdict};
