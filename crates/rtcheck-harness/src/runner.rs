//! Runs scenario bodies in a child process with the checker preloaded.

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

use rtcheck_membrane::config::ERROR_MODE_ENV;

use crate::diagnostics::{Violation, collect};
use crate::error::HarnessError;
use crate::scenario::Scenario;

/// Environment variable the loader reads to inject a library.
#[cfg(target_vendor = "apple")]
pub const PRELOAD_ENV: &str = "DYLD_INSERT_LIBRARIES";
#[cfg(not(target_vendor = "apple"))]
pub const PRELOAD_ENV: &str = "LD_PRELOAD";

/// File name of the built checker library on this platform.
#[must_use]
pub fn preload_file_name() -> String {
    format!("{DLL_PREFIX}rtcheck_abi{DLL_SUFFIX}")
}

/// Find the checker library. An explicit path wins; otherwise look next to
/// the scenario binary, in its `deps/` directory and one level up (where
/// test binaries live).
pub fn locate_preload(explicit: Option<&Path>, scenario_bin: &Path) -> Result<PathBuf, HarnessError> {
    let name = preload_file_name();
    let searched: Vec<PathBuf> = match explicit {
        Some(path) => vec![path.to_path_buf()],
        None => {
            let mut dirs = Vec::new();
            if let Some(dir) = scenario_bin.parent() {
                dirs.push(dir.to_path_buf());
                dirs.push(dir.join("deps"));
                if let Some(up) = dir.parent() {
                    dirs.push(up.to_path_buf());
                }
            }
            dirs.into_iter().map(|dir| dir.join(&name)).collect()
        }
    };
    searched
        .iter()
        .find(|candidate| candidate.is_file())
        .cloned()
        .ok_or(HarnessError::MissingPreload { name, searched })
}

/// Hex SHA-256 of a file.
pub fn sha256_file(path: &Path) -> Result<String, HarnessError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect())
}

/// What one child process did.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    /// `None` when the child was killed by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub violations: Vec<Violation>,
    pub duration: Duration,
}

impl ScenarioRun {
    #[must_use]
    pub fn from_output(
        exit_code: Option<i32>,
        stdout: String,
        stderr: String,
        duration: Duration,
    ) -> Self {
        let violations = collect(&stderr);
        Self {
            exit_code,
            stdout,
            stderr,
            violations,
            duration,
        }
    }
}

/// Launches the `scenario` binary, with or without the checker.
pub struct ScenarioRunner {
    pub scenario_bin: PathBuf,
    pub preload: PathBuf,
}

impl ScenarioRunner {
    pub fn new(scenario_bin: PathBuf, preload: PathBuf) -> Result<Self, HarnessError> {
        if !scenario_bin.is_file() {
            return Err(HarnessError::MissingScenarioBinary(scenario_bin));
        }
        Ok(Self {
            scenario_bin,
            preload,
        })
    }

    /// Run `scenario` with the checker preloaded.
    pub fn run(&self, scenario: &Scenario) -> Result<ScenarioRun, HarnessError> {
        let mut command = Command::new(&self.scenario_bin);
        command.arg(scenario.name).env(PRELOAD_ENV, &self.preload);
        match scenario.error_mode {
            Some(mode) => command.env(ERROR_MODE_ENV, mode.name()),
            None => command.env_remove(ERROR_MODE_ENV),
        };
        execute(command)
    }

    /// Run `scenario` without the checker, for output comparison.
    pub fn run_unpreloaded(&self, scenario: &Scenario) -> Result<ScenarioRun, HarnessError> {
        let mut command = Command::new(&self.scenario_bin);
        command
            .arg(scenario.name)
            .env_remove(PRELOAD_ENV)
            .env_remove(ERROR_MODE_ENV);
        execute(command)
    }
}

fn execute(mut command: Command) -> Result<ScenarioRun, HarnessError> {
    let started = Instant::now();
    let output = command.output()?;
    let duration = started.elapsed();
    Ok(ScenarioRun::from_output(
        output.status.code(),
        String::from_utf8_lossy(&output.stdout).into_owned(),
        String::from_utf8_lossy(&output.stderr).into_owned(),
        duration,
    ))
}
