//! CLI entrypoint for the rtcheck scenario harness.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::json;

use rtcheck_harness::runner::{self, ScenarioRunner};
use rtcheck_harness::scenario::{self, SCENARIOS, Scenario};
use rtcheck_harness::structured_log::{self, LogEmitter, LogLevel, Outcome};
use rtcheck_harness::HarnessError;

/// Scenario runner for the rtcheck preload library.
#[derive(Debug, Parser)]
#[command(name = "rtcheck-harness")]
#[command(about = "Run rtcheck scenarios with the checker preloaded")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the scenario catalog.
    List,
    /// Run scenarios and compare their outcome with the catalog.
    Run {
        /// Checker library to preload (default: next to the scenario binary).
        #[arg(long)]
        preload: Option<PathBuf>,
        /// Scenario binary (default: `scenario` next to this executable).
        #[arg(long)]
        scenario_bin: Option<PathBuf>,
        /// Run only the named scenario; repeatable.
        #[arg(long)]
        only: Vec<String>,
        /// Write a JSONL run log here.
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

fn default_scenario_bin() -> Result<PathBuf, HarnessError> {
    let exe = std::env::current_exe()?;
    let name = format!("scenario{}", std::env::consts::EXE_SUFFIX);
    Ok(exe.with_file_name(name))
}

fn select(only: &[String]) -> Result<Vec<&'static Scenario>, HarnessError> {
    if only.is_empty() {
        return Ok(SCENARIOS.iter().collect());
    }
    only.iter()
        .map(|name| scenario::find(name).ok_or_else(|| HarnessError::UnknownScenario(name.clone())))
        .collect()
}

/// Re-read a written run log and reject it if any line breaks the schema.
fn check_log(path: &Path) -> Result<(), HarnessError> {
    let text = std::fs::read_to_string(path)?;
    match structured_log::validate_log(&text) {
        Ok(entries) => {
            eprintln!("log {} ({entries} entries)", path.display());
            Ok(())
        }
        Err(errors) => Err(HarnessError::InvalidLog {
            path: path.to_path_buf(),
            first: errors.first().map(ToString::to_string).unwrap_or_default(),
            count: errors.len(),
        }),
    }
}

fn run(
    preload: Option<PathBuf>,
    scenario_bin: Option<PathBuf>,
    only: &[String],
    log: Option<PathBuf>,
) -> Result<bool, HarnessError> {
    let selected = select(only)?;
    let scenario_bin = match scenario_bin {
        Some(path) => path,
        None => default_scenario_bin()?,
    };
    let preload = runner::locate_preload(preload.as_deref(), &scenario_bin)?;
    let runner = ScenarioRunner::new(scenario_bin, preload)?;
    let digest = runner::sha256_file(&runner.preload)?;

    let run_id = format!("rtcheck-{}", std::process::id());
    let mut emitter = log
        .as_deref()
        .map(|path| LogEmitter::to_file(path, &run_id))
        .transpose()?;

    if let Some(emitter) = emitter.as_mut() {
        let header = emitter.entry(LogLevel::Info, "run_start").with_details(json!({
            "preload": runner.preload.display().to_string(),
            "preload_sha256": digest,
            "scenario_bin": runner.scenario_bin.display().to_string(),
            "scenarios": selected.len(),
        }));
        emitter.emit(&header)?;
    }
    eprintln!(
        "preload {} (sha256 {})",
        runner.preload.display(),
        &digest[..16]
    );

    let mut failed = 0usize;
    for scenario in &selected {
        let preloaded = runner.run(scenario)?;
        let baseline = if scenario.compare_unpreloaded {
            Some(runner.run_unpreloaded(scenario)?)
        } else {
            None
        };
        let verdict = scenario::evaluate(scenario, &preloaded, baseline.as_ref());

        if verdict.passed {
            println!("PASS {}", scenario.name);
        } else {
            failed += 1;
            println!("FAIL {}", scenario.name);
            for failure in &verdict.failures {
                println!("     {failure}");
            }
        }

        if let Some(emitter) = emitter.as_mut() {
            for violation in &preloaded.violations {
                let entry = emitter
                    .entry(LogLevel::Debug, "violation")
                    .with_scenario(scenario.name)
                    .with_symbol(violation.function.as_str())
                    .with_details(json!({
                        "fingerprint": violation.fingerprint,
                        "frames": violation.frames,
                    }));
                emitter.emit(&entry)?;
            }
            let (level, outcome) = if verdict.passed {
                (LogLevel::Info, Outcome::Pass)
            } else {
                (LogLevel::Error, Outcome::Fail)
            };
            let duration_ms = u64::try_from(preloaded.duration.as_millis()).unwrap_or(u64::MAX);
            let entry = emitter
                .entry(level, "scenario_result")
                .with_scenario(scenario.name)
                .with_outcome(outcome)
                .with_exit_code(preloaded.exit_code)
                .with_duration_ms(duration_ms)
                .with_details(json!({ "failures": verdict.failures }));
            emitter.emit(&entry)?;
        }
    }

    if let Some(emitter) = emitter.as_mut() {
        let level = if failed == 0 { LogLevel::Info } else { LogLevel::Error };
        let footer = emitter.entry(level, "run_end").with_details(json!({
            "passed": selected.len() - failed,
            "failed": failed,
        }));
        emitter.emit(&footer)?;
        emitter.flush()?;
    }
    if let Some(path) = log.as_deref() {
        check_log(path)?;
    }

    println!("{} passed, {failed} failed", selected.len() - failed);
    Ok(failed == 0)
}

fn main() -> Result<ExitCode, HarnessError> {
    let cli = Cli::parse();

    match cli.command {
        Command::List => {
            for scenario in SCENARIOS {
                println!("{:<24} {}", scenario.name, scenario.summary);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Run {
            preload,
            scenario_bin,
            only,
            log,
        } => {
            let all_passed = run(preload, scenario_bin, &only, log)?;
            Ok(if all_passed {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
