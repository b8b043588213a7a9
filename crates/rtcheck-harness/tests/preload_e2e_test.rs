//! Runs every scenario with the built checker library preloaded.
//!
//! Skips when the library has not been built (`cargo build -p rtcheck-abi`).

#![cfg(unix)]

use std::path::PathBuf;

use rtcheck_harness::runner::{ScenarioRunner, locate_preload};
use rtcheck_harness::scenario::{SCENARIOS, evaluate, find};

fn runner() -> Option<ScenarioRunner> {
    let scenario_bin = PathBuf::from(env!("CARGO_BIN_EXE_scenario"));
    let explicit = std::env::var_os("RTCHECK_PRELOAD").map(PathBuf::from);
    match locate_preload(explicit.as_deref(), &scenario_bin) {
        Ok(preload) => Some(ScenarioRunner::new(scenario_bin, preload).unwrap()),
        Err(err) => {
            eprintln!("skipping preload scenarios: {err}");
            None
        }
    }
}

#[test]
fn scenarios_match_catalog() {
    let Some(runner) = runner() else { return };

    let mut failures = Vec::new();
    for scenario in SCENARIOS {
        let run = runner.run(scenario).unwrap();
        let baseline = scenario
            .compare_unpreloaded
            .then(|| runner.run_unpreloaded(scenario).unwrap());
        let verdict = evaluate(scenario, &run, baseline.as_ref());
        if !verdict.passed {
            failures.push(format!(
                "{}: {:?}\nstderr:\n{}",
                scenario.name, verdict.failures, run.stderr
            ));
        }
    }
    assert!(failures.is_empty(), "{}", failures.join("\n"));
}

#[test]
fn report_names_the_scenario_frame() {
    let Some(runner) = runner() else { return };

    let run = runner.run(find("user_flagged").unwrap()).unwrap();
    assert_eq!(run.exit_code, Some(1));
    let violation = &run.violations[0];
    assert_eq!(violation.function, "my_unsafe_fn");
    assert!(
        !violation.frames.iter().any(|f| f.starts_with("backtrace::")),
        "checker frames leaked into {:?}",
        violation.frames
    );
}

#[test]
fn bodies_run_clean_without_the_checker() {
    let Some(runner) = runner() else { return };

    for scenario in SCENARIOS {
        let run = runner.run_unpreloaded(scenario).unwrap();
        assert_eq!(run.exit_code, Some(0), "{}: {}", scenario.name, run.stderr);
        assert!(run.violations.is_empty(), "{}", scenario.name);
    }
}
