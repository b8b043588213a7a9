//! Scenario catalog and verdicts.
//!
//! Each [`Scenario`] names a body implemented by the `scenario` binary and
//! the observable outcome of running it with the checker preloaded: exit
//! status, how many violations are reported and which functions they name.

use serde::Serialize;

use rtcheck_core::ErrorMode;

use crate::diagnostics::{Violation, functions, mentions_frame};
use crate::runner::ScenarioRun;

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub summary: &'static str,
    /// Value for `RTCHECK_ERROR_MODE`, if the scenario sets one.
    pub error_mode: Option<ErrorMode>,
    pub expected_exit: i32,
    pub min_violations: usize,
    pub max_violations: usize,
    /// At least one reported function must be one of these.
    pub functions: &'static [&'static str],
    /// Every reported function must be one of [`Scenario::functions`].
    pub exclusive: bool,
    /// The first reported function, when order matters.
    pub leading: Option<&'static str>,
    /// Stdout must match a run without the checker.
    pub compare_unpreloaded: bool,
}

const SLEEPERS: &[&str] = &["clock_nanosleep", "nanosleep", "sleep", "usleep"];
const FILE_QUERIES: &[&str] = &[
    "open", "open64", "openat", "openat64", "stat", "stat64", "fstat", "fstat64", "statx",
];

/// Frame prefix of the scenario binary's own code.
pub const CALLER_FRAME: &str = "scenario::";

/// Continue-mode scenario whose real-time region makes `count` calls, all to
/// `functions`.
#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
const fn leaf(
    name: &'static str,
    summary: &'static str,
    count: usize,
    functions: &'static [&'static str],
) -> Scenario {
    Scenario {
        name,
        summary,
        error_mode: Some(ErrorMode::Continue),
        expected_exit: 0,
        min_violations: count,
        max_violations: count,
        functions,
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    }
}

pub const SCENARIOS: &[Scenario] = &[
    Scenario {
        name: "mutex_then_sleep",
        summary: "uncontended mutex then sleep inside a real-time region",
        error_mode: None,
        expected_exit: 1,
        min_violations: 1,
        max_violations: 1,
        functions: SLEEPERS,
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    },
    Scenario {
        name: "memory_disabled",
        summary: "allocate, grow and free with memory checks disabled",
        error_mode: None,
        expected_exit: 0,
        min_violations: 0,
        max_violations: 0,
        functions: &[],
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    },
    Scenario {
        name: "contended_sleepers",
        summary: "two real-time threads sleep while holding a shared mutex",
        error_mode: Some(ErrorMode::Continue),
        expected_exit: 0,
        min_violations: 2,
        max_violations: usize::MAX,
        functions: SLEEPERS,
        exclusive: false,
        leading: None,
        compare_unpreloaded: false,
    },
    Scenario {
        name: "file_size",
        summary: "query a file's size inside a real-time region",
        error_mode: None,
        expected_exit: 1,
        min_violations: 1,
        max_violations: 1,
        functions: FILE_QUERIES,
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    },
    Scenario {
        name: "fcntl_getlk_continue",
        summary: "fcntl(F_GETLK) inside a real-time region in continue mode",
        error_mode: None,
        expected_exit: 0,
        min_violations: 1,
        max_violations: 1,
        functions: &["fcntl", "fcntl64"],
        exclusive: true,
        leading: None,
        compare_unpreloaded: true,
    },
    Scenario {
        name: "outside_realtime",
        summary: "allocate, lock and sleep with no real-time region",
        error_mode: None,
        expected_exit: 0,
        min_violations: 0,
        max_violations: 0,
        functions: &[],
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    },
    Scenario {
        name: "nested_non_realtime",
        summary: "sleep in a non-real-time carve-out, then allocate after it",
        error_mode: None,
        expected_exit: 1,
        min_violations: 1,
        max_violations: 1,
        functions: &["malloc"],
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    },
    Scenario {
        name: "user_flagged",
        summary: "flag a user function from inside a real-time region",
        error_mode: None,
        expected_exit: 1,
        min_violations: 1,
        max_violations: 1,
        functions: &["my_unsafe_fn"],
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    },
    Scenario {
        name: "partial_memory_disable",
        summary: "disable malloc only, then free a block",
        error_mode: None,
        expected_exit: 1,
        min_violations: 1,
        max_violations: 1,
        functions: &["free"],
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    },
    #[cfg(target_os = "linux")]
    leaf("leaf_calloc", "calloc inside a real-time region", 1, &["calloc"]),
    #[cfg(target_os = "linux")]
    leaf("leaf_realloc", "grow a heap block inside a real-time region", 1, &["realloc"]),
    #[cfg(target_os = "linux")]
    leaf("leaf_valloc", "valloc inside a real-time region", 1, &["valloc"]),
    #[cfg(target_os = "linux")]
    leaf(
        "leaf_posix_memalign",
        "posix_memalign inside a real-time region",
        1,
        &["posix_memalign"],
    ),
    #[cfg(target_os = "linux")]
    leaf("leaf_mmap", "map an anonymous page inside a real-time region", 1, &["mmap"]),
    #[cfg(target_os = "linux")]
    leaf("leaf_munmap", "unmap a page inside a real-time region", 1, &["munmap"]),
    #[cfg(target_os = "linux")]
    Scenario {
        name: "leaf_pthread_create",
        summary: "start and join a thread inside a real-time region",
        error_mode: Some(ErrorMode::Continue),
        expected_exit: 0,
        // Thread setup may also reach the allocator.
        min_violations: 2,
        max_violations: usize::MAX,
        functions: &["pthread_join"],
        exclusive: false,
        leading: Some("pthread_create"),
        compare_unpreloaded: false,
    },
    #[cfg(target_os = "linux")]
    leaf(
        "leaf_pthread_mutex",
        "lock and unlock a mutex inside a real-time region",
        2,
        &["pthread_mutex_lock", "pthread_mutex_unlock"],
    ),
    #[cfg(target_os = "linux")]
    leaf(
        "leaf_pthread_cond",
        "signal, broadcast and time out on a condition variable",
        3,
        &["pthread_cond_signal", "pthread_cond_broadcast", "pthread_cond_timedwait"],
    ),
    #[cfg(target_os = "linux")]
    leaf(
        "leaf_pthread_rwlock",
        "rwlock lifecycle inside a real-time region",
        6,
        &[
            "pthread_rwlock_init",
            "pthread_rwlock_rdlock",
            "pthread_rwlock_wrlock",
            "pthread_rwlock_unlock",
            "pthread_rwlock_destroy",
        ],
    ),
    #[cfg(target_os = "linux")]
    leaf("leaf_pthread_spin", "take a spinlock inside a real-time region", 1, &["pthread_spin_lock"]),
    #[cfg(target_os = "linux")]
    Scenario {
        name: "leaf_fopen",
        summary: "open a stream inside a real-time region",
        error_mode: Some(ErrorMode::Continue),
        expected_exit: 0,
        // The C library allocates the FILE through malloc.
        min_violations: 1,
        max_violations: usize::MAX,
        functions: &["fopen", "malloc"],
        exclusive: true,
        leading: Some("fopen"),
        compare_unpreloaded: false,
    },
    #[cfg(target_os = "linux")]
    leaf("leaf_syscall", "raw getpid syscall inside a real-time region", 1, &["syscall"]),
    #[cfg(target_os = "linux")]
    leaf("leaf_futex", "futex wake through syscall inside a real-time region", 1, &["futex"]),
    #[cfg(target_os = "linux")]
    leaf("leaf_sched_yield", "yield the processor inside a real-time region", 1, &["sched_yield"]),
    #[cfg(target_os = "linux")]
    leaf("leaf_sleep", "sleep(0) inside a real-time region", 1, &["sleep"]),
    #[cfg(target_os = "linux")]
    leaf("leaf_usleep", "usleep inside a real-time region", 1, &["usleep"]),
    #[cfg(target_os = "linux")]
    leaf("leaf_nanosleep", "nanosleep inside a real-time region", 1, &["nanosleep"]),
    #[cfg(target_os = "linux")]
    leaf(
        "leaf_clock_nanosleep",
        "clock_nanosleep inside a real-time region",
        1,
        &["clock_nanosleep"],
    ),
    #[cfg(target_os = "linux")]
    Scenario {
        name: "leaves_outside_realtime",
        summary: "every leaf call with no real-time region",
        error_mode: None,
        expected_exit: 0,
        min_violations: 0,
        max_violations: 0,
        functions: &[],
        exclusive: true,
        leading: None,
        compare_unpreloaded: false,
    },
    #[cfg(target_os = "linux")]
    Scenario {
        name: "open_creat_mode",
        summary: "open(O_CREAT, 0644) inside a real-time region keeps the mode",
        error_mode: Some(ErrorMode::Continue),
        expected_exit: 0,
        min_violations: 1,
        max_violations: 1,
        functions: &["open", "open64"],
        exclusive: true,
        leading: None,
        compare_unpreloaded: true,
    },
];

#[must_use]
pub fn find(name: &str) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|s| s.name == name)
}

/// Outcome of checking one run against its scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub scenario: &'static str,
    pub passed: bool,
    pub failures: Vec<String>,
}

/// Check `run` against `scenario`. `baseline` is the same scenario run
/// without the checker, required when [`Scenario::compare_unpreloaded`] is
/// set.
#[must_use]
pub fn evaluate(scenario: &Scenario, run: &ScenarioRun, baseline: Option<&ScenarioRun>) -> Verdict {
    let mut failures = Vec::new();

    match run.exit_code {
        Some(code) if code == scenario.expected_exit => {}
        Some(code) => failures.push(format!(
            "exit status {code}, expected {}",
            scenario.expected_exit
        )),
        None => failures.push("terminated by a signal".to_string()),
    }

    check_violations(scenario, &run.violations, &mut failures);

    if scenario.compare_unpreloaded {
        match baseline {
            Some(base) if base.stdout == run.stdout => {}
            Some(base) => failures.push(format!(
                "stdout differs from unpreloaded run: {:?} vs {:?}",
                run.stdout, base.stdout
            )),
            None => failures.push("no unpreloaded run to compare against".to_string()),
        }
    }

    Verdict {
        scenario: scenario.name,
        passed: failures.is_empty(),
        failures,
    }
}

fn check_violations(scenario: &Scenario, violations: &[Violation], failures: &mut Vec<String>) {
    let reported = functions(violations);
    let count = reported.len();
    if count < scenario.min_violations || count > scenario.max_violations {
        let expected = if scenario.max_violations == usize::MAX {
            format!("at least {}", scenario.min_violations)
        } else if scenario.min_violations == scenario.max_violations {
            scenario.min_violations.to_string()
        } else {
            format!("{}..={}", scenario.min_violations, scenario.max_violations)
        };
        failures.push(format!(
            "{count} violation(s) reported {reported:?}, expected {expected}"
        ));
    }

    for violation in violations.iter().filter(|v| !mentions_frame(v, CALLER_FRAME)) {
        failures.push(format!(
            "report for {} has no {CALLER_FRAME} frame: {:?}",
            violation.function, violation.frames
        ));
    }
    if let Some(first) = scenario.leading
        && reported.first() != Some(&first)
    {
        failures.push(format!("first violation is {:?}, expected {first}", reported.first()));
    }

    if scenario.functions.is_empty() {
        return;
    }
    if !reported.iter().any(|f| scenario.functions.contains(f)) {
        failures.push(format!(
            "no violation names any of {:?}; got {reported:?}",
            scenario.functions
        ));
    }
    if scenario.exclusive {
        for function in reported.iter().filter(|f| !scenario.functions.contains(f)) {
            failures.push(format!("unexpected violation in {function}"));
        }
    }
}
