//! Catalog-level properties of the scenario table.

use rtcheck_core::ErrorMode;
use rtcheck_harness::scenario::{SCENARIOS, find};

#[test]
fn every_scenario_has_a_consistent_expectation() {
    for s in SCENARIOS {
        assert!(s.min_violations <= s.max_violations, "{}", s.name);
        if s.max_violations == 0 {
            assert!(s.functions.is_empty(), "{} expects no report but names functions", s.name);
        } else {
            assert!(!s.functions.is_empty(), "{} expects reports but names no function", s.name);
        }
        if s.expected_exit == 1 {
            assert!(s.min_violations >= 1, "{} exits 1 without a violation", s.name);
        }
    }
}

#[test]
fn exit_mode_scenarios_stop_at_the_first_violation() {
    for s in SCENARIOS.iter().filter(|s| s.expected_exit == 1) {
        assert_eq!(s.max_violations, 1, "{}", s.name);
        assert_ne!(s.error_mode, Some(ErrorMode::Continue), "{}", s.name);
    }
}

#[test]
fn continue_scenarios_exit_cleanly() {
    let contended = find("contended_sleepers").unwrap();
    assert_eq!(contended.error_mode, Some(ErrorMode::Continue));
    assert_eq!(contended.expected_exit, 0);

    let getlk = find("fcntl_getlk_continue").unwrap();
    assert_eq!(getlk.expected_exit, 0);
    assert!(getlk.compare_unpreloaded);
}

#[test]
fn sleep_scenarios_cover_every_sleep_wrapper() {
    for name in ["mutex_then_sleep", "contended_sleepers"] {
        let s = find(name).unwrap();
        for sleeper in ["clock_nanosleep", "nanosleep", "sleep", "usleep"] {
            assert!(s.functions.contains(&sleeper), "{name} misses {sleeper}");
        }
    }
}

#[test]
fn leading_function_is_an_expected_report() {
    for s in SCENARIOS {
        if let Some(first) = s.leading {
            assert!(s.min_violations >= 1, "{}", s.name);
            assert!(
                s.functions.contains(&first) || !s.exclusive,
                "{} leads with {first} but rejects it",
                s.name
            );
        }
    }
}

#[cfg(target_os = "linux")]
#[test]
fn leaf_scenarios_continue_past_every_report() {
    let leaves: Vec<_> = SCENARIOS.iter().filter(|s| s.name.starts_with("leaf_")).collect();
    assert_eq!(leaves.len(), 19);
    for s in leaves {
        assert_eq!(s.error_mode, Some(ErrorMode::Continue), "{}", s.name);
        assert_eq!(s.expected_exit, 0, "{}", s.name);
        assert!(s.min_violations >= 1, "{}", s.name);
    }

    let mode = find("open_creat_mode").unwrap();
    assert!(mode.compare_unpreloaded);
    assert_eq!(mode.error_mode, Some(ErrorMode::Continue));
}

#[test]
fn catalog_covers_all_bodies() {
    let names: Vec<&str> = SCENARIOS.iter().map(|s| s.name).collect();
    let mut expected = vec![
        "mutex_then_sleep",
        "memory_disabled",
        "contended_sleepers",
        "file_size",
        "fcntl_getlk_continue",
        "outside_realtime",
        "nested_non_realtime",
        "user_flagged",
        "partial_memory_disable",
    ];
    if cfg!(target_os = "linux") {
        expected.extend([
            "leaf_calloc",
            "leaf_realloc",
            "leaf_valloc",
            "leaf_posix_memalign",
            "leaf_mmap",
            "leaf_munmap",
            "leaf_pthread_create",
            "leaf_pthread_mutex",
            "leaf_pthread_cond",
            "leaf_pthread_rwlock",
            "leaf_pthread_spin",
            "leaf_fopen",
            "leaf_syscall",
            "leaf_futex",
            "leaf_sched_yield",
            "leaf_sleep",
            "leaf_usleep",
            "leaf_nanosleep",
            "leaf_clock_nanosleep",
            "leaves_outside_realtime",
            "open_creat_mode",
        ]);
    }
    assert_eq!(names, expected);
}
