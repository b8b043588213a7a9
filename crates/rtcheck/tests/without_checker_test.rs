// These tests run without the interposition library loaded, where every
// binding must be inert.

use rtcheck::{CheckFlags, ErrorMode, NonRealtimeContext, RealtimeContext};

#[test]
fn checker_is_not_loaded_in_plain_test_binary() {
    assert!(!rtcheck::is_loaded());
}

#[test]
fn guards_are_no_ops() {
    let _rt = RealtimeContext::new();
    assert!(!rtcheck::is_realtime_context());
    let _nrt = NonRealtimeContext::new();
    assert!(!rtcheck::is_realtime_context());
}

#[test]
fn configuration_calls_are_inert() {
    rtcheck::set_error_mode(ErrorMode::Continue);
    assert_eq!(rtcheck::error_mode(), ErrorMode::Exit);
    rtcheck::disable_checks_for_thread(CheckFlags::ALL);
    assert!(rtcheck::is_check_enabled_for_thread(CheckFlags::MALLOC));
    rtcheck::log_function_if_realtime_context(c"never_reported");
}

#[test]
#[should_panic(expected = "single check flag")]
fn composite_query_is_still_rejected() {
    let _ = rtcheck::is_check_enabled_for_thread(CheckFlags::SLEEPING);
}
