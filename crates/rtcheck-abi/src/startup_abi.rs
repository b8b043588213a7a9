//! Load-time constructor.
//!
//! Runs once when the loader maps the library, before the host's `main`.
//! Configuration is read first and the initialization flag published last:
//! until then every wrapper forwards without checking, which keeps runtime
//! startup and the environment lookup itself out of the reports.

use rtcheck_membrane::config;

extern "C" fn initialize() {
    config::apply_env_overrides();
    config::mark_initialized();
}

#[used]
#[cfg_attr(
    any(target_os = "linux", target_os = "android", target_os = "freebsd"),
    unsafe(link_section = ".init_array")
)]
#[cfg_attr(target_vendor = "apple", unsafe(link_section = "__DATA,__mod_init_func"))]
static INITIALIZE: extern "C" fn() = initialize;
