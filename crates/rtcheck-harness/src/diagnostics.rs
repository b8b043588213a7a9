//! Violation reports recovered from a scenario's stderr.

use serde::Serialize;

use rtcheck_core::report::{ParsedViolation, parse_violations};

/// One reported violation with a stable fingerprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub function: String,
    pub frames: Vec<String>,
    /// Short blake3 digest of the function and its frames. Two runs hitting
    /// the same call site produce the same fingerprint.
    pub fingerprint: String,
}

impl From<ParsedViolation> for Violation {
    fn from(parsed: ParsedViolation) -> Self {
        let fingerprint = fingerprint(&parsed.function, &parsed.frames);
        Self {
            function: parsed.function,
            frames: parsed.frames,
            fingerprint,
        }
    }
}

fn fingerprint(function: &str, frames: &[String]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(function.as_bytes());
    for frame in frames {
        hasher.update(b"\n");
        hasher.update(frame.as_bytes());
    }
    hasher.finalize().to_hex()[..16].to_string()
}

/// Every violation in `stderr`, in report order.
#[must_use]
pub fn collect(stderr: &str) -> Vec<Violation> {
    parse_violations(stderr).into_iter().map(Violation::from).collect()
}

/// Reported function names, in report order.
#[must_use]
pub fn functions(violations: &[Violation]) -> Vec<&str> {
    violations.iter().map(|v| v.function.as_str()).collect()
}

/// True when a frame of `violation` mentions `needle`.
#[must_use]
pub fn mentions_frame(violation: &Violation, needle: &str) -> bool {
    violation.frames.iter().any(|frame| frame.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtcheck_core::report::render_violation;

    #[test]
    fn collects_rendered_reports() {
        let mut stderr = String::from("unrelated noise\n");
        stderr.push_str(&render_violation("nanosleep", &["scenario::main", "std::rt::lang_start"]));
        stderr.push_str(&render_violation("wrap_free", &["scenario::drop_it"]));

        let violations = collect(&stderr);
        assert_eq!(functions(&violations), ["nanosleep", "free"]);
        assert_eq!(violations[0].frames.len(), 2);
        assert!(mentions_frame(&violations[0], "lang_start"));
        assert!(!mentions_frame(&violations[1], "lang_start"));
    }

    #[test]
    fn fingerprint_tracks_call_site() {
        let a = collect(&render_violation("malloc", &["a", "b"]));
        let b = collect(&render_violation("malloc", &["a", "b"]));
        let c = collect(&render_violation("malloc", &["a", "c"]));
        assert_eq!(a[0].fingerprint, b[0].fingerprint);
        assert_ne!(a[0].fingerprint, c[0].fingerprint);
        assert_eq!(a[0].fingerprint.len(), 16);
    }
}
