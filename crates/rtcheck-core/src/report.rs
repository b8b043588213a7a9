//! Violation diagnostic text.
//!
//! The layout written to stderr is:
//!
//! ```text
//! Real-time violation: intercepted call to real-time unsafe function nanosleep in real-time context! Stack trace:
//! std::thread::sleep
//!  scenario::mutex_then_sleep
//!   scenario::main
//!
//! ```
//!
//! Frame `i` is indented by `i` spaces and the report ends with a blank line.
//! Rendering is pure so the runner can parse what the runtime prints.

/// Prefix carried by substitution wrappers on link-time interpose platforms.
pub const WRAPPER_PREFIX: &str = "wrap_";

pub const HEADER_PREFIX: &str = "Real-time violation: intercepted call to real-time unsafe function ";
pub const HEADER_SUFFIX: &str = " in real-time context! Stack trace:";

/// Frames produced by the checker's own machinery. They are dropped before
/// rendering so a trace starts near the violating call.
pub const INTERNAL_FRAME_PREFIXES: &[&str] = &[
    "backtrace::",
    "rustc_demangle::",
    "rtcheck_abi::reporter::report_if_violating",
    "rtcheck_abi::reporter::log_function_if_realtime_context",
    "rtcheck_abi::reporter::report_violation",
    "rtcheck_abi::reporter::capture_frames",
    "rtcheck_abi::reporter::frame_name",
];

/// Name of the intercepted function as the host program spelled it.
#[must_use]
pub fn original_name(symbol: &str) -> &str {
    symbol.strip_prefix(WRAPPER_PREFIX).unwrap_or(symbol)
}

#[must_use]
pub fn is_internal_frame(symbol: &str) -> bool {
    INTERNAL_FRAME_PREFIXES
        .iter()
        .any(|prefix| symbol.starts_with(prefix))
}

/// Strip loader decoration from a resolved frame symbol.
///
/// Handles glibc `backtrace_symbols` output (`bin(sym+0x1a) [0x55..]`),
/// Darwin output (`3   bin   0x0000000100003f1c sym + 28`), Rust symbol
/// hashes (`::h0123456789abcdef`) and trailing `+0x..` offsets. Anything else,
/// including demangled signatures with parentheses or brackets, passes through.
#[must_use]
pub fn tidy_frame(raw: &str) -> &str {
    let mut frame = raw.trim();
    if let Some(symbol) = glibc_symbol(frame).or_else(|| darwin_symbol(frame)) {
        frame = symbol;
    }
    if let Some((symbol, offset)) = frame.rsplit_once("+0x")
        && is_hex(offset)
        && !symbol.is_empty()
    {
        frame = symbol;
    }
    strip_rust_hash(frame.trim())
}

fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_hexdigit())
}

// `bin(sym+0x1a) [0x55d4c1a0b1c2]`
fn glibc_symbol(frame: &str) -> Option<&str> {
    let (head, addr) = frame.rsplit_once(" [")?;
    let addr = addr.strip_suffix(']')?.strip_prefix("0x")?;
    if !is_hex(addr) {
        return None;
    }
    let (_, inner) = head.strip_suffix(')')?.rsplit_once('(')?;
    let (symbol, offset) = inner.rsplit_once("+0x")?;
    (is_hex(offset) && !symbol.is_empty()).then_some(symbol)
}

// `3   bin   0x0000000100003f1c sym + 28`
fn darwin_symbol(frame: &str) -> Option<&str> {
    let (_, rest) = frame.split_once(" 0x")?;
    let (addr, symbol) = rest.split_once(' ')?;
    if !is_hex(addr) {
        return None;
    }
    let (symbol, offset) = symbol.trim_start().rsplit_once(" + ")?;
    let decimal = !offset.is_empty() && offset.bytes().all(|b| b.is_ascii_digit());
    (decimal && !symbol.is_empty()).then_some(symbol)
}

fn strip_rust_hash(symbol: &str) -> &str {
    match symbol.rfind("::h") {
        Some(at)
            if symbol.len() - at == 19
                && symbol[at + 3..].bytes().all(|b| b.is_ascii_hexdigit()) =>
        {
            &symbol[..at]
        }
        _ => symbol,
    }
}

/// First line of a diagnostic for `function`.
#[must_use]
pub fn header(function: &str) -> String {
    format!("{HEADER_PREFIX}{}{HEADER_SUFFIX}", original_name(function))
}

/// Full diagnostic for `function` with its captured frames.
#[must_use]
pub fn render_violation<S: AsRef<str>>(function: &str, frames: &[S]) -> String {
    let mut out = header(function);
    out.push('\n');
    for (depth, frame) in frames.iter().enumerate() {
        for _ in 0..depth {
            out.push(' ');
        }
        out.push_str(tidy_frame(frame.as_ref()));
        out.push('\n');
    }
    out.push('\n');
    out
}

/// One diagnostic recovered from captured stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedViolation {
    pub function: String,
    pub frames: Vec<String>,
}

/// Recover every diagnostic from a stderr capture. Unrelated lines between
/// reports are ignored.
#[must_use]
pub fn parse_violations(stderr: &str) -> Vec<ParsedViolation> {
    let mut found = Vec::new();
    let mut lines = stderr.lines().peekable();
    while let Some(line) = lines.next() {
        let Some(function) = line
            .find(HEADER_PREFIX)
            .map(|at| &line[at + HEADER_PREFIX.len()..])
            .and_then(|rest| rest.strip_suffix(HEADER_SUFFIX))
        else {
            continue;
        };
        let mut frames = Vec::new();
        while let Some(next) = lines.peek() {
            if next.trim().is_empty() || next.contains(HEADER_PREFIX) {
                break;
            }
            frames.push(next.trim().to_string());
            lines.next();
        }
        found.push(ParsedViolation {
            function: function.to_string(),
            frames,
        });
    }
    found
}
