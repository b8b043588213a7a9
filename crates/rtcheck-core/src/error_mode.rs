//! Process-wide reaction to a violation.
//!
//! - `exit` (default): the diagnostic is printed and the process exits with
//!   status 1.
//! - `continue`: the diagnostic is printed and the intercepted call proceeds.

/// What happens after a violation has been reported.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorMode {
    /// Report, then terminate the process with exit status 1.
    #[default]
    Exit = 0,
    /// Report, then let the intercepted call proceed.
    Continue = 1,
}

impl ErrorMode {
    /// Parse from string (case-insensitive). Unknown values fall back to `Exit`.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "continue" | "cont" | "log" | "warn" => Self::Continue,
            "exit" | "abort" | "fatal" => Self::Exit,
            _ => Self::Exit,
        }
    }

    /// Integer form used across the C boundary.
    #[must_use]
    pub const fn as_raw(self) -> u8 {
        self as u8
    }

    /// Inverse of [`ErrorMode::as_raw`]. Anything but `1` is `Exit`.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Continue,
            _ => Self::Exit,
        }
    }

    #[must_use]
    pub const fn terminates(self) -> bool {
        matches!(self, Self::Exit)
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exit => "exit",
            Self::Continue => "continue",
        }
    }
}

impl std::fmt::Display for ErrorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_modes() {
        assert_eq!(ErrorMode::from_str_loose("exit"), ErrorMode::Exit);
        assert_eq!(ErrorMode::from_str_loose("EXIT"), ErrorMode::Exit);
        assert_eq!(ErrorMode::from_str_loose("abort"), ErrorMode::Exit);
        assert_eq!(ErrorMode::from_str_loose("continue"), ErrorMode::Continue);
        assert_eq!(ErrorMode::from_str_loose(" Continue\n"), ErrorMode::Continue);
        assert_eq!(ErrorMode::from_str_loose("log"), ErrorMode::Continue);
        assert_eq!(ErrorMode::from_str_loose("bogus"), ErrorMode::Exit);
        assert_eq!(ErrorMode::from_str_loose(""), ErrorMode::Exit);
    }

    #[test]
    fn default_is_exit() {
        assert_eq!(ErrorMode::default(), ErrorMode::Exit);
        assert!(ErrorMode::default().terminates());
        assert!(!ErrorMode::Continue.terminates());
    }

    #[test]
    fn raw_round_trip_and_unknown_values() {
        assert_eq!(ErrorMode::from_raw(ErrorMode::Exit.as_raw()), ErrorMode::Exit);
        assert_eq!(
            ErrorMode::from_raw(ErrorMode::Continue.as_raw()),
            ErrorMode::Continue
        );
        assert_eq!(ErrorMode::from_raw(7), ErrorMode::Exit);
        assert_eq!(ErrorMode::from_raw(u8::MAX), ErrorMode::Exit);
    }
}
