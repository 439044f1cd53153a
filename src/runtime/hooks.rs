//! Termination protocol shared by the host imports and the harness.
//!
//! Host imports never unwind the module with a panic. They return a [`Signal`]
//! through the engine's error channel and the harness recovers it once the
//! entry point has unwound, so "the module asked to stop", "the module used a
//! capability the host does not provide" and "something else went wrong" stay
//! distinguishable all the way to the process exit status.

use std::fmt;

use serde::Serialize;

use super::memory::MemoryError;

/// Exit status a run starts with and reports when nothing overrides it.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status recorded by `abort`.
pub const EXIT_FAILURE: i32 = 1;

/// Process exit code reported when the module calls an unsupported import.
pub const UNSUPPORTED_IMPORT_EXIT_CODE: i32 = 3;

/// Process exit code reported for any other fault escaping the entry point.
pub const UNKNOWN_FAULT_EXIT_CODE: i32 = 4;

/// Which termination import stopped the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerminationKind {
    Abort,
    Exit,
}

/// Module-initiated stop together with the status it recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Termination {
    pub kind: TerminationKind,
    pub status: i32,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TerminationKind::Abort => f.write_str("abort()"),
            TerminationKind::Exit => write!(f, "exit({})", self.status),
        }
    }
}

/// Non-local outcome raised by a host import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Terminated(Termination),
    UnsupportedImport(String),
    Unknown(String),
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signal::Terminated(termination) => write!(f, "terminated with {termination}"),
            Signal::UnsupportedImport(name) => write!(f, "unsupported import: {name}"),
            Signal::Unknown(detail) => write!(f, "unknown fault: {detail}"),
        }
    }
}

impl std::error::Error for Signal {}

impl From<MemoryError> for Signal {
    fn from(err: MemoryError) -> Self {
        Signal::Unknown(err.to_string())
    }
}

/// Process-wide exit status of one run. Only the termination imports write it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitStatus(i32);

impl ExitStatus {
    #[must_use]
    pub const fn code(self) -> i32 {
        self.0
    }

    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == EXIT_SUCCESS
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self(EXIT_SUCCESS)
    }
}

/// Records [`EXIT_FAILURE`] and produces the matching termination signal.
pub fn abort(status: &mut ExitStatus) -> Signal {
    status.0 = EXIT_FAILURE;
    Signal::Terminated(Termination {
        kind: TerminationKind::Abort,
        status: EXIT_FAILURE,
    })
}

/// Records `code` and produces the matching termination signal.
pub fn exit(status: &mut ExitStatus, code: i32) -> Signal {
    status.0 = code;
    Signal::Terminated(Termination {
        kind: TerminationKind::Exit,
        status: code,
    })
}

/// Signal raised by every stubbed import.
#[must_use]
pub fn unsupported(name: &str) -> Signal {
    Signal::UnsupportedImport(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_starts_successful() {
        let status = ExitStatus::default();
        assert!(status.is_success());
        assert_eq!(status.code(), EXIT_SUCCESS);
    }

    #[test]
    fn abort_records_failure() {
        let mut status = ExitStatus::default();
        let signal = abort(&mut status);
        assert_eq!(status.code(), EXIT_FAILURE);
        assert_eq!(
            signal,
            Signal::Terminated(Termination {
                kind: TerminationKind::Abort,
                status: EXIT_FAILURE
            })
        );
        assert_eq!(signal.to_string(), "terminated with abort()");
    }

    #[test]
    fn exit_records_requested_code() {
        let mut status = ExitStatus::default();
        let signal = exit(&mut status, 7);
        assert_eq!(status.code(), 7);
        assert_eq!(signal.to_string(), "terminated with exit(7)");

        let _ = exit(&mut status, 0);
        assert!(status.is_success());
    }

    #[test]
    fn unsupported_carries_exact_name() {
        assert_eq!(
            unsupported("__builtin_malloc"),
            Signal::UnsupportedImport("__builtin_malloc".into())
        );
    }

    #[test]
    fn memory_errors_become_unknown_faults() {
        let signal = Signal::from(MemoryError::OutOfRange {
            addr: 0x10,
            len: 4,
            capacity: 8,
        });
        assert!(matches!(signal, Signal::Unknown(detail) if detail.contains("0x00000010")));
    }
}
