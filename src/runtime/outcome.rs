use serde::Serialize;
use wasmtime::Trap;

use super::hooks::{
    EXIT_FAILURE, EXIT_SUCCESS, ExitStatus, Signal, Termination, UNKNOWN_FAULT_EXIT_CODE,
    UNSUPPORTED_IMPORT_EXIT_CODE,
};

/// Failure that was not the module's own decision to stop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Fault {
    UnsupportedImport { name: String },
    Unknown { detail: String },
}

/// Terminal state of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "kebab-case")]
pub enum RunOutcome {
    /// The entry point returned.
    Completed,
    /// `abort` or `exit` stopped the module.
    Terminated(Termination),
    Faulted { fault: Fault },
}

impl RunOutcome {
    #[must_use]
    pub fn from_signal(signal: Signal) -> Self {
        match signal {
            Signal::Terminated(termination) => RunOutcome::Terminated(termination),
            Signal::UnsupportedImport(name) => RunOutcome::Faulted {
                fault: Fault::UnsupportedImport { name },
            },
            Signal::Unknown(detail) => RunOutcome::Faulted {
                fault: Fault::Unknown { detail },
            },
        }
    }

    /// Classifies whatever unwound out of the module.
    ///
    /// Host signals are recovered from the engine error; traps and anything
    /// else become [`Fault::Unknown`] with the engine's description.
    #[must_use]
    pub fn from_error(error: &wasmtime::Error) -> Self {
        if let Some(signal) = error.downcast_ref::<Signal>() {
            return Self::from_signal(signal.clone());
        }
        let detail = match error.downcast_ref::<Trap>() {
            Some(trap) => trap.to_string(),
            None => format!("{error:#}"),
        };
        Self::from_signal(Signal::Unknown(detail))
    }

    #[must_use]
    pub fn from_call(result: wasmtime::Result<()>) -> Self {
        match result {
            Ok(()) => RunOutcome::Completed,
            Err(error) => Self::from_error(&error),
        }
    }

    /// Message flushed once the run reaches this state.
    #[must_use]
    pub fn diagnostic(&self) -> String {
        match self {
            RunOutcome::Completed => "Program terminated normally.".to_string(),
            RunOutcome::Terminated(termination) => {
                format!("Program terminated with: Terminating wasm: {termination}")
            }
            RunOutcome::Faulted {
                fault: Fault::UnsupportedImport { name },
            } => format!("Not yet implemented: {name}"),
            RunOutcome::Faulted {
                fault: Fault::Unknown { detail },
            } => format!("Unknown exception: {detail}"),
        }
    }

    /// Exit code the run reports. Faults fail regardless of `status`.
    #[must_use]
    pub fn exit_code(&self, status: ExitStatus) -> i32 {
        match self {
            RunOutcome::Completed | RunOutcome::Terminated(_) => status.code(),
            RunOutcome::Faulted {
                fault: Fault::UnsupportedImport { .. },
            } => UNSUPPORTED_IMPORT_EXIT_CODE,
            RunOutcome::Faulted {
                fault: Fault::Unknown { .. },
            } => UNKNOWN_FAULT_EXIT_CODE,
        }
    }

    #[must_use]
    pub fn is_success(&self, status: ExitStatus) -> bool {
        self.exit_code(status) == EXIT_SUCCESS
    }

    #[must_use]
    pub fn state_name(&self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Terminated(_) => "terminated",
            RunOutcome::Faulted { .. } => "faulted",
        }
    }
}

/// Observable result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Final value of the run's exit status.
    pub exit_status: i32,
    /// Status the process reports for this run.
    pub exit_code: i32,
    /// Flushed output units, when the console was captured.
    pub output: Vec<String>,
}

impl RunReport {
    #[must_use]
    pub fn new(outcome: RunOutcome, status: ExitStatus, output: Vec<String>) -> Self {
        let exit_code = outcome.exit_code(status);
        Self {
            outcome,
            exit_status: status.code(),
            exit_code,
            output,
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == EXIT_SUCCESS
    }

    /// Exit code narrowed to what a process can report. A nonzero code never
    /// narrows to success.
    #[must_use]
    pub fn process_exit_code(&self) -> u8 {
        process_exit_code(self.exit_code)
    }
}

/// Low eight bits of `code`, or [`EXIT_FAILURE`] if a nonzero code would
/// otherwise truncate to zero.
#[must_use]
pub fn process_exit_code(code: i32) -> u8 {
    let low = code.to_le_bytes()[0];
    if low == 0 && code != EXIT_SUCCESS {
        EXIT_FAILURE.to_le_bytes()[0]
    } else {
        low
    }
}
