use std::error::Error as StdError;
use std::fmt;
use std::io;

use crate::cli::CliError;

/// Failures that stop the harness before or around a run.
///
/// Anything the module itself does once its entry point is running is a
/// [`RunOutcome`](crate::runtime::RunOutcome), not an error.
#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Cli(CliError),
    Config {
        message: String,
    },
    /// The engine rejected the module while compiling or instantiating it.
    Instantiate {
        message: String,
    },
    MissingImport {
        module: String,
        name: String,
    },
    UnsupportedImportKind {
        module: String,
        name: String,
        kind: &'static str,
    },
    ImportSignature {
        name: String,
        message: String,
    },
    /// The module defines a linear memory but neither imports nor exports
    /// one, so the host routines cannot see the bytes it operates on.
    UnexportedMemory,
    EntryPoint {
        message: String,
    },
    /// Writing the JSON run report failed.
    Report {
        message: String,
    },
}

/// Convenience result alias used across the harness.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn instantiate(message: impl Into<String>) -> Self {
        Self::Instantiate {
            message: message.into(),
        }
    }

    pub fn entry_point(message: impl Into<String>) -> Self {
        Self::EntryPoint {
            message: message.into(),
        }
    }

    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::Cli(err) => write!(f, "{err}"),
            Error::Config { message } => write!(f, "configuration error: {message}"),
            Error::Instantiate { message } => write!(f, "failed to instantiate module: {message}"),
            Error::MissingImport { module, name } => {
                write!(f, "module imports unknown function `{module}::{name}`")
            }
            Error::UnsupportedImportKind { module, name, kind } => {
                write!(f, "module imports {kind} `{module}::{name}`, which the host does not provide")
            }
            Error::ImportSignature { name, message } => {
                write!(f, "import `{name}` has an incompatible signature: {message}")
            }
            Error::UnexportedMemory => f.write_str(
                "module defines a linear memory without exporting it; host imports cannot reach it",
            ),
            Error::EntryPoint { message } => write!(f, "entry point error: {message}"),
            Error::Report { message } => write!(f, "failed to write run report: {message}"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Cli(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(error)
    }
}

impl From<CliError> for Error {
    fn from(error: CliError) -> Self {
        Error::Cli(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_variants() {
        let io_error = Error::from(io::Error::other("disk error"));
        assert_eq!(io_error.to_string(), "I/O error: disk error");

        let cli_error = Error::from(CliError::new("bad args"));
        assert_eq!(cli_error.to_string(), "bad args");

        let missing = Error::MissingImport {
            module: "env".into(),
            name: "fopen".into(),
        };
        assert_eq!(missing.to_string(), "module imports unknown function `env::fopen`");

        let kind = Error::UnsupportedImportKind {
            module: "env".into(),
            name: "__stack_pointer".into(),
            kind: "global",
        };
        assert!(kind.to_string().contains("global `env::__stack_pointer`"));

        assert!(
            Error::UnexportedMemory
                .to_string()
                .starts_with("module defines a linear memory without exporting it")
        );

        assert_eq!(
            Error::entry_point("export `main` not found").to_string(),
            "entry point error: export `main` not found"
        );
    }

    #[test]
    fn source_exposes_wrapped_errors() {
        let io_error = Error::from(io::Error::other("boom"));
        let source = io_error.source().expect("io source");
        assert!(source.downcast_ref::<io::Error>().is_some());

        let cli_error = Error::from(CliError::new("oops"));
        let source = cli_error.source().expect("cli source");
        assert!(source.downcast_ref::<CliError>().is_some());

        assert!(Error::config("pages").source().is_none());
    }
}
