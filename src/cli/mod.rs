//! Command-line parsing for the `wasmshell` binary.

pub mod dispatch;

use std::error::Error as StdError;
use std::fmt::{self, Write as _};
use std::path::PathBuf;

use crate::logging::{LogFormat, LogLevel, LogSettings};
use crate::runtime::{ConsoleMode, HostOptions};

/// Parsed invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cli {
    pub command: Command,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Run(RunArgs),
    Help,
    Version,
}

/// Everything needed to run one module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunArgs {
    pub module: PathBuf,
    /// Arguments after the module path. Accepted for compatibility with
    /// runners that forward them; the module never sees them.
    pub args: Vec<String>,
    pub options: HostOptions,
    /// Where to write the JSON run report.
    pub report: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    message: String,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn with_usage(message: impl Into<String>) -> Self {
        let mut owned = message.into();
        owned.push_str("\n\n");
        owned.push_str(&Cli::usage());
        Self::new(owned)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl StdError for CliError {}

struct OptionGuide {
    flag: &'static str,
    description: &'static str,
}

const OPTIONS: &[OptionGuide] = &[
    OptionGuide {
        flag: "--entry <name>",
        description: "Export to invoke (default: main).",
    },
    OptionGuide {
        flag: "--heap-pages <n>",
        description: "Pages of 64 KiB linear memory per run (default: 16).",
    },
    OptionGuide {
        flag: "--stub-unknown-imports",
        description: "Bind unknown function imports to faulting stubs instead of refusing the module.",
    },
    OptionGuide {
        flag: "--report <path>",
        description: "Write the run report as JSON to <path>.",
    },
    OptionGuide {
        flag: "--log-level <level>",
        description: "error, warn, info, debug or trace (env: WASMSHELL_LOG_LEVEL).",
    },
    OptionGuide {
        flag: "--log-format <format>",
        description: "auto, text or json (env: WASMSHELL_LOG_FORMAT).",
    },
    OptionGuide {
        flag: "-h, --help",
        description: "Show this help.",
    },
    OptionGuide {
        flag: "-V, --version",
        description: "Print version information.",
    },
];

impl Cli {
    /// Parse arguments from an iterator (useful for testing).
    ///
    /// Options are read up to the module path; everything after it is kept
    /// verbatim in [`RunArgs::args`].
    ///
    /// # Errors
    /// Returns a [`CliError`] when an option is unknown, lacks its value, or
    /// no module path is given.
    pub fn parse_from<I, T>(args: I) -> Result<Self, CliError>
    where
        I: Iterator<Item = T>,
        T: Into<String>,
    {
        let mut iter = args.map(Into::into);
        let mut log = LogSettings::default();
        let mut options = HostOptions {
            console: ConsoleMode::Stdout,
            ..HostOptions::default()
        };
        let mut report = None;
        let mut module = None;

        while let Some(arg) = iter.next() {
            if arg == "--" {
                module = iter.next();
                break;
            }
            if !arg.starts_with('-') {
                module = Some(arg);
                break;
            }
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) if flag.starts_with("--") => {
                    (flag.to_string(), Some(value.to_string()))
                }
                _ => (arg, None),
            };
            let mut value = |name: &str| -> Result<String, CliError> {
                inline
                    .clone()
                    .or_else(|| iter.next())
                    .ok_or_else(|| CliError::with_usage(format!("expected value after {name}")))
            };
            match flag.as_str() {
                "-h" | "--help" => {
                    return Ok(Cli {
                        command: Command::Help,
                        log,
                    });
                }
                "-V" | "--version" => {
                    return Ok(Cli {
                        command: Command::Version,
                        log,
                    });
                }
                "--entry" => options.entry = value("--entry")?,
                "--heap-pages" => {
                    let raw = value("--heap-pages")?;
                    options.heap_pages = raw.parse().map_err(|_| {
                        CliError::with_usage(format!("invalid page count '{raw}' for --heap-pages"))
                    })?;
                }
                "--stub-unknown-imports" => options.stub_unknown_imports = true,
                "--report" => report = Some(PathBuf::from(value("--report")?)),
                "--log-level" => {
                    let raw = value("--log-level")?;
                    let level = LogLevel::parse(&raw).ok_or_else(|| {
                        CliError::with_usage(format!("unsupported log level '{raw}'"))
                    })?;
                    log.level = Some(level);
                }
                "--log-format" => {
                    let raw = value("--log-format")?;
                    let format = LogFormat::parse(&raw).ok_or_else(|| {
                        CliError::with_usage(format!("unsupported log format '{raw}'"))
                    })?;
                    log.format = Some(format);
                }
                _ => {
                    return Err(CliError::with_usage(format!("unsupported option '{flag}'")));
                }
            }
        }

        let Some(module) = module else {
            return Err(CliError::with_usage("missing module path"));
        };
        Ok(Cli {
            command: Command::Run(RunArgs {
                module: PathBuf::from(module),
                args: iter.collect(),
                options,
                report,
            }),
            log,
        })
    }

    /// Return formatted general help text.
    #[must_use]
    pub fn usage() -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "wasmshell {}\nRun a WebAssembly module against a minimal C-style host.\n",
            env!("CARGO_PKG_VERSION")
        );
        let _ = writeln!(out, "Usage: wasmshell [OPTIONS] <MODULE> [ARGS...]\n");
        let _ = writeln!(out, "Options:");
        let width = OPTIONS.iter().map(|guide| guide.flag.len()).max().unwrap_or(0);
        for guide in OPTIONS {
            let _ = writeln!(out, "  {:<width$}  {}", guide.flag, guide.description);
        }
        let _ = writeln!(out, "\nExit status:");
        let _ = writeln!(out, "  0    main returned, or the module called exit(0)");
        let _ = writeln!(out, "  1    the module called abort(), or the module could not be run");
        let _ = writeln!(out, "  N    the module called exit(N)");
        let _ = writeln!(out, "  3    the module called an unsupported import");
        let _ = write!(out, "  4    the module trapped or faulted otherwise");
        out
    }

    #[must_use]
    pub fn version() -> String {
        format!("wasmshell {}", env!("CARGO_PKG_VERSION"))
    }
}
