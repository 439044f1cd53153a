//! Log configuration shared by the CLI and embedders.
//!
//! Events go to stderr so whatever the module prints on stdout stays
//! byte-for-byte intact.

use std::env;
use std::fmt;
use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt as subscriber_fmt};

/// Environment variable selecting the log format.
pub const LOG_FORMAT_ENV: &str = "WASMSHELL_LOG_FORMAT";
/// Environment variable selecting the log level.
pub const LOG_LEVEL_ENV: &str = "WASMSHELL_LOG_LEVEL";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Text for now; kept distinct so the CLI can tell "unset" from "text".
    Auto,
    Text,
    Json,
}

impl LogFormat {
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "auto" => Some(Self::Auto),
            "text" | "plain" | "compact" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LogFormat::Auto => "auto",
            LogFormat::Text => "text",
            LogFormat::Json => "json",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verbosity, ordered from quietest to noisiest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.trim().to_ascii_lowercase().as_str() {
            "error" | "err" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" | "verbose" => Some(Self::Trace),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    #[must_use]
    pub fn as_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective log configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogOptions {
    pub format: LogFormat,
    pub level: LogLevel,
}

impl LogOptions {
    pub const DEFAULT: Self = Self {
        format: LogFormat::Auto,
        level: LogLevel::Warn,
    };

    /// Defaults overridden by [`LOG_FORMAT_ENV`] and [`LOG_LEVEL_ENV`].
    /// Unparseable values are ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let format = env::var(LOG_FORMAT_ENV).ok();
        let level = env::var(LOG_LEVEL_ENV).ok();
        Self::DEFAULT.with_env_values(format.as_deref(), level.as_deref())
    }

    #[must_use]
    fn with_env_values(self, format: Option<&str>, level: Option<&str>) -> Self {
        Self {
            format: format.and_then(LogFormat::parse).unwrap_or(self.format),
            level: level.and_then(LogLevel::parse).unwrap_or(self.level),
        }
    }

    #[must_use]
    pub fn with_overrides(self, overrides: LogSettings) -> Self {
        Self {
            format: overrides.format.unwrap_or(self.format),
            level: overrides.level.unwrap_or(self.level),
        }
    }

    /// Level applied to every target `RUST_LOG` does not name.
    #[must_use]
    pub fn default_directive(self) -> LevelFilter {
        LevelFilter::from_level(self.level.as_tracing_level())
    }

    #[must_use]
    pub fn resolved(self) -> Self {
        let format = match self.format {
            LogFormat::Auto => LogFormat::Text,
            other => other,
        };
        Self { format, ..self }
    }
}

impl Default for LogOptions {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Overrides collected from command-line flags.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LogSettings {
    pub format: Option<LogFormat>,
    pub level: Option<LogLevel>,
}

impl LogSettings {
    /// Environment configuration with these flags applied on top.
    #[must_use]
    pub fn merged_with_env(self) -> LogOptions {
        LogOptions::from_env().with_overrides(self)
    }
}

/// Installs the global subscriber once per process. `RUST_LOG` directives
/// are layered over the configured level.
pub fn init(options: LogOptions) {
    static INITIALISED: OnceLock<()> = OnceLock::new();

    INITIALISED.get_or_init(|| {
        let options = options.resolved();
        let use_ansi = env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();
        let filter = EnvFilter::builder()
            .with_default_directive(options.default_directive().into())
            .from_env_lossy();
        let builder = subscriber_fmt::fmt()
            .with_env_filter(filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_thread_ids(false)
            .with_thread_names(false);
        // A subscriber installed by an embedder wins.
        let _ = match options.format {
            LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
            LogFormat::Text | LogFormat::Auto => {
                tracing::subscriber::set_global_default(builder.compact().finish())
            }
        };
    });
}
