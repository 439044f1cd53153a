use crate::error::{Error, Result};

use super::memory::{DEFAULT_HEAP_PAGES, MAX_HEAP_PAGES, heap_size_bytes};
use super::output::ConsoleMode;

/// Name of the export invoked when none is configured.
pub const DEFAULT_ENTRY: &str = "main";

/// Settings for running a module under the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostOptions {
    /// Pages of linear memory allocated per run. The memory never grows.
    pub heap_pages: u32,
    /// Export invoked as the entry point.
    pub entry: String,
    /// Bind imports missing from the table to unsupported stubs rather than
    /// rejecting the module.
    pub stub_unknown_imports: bool,
    pub console: ConsoleMode,
}

impl HostOptions {
    /// Options for embedding and tests: flushed output is kept in memory.
    #[must_use]
    pub fn captured() -> Self {
        Self {
            console: ConsoleMode::Capture,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn heap_size_bytes(&self) -> usize {
        heap_size_bytes(self.heap_pages)
    }

    /// # Errors
    /// Returns [`Error::Config`] when the heap size or entry name is unusable.
    pub fn validate(&self) -> Result<()> {
        if self.heap_pages == 0 || self.heap_pages > MAX_HEAP_PAGES {
            return Err(Error::config(format!(
                "heap pages must be between 1 and {MAX_HEAP_PAGES}, found {}",
                self.heap_pages
            )));
        }
        if self.entry.is_empty() {
            return Err(Error::config("entry point name must not be empty"));
        }
        Ok(())
    }
}

impl Default for HostOptions {
    fn default() -> Self {
        Self {
            heap_pages: DEFAULT_HEAP_PAGES,
            entry: DEFAULT_ENTRY.to_string(),
            stub_unknown_imports: false,
            console: ConsoleMode::Stdout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_one_mebibyte_main_run() {
        let options = HostOptions::default();
        assert_eq!(options.heap_size_bytes(), 1 << 20);
        assert_eq!(options.entry, "main");
        assert!(!options.stub_unknown_imports);
        assert_eq!(options.console, ConsoleMode::Stdout);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_heap_and_entry() {
        let options = HostOptions {
            heap_pages: 0,
            ..HostOptions::default()
        };
        let err = options.validate().expect_err("zero pages");
        assert!(err.to_string().contains("heap pages"), "{err}");

        let options = HostOptions {
            entry: String::new(),
            ..HostOptions::captured()
        };
        assert!(options.validate().is_err());
    }
}
