//! Buffered console output for module-visible character streams.
//!
//! Characters emitted by the module accumulate in an [`OutputBuffer`] and only
//! surface when a diagnostic flushes them together with its own message, so a
//! diagnostic never interleaves with half-written module output.

use std::io::{self, Write};

/// Destination for flushed output units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleMode {
    /// Each unit is written to stdout as one line.
    #[default]
    Stdout,
    /// Units are retained in memory for the caller to inspect.
    Capture,
}

#[derive(Debug, Default)]
pub struct OutputBuffer {
    pending: String,
    mode: ConsoleMode,
    captured: Vec<String>,
}

impl OutputBuffer {
    #[must_use]
    pub fn new(mode: ConsoleMode) -> Self {
        Self {
            pending: String::new(),
            mode,
            captured: Vec::new(),
        }
    }

    /// Appends the character whose code point is `byte`.
    pub fn push_byte(&mut self, byte: u8) {
        self.pending.push(char::from(byte));
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.pending.extend(bytes.iter().copied().map(char::from));
    }

    pub fn push_newline(&mut self) {
        self.pending.push('\n');
    }

    #[must_use]
    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Emits the pending characters followed by `message` as one unit and
    /// clears the buffer. Returns the emitted unit.
    pub fn flush(&mut self, message: &str) -> String {
        let mut unit = std::mem::take(&mut self.pending);
        unit.push_str(message);
        match self.mode {
            ConsoleMode::Stdout => {
                if let Err(err) = write_unit(&mut io::stdout().lock(), &unit) {
                    tracing::warn!(
                        target: "host.output",
                        error = %err,
                        unit = %unit,
                        "failed to write output unit to stdout"
                    );
                }
            }
            ConsoleMode::Capture => self.captured.push(unit.clone()),
        }
        unit
    }

    #[must_use]
    pub fn into_captured(self) -> Vec<String> {
        self.captured
    }
}

/// Writes one unit as a line and flushes, so a unit is never left half
/// written in the process buffer.
fn write_unit(out: &mut impl Write, unit: &str) -> io::Result<()> {
    writeln!(out, "{unit}")?;
    out.flush()
}
