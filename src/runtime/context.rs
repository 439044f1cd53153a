use wasmtime::Memory;

use super::hooks::ExitStatus;
use super::output::{ConsoleMode, OutputBuffer};

/// Mutable state owned by one run: the bound linear memory, buffered output,
/// and the exit status. Lives inside the engine store and is torn down with it.
#[derive(Debug)]
pub struct HostContext {
    memory: Option<Memory>,
    output: OutputBuffer,
    exit_status: ExitStatus,
}

impl HostContext {
    #[must_use]
    pub fn new(console: ConsoleMode) -> Self {
        Self {
            memory: None,
            output: OutputBuffer::new(console),
            exit_status: ExitStatus::default(),
        }
    }

    /// Linear memory the primitives operate on, once the harness bound one.
    #[must_use]
    pub fn memory(&self) -> Option<Memory> {
        self.memory
    }

    pub(crate) fn bind_memory(&mut self, memory: Memory) {
        self.memory = Some(memory);
    }

    #[must_use]
    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut OutputBuffer {
        &mut self.output
    }

    #[must_use]
    pub fn exit_status(&self) -> ExitStatus {
        self.exit_status
    }

    pub fn exit_status_mut(&mut self) -> &mut ExitStatus {
        &mut self.exit_status
    }

    #[must_use]
    pub fn into_output(self) -> OutputBuffer {
        self.output
    }
}
