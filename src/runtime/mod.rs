//! Host environment a module runs against: linear memory, the import table,
//! the C-style primitives behind it, and the per-run state they mutate.

mod bridge;
pub mod context;
pub mod hooks;
pub mod imports;
pub mod memory;
pub mod options;
pub mod outcome;
pub mod output;
pub mod primitives;

pub(crate) use bridge::bind_import;
pub use context::HostContext;
pub use hooks::{ExitStatus, Signal, Termination, TerminationKind};
pub use imports::{HostImport, ImportEntry, ImportTable, UNSUPPORTED_IMPORTS};
pub use memory::{AddressableMemory, DEFAULT_HEAP_PAGES, MemoryError, WASM_PAGE_SIZE};
pub use options::{DEFAULT_ENTRY, HostOptions};
pub use outcome::{Fault, RunOutcome, RunReport, process_exit_code};
pub use output::{ConsoleMode, OutputBuffer};
