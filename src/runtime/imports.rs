//! Name-keyed table of the functions a module may import from the host.
//!
//! Names resolve to an [`ImportEntry`] once, while the module is being linked.
//! Calls then dispatch on the [`HostImport`] identifier, never on the name.

use std::collections::BTreeMap;
use std::fmt;

/// Imports the host implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HostImport {
    Print,
    Abort,
    Exit,
    Memcpy,
    Mempcpy,
    Memset,
    Memcmp,
    Strchr,
    Strcmp,
    Strlen,
    Putchar,
    Puts,
}

impl HostImport {
    pub const ALL: [HostImport; 12] = [
        HostImport::Print,
        HostImport::Abort,
        HostImport::Exit,
        HostImport::Memcpy,
        HostImport::Mempcpy,
        HostImport::Memset,
        HostImport::Memcmp,
        HostImport::Strchr,
        HostImport::Strcmp,
        HostImport::Strlen,
        HostImport::Putchar,
        HostImport::Puts,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            HostImport::Print => "print",
            HostImport::Abort => "abort",
            HostImport::Exit => "exit",
            HostImport::Memcpy => "memcpy",
            HostImport::Mempcpy => "mempcpy",
            HostImport::Memset => "memset",
            HostImport::Memcmp => "memcmp",
            HostImport::Strchr => "strchr",
            HostImport::Strcmp => "strcmp",
            HostImport::Strlen => "strlen",
            HostImport::Putchar => "putchar",
            HostImport::Puts => "puts",
        }
    }

    /// Number of integer arguments the import consumes. `None` for `print`,
    /// which renders whatever the module passes.
    #[must_use]
    pub const fn arity(self) -> Option<usize> {
        match self {
            HostImport::Print => None,
            HostImport::Abort => Some(0),
            HostImport::Exit | HostImport::Strlen | HostImport::Putchar | HostImport::Puts => {
                Some(1)
            }
            HostImport::Strchr | HostImport::Strcmp => Some(2),
            HostImport::Memcpy | HostImport::Mempcpy | HostImport::Memset | HostImport::Memcmp => {
                Some(3)
            }
        }
    }

    /// Argument list used in diagnostics.
    #[must_use]
    pub const fn parameters(self) -> &'static str {
        match self {
            HostImport::Print => "(values...)",
            HostImport::Abort => "()",
            HostImport::Exit => "(code)",
            HostImport::Memcpy | HostImport::Mempcpy => "(dest, src, len)",
            HostImport::Memset => "(ptr, value, len)",
            HostImport::Memcmp => "(lhs, rhs, len)",
            HostImport::Strchr => "(str, ch)",
            HostImport::Strcmp => "(lhs, rhs)",
            HostImport::Strlen | HostImport::Puts => "(str)",
            HostImport::Putchar => "(ch)",
        }
    }
}

impl fmt::Display for HostImport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runtime-support routines the host deliberately does not emulate. Calling
/// any of them faults the run with the routine's name.
pub const UNSUPPORTED_IMPORTS: [&str; 41] = [
    // string routines beyond the implemented subset
    "strncpy",
    "strrchr",
    "strcpy",
    "strncmp",
    "isprint",
    // allocation
    "malloc",
    "__builtin_malloc",
    "free",
    "calloc",
    "mmap",
    // files, processes, signals
    "open",
    "printf",
    "sprintf",
    "signal",
    "getpid",
    // sorting
    "qsort",
    // non-local jumps
    "_setjmp",
    "longjmp",
    // variadic calls
    "__builtin_apply",
    "__builtin_apply_args",
    // extended-precision arithmetic
    "__addtf3",
    "__builtin_isinff",
    "__builtin_isinfl",
    "__divtf3",
    "__eqtf2",
    "__fixsfti",
    "__fixtfdi",
    "__fixtfsi",
    "__fixunstfdi",
    "__fixunstfsi",
    "__floatditf",
    "__floatsitf",
    "__floatunditf",
    "__floatunsitf",
    "__getf2",
    "__gttf2",
    "__lttf2",
    "__multf3",
    "__multi3",
    "__netf2",
    "__subtf3",
];

/// What a name in the table is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportEntry {
    Implemented(HostImport),
    Unsupported(String),
}

impl ImportEntry {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            ImportEntry::Implemented(_) => "implemented",
            ImportEntry::Unsupported(_) => "unsupported",
        }
    }
}

/// Immutable mapping from import name to host function.
#[derive(Debug, Clone)]
pub struct ImportTable {
    entries: BTreeMap<&'static str, ImportEntry>,
    stub_unknown: bool,
}

impl ImportTable {
    /// Table with every implemented import and every known stub.
    #[must_use]
    pub fn standard() -> Self {
        let implemented = HostImport::ALL
            .into_iter()
            .map(|import| (import.name(), ImportEntry::Implemented(import)));
        let stubs = UNSUPPORTED_IMPORTS
            .into_iter()
            .map(|name| (name, ImportEntry::Unsupported(name.to_string())));
        Self {
            entries: implemented.chain(stubs).collect(),
            stub_unknown: false,
        }
    }

    /// Binds names missing from the table to unsupported stubs instead of
    /// rejecting the module.
    #[must_use]
    pub fn with_unknown_stubs(mut self, enabled: bool) -> Self {
        self.stub_unknown = enabled;
        self
    }

    #[must_use]
    pub fn resolve(&self, name: &str) -> Option<ImportEntry> {
        match self.entries.get(name) {
            Some(entry) => Some(entry.clone()),
            None if self.stub_unknown => Some(ImportEntry::Unsupported(name.to_string())),
            None => None,
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

impl Default for ImportTable {
    fn default() -> Self {
        Self::standard()
    }
}
