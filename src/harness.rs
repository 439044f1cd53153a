//! Runs a module's entry point against a fresh host environment and
//! classifies how it stopped.

use std::fs;
use std::path::Path;
use std::time::Instant;

use wasmtime::{Engine, ExternType, Linker, Memory, MemoryType, Module, Store, Trap, Val};

use crate::error::{Error, Result};
use crate::runtime::{
    HostContext, HostOptions, ImportEntry, ImportTable, RunOutcome, RunReport, Signal, bind_import,
};

/// Owns the engine and import table shared by every run. Per-run state lives
/// in a [`HostContext`] built inside [`Harness::run_module`] and dropped with
/// the store when the run ends.
pub struct Harness {
    engine: Engine,
    options: HostOptions,
    imports: ImportTable,
}

impl Harness {
    /// # Errors
    /// Returns [`Error::Config`] when the options fail validation.
    pub fn new(options: HostOptions) -> Result<Self> {
        options.validate()?;
        let imports = ImportTable::standard().with_unknown_stubs(options.stub_unknown_imports);
        Ok(Self {
            engine: Engine::default(),
            options,
            imports,
        })
    }

    /// Reads a `.wasm` or `.wat` file and runs it.
    ///
    /// # Errors
    /// Returns [`Error::Io`] when the file cannot be read, otherwise as
    /// [`Harness::run_bytes`].
    pub fn run_file(&self, path: &Path) -> Result<RunReport> {
        let bytes = fs::read(path)?;
        tracing::debug!(
            target: "harness",
            stage = "harness.load",
            path = %path.display(),
            bytes = bytes.len()
        );
        self.run_bytes(&bytes)
    }

    /// # Errors
    /// Returns an error when the bytes do not compile, or as
    /// [`Harness::run_module`].
    pub fn run_bytes(&self, bytes: &[u8]) -> Result<RunReport> {
        let module = self.compile(bytes)?;
        self.run_module(&module)
    }

    /// Compiles binary or text module bytes against this harness's engine.
    ///
    /// # Errors
    /// Returns [`Error::Instantiate`] when the engine rejects the bytes.
    pub fn compile(&self, bytes: &[u8]) -> Result<Module> {
        Module::new(&self.engine, bytes).map_err(|err| Error::instantiate(format!("{err:#}")))
    }

    /// Runs the entry point of `module` once with freshly allocated state.
    ///
    /// Anything the module does after instantiation succeeds, including
    /// traps in its start function, is reported through the returned
    /// [`RunReport`] rather than as an error.
    ///
    /// # Errors
    /// Returns an error when the module cannot be linked against the host or
    /// its entry point is unusable.
    pub fn run_module(&self, module: &Module) -> Result<RunReport> {
        let started = Instant::now();
        tracing::info!(
            target: "harness",
            stage = "harness.run.start",
            entry = %self.options.entry,
            heap_pages = self.options.heap_pages,
            imports = module.imports().len()
        );

        let mut store = Store::new(&self.engine, HostContext::new(self.options.console));
        let pages = self.options.heap_pages;
        let heap = Memory::new(&mut store, MemoryType::new(pages, Some(pages)))
            .map_err(|err| Error::instantiate(format!("failed to allocate linear memory: {err:#}")))?;
        store.data_mut().bind_memory(heap);
        tracing::debug!(
            target: "harness",
            stage = "harness.memory",
            source = "host",
            bytes = self.options.heap_size_bytes()
        );

        let exported_memory = memory_binding(module)?;
        let linker = self.link(module, &mut store, heap)?;
        let instance = match linker.instantiate(&mut store, module) {
            Ok(instance) => instance,
            Err(err) if is_run_fault(&err) => {
                return Ok(finish(store, RunOutcome::from_error(&err), started));
            }
            Err(err) => return Err(Error::instantiate(format!("{err:#}"))),
        };

        if let Some(name) = &exported_memory {
            let Some(memory) = instance.get_memory(&mut store, name) else {
                return Err(Error::instantiate(format!("exported memory `{name}` is missing")));
            };
            store.data_mut().bind_memory(memory);
            tracing::debug!(
                target: "harness",
                stage = "harness.memory",
                source = "export",
                export = %name,
                bytes = memory.data_size(&store)
            );
        }

        let entry = &self.options.entry;
        let Some(export) = instance.get_export(&mut store, entry) else {
            return Err(Error::entry_point(format!("module does not export `{entry}`")));
        };
        let Some(func) = export.into_func() else {
            return Err(Error::entry_point(format!("export `{entry}` is not a function")));
        };
        let ty = func.ty(&store);
        let params = ty.params().len();
        if params != 0 {
            return Err(Error::entry_point(format!(
                "`{entry}` takes {params} parameter(s), expected none"
            )));
        }
        let mut results = vec![Val::I32(0); ty.results().len()];

        let outcome = RunOutcome::from_call(func.call(&mut store, &[], &mut results));
        Ok(finish(store, outcome, started))
    }

    fn link(
        &self,
        module: &Module,
        store: &mut Store<HostContext>,
        heap: Memory,
    ) -> Result<Linker<HostContext>> {
        let mut linker = Linker::new(&self.engine);
        linker.allow_shadowing(true);
        for import in module.imports() {
            let (module_name, name) = (import.module(), import.name());
            match import.ty() {
                ExternType::Memory(_) => {
                    linker
                        .define(&*store, module_name, name, heap)
                        .map_err(|err| Error::instantiate(format!("{err:#}")))?;
                    tracing::debug!(
                        target: "harness",
                        stage = "harness.link",
                        module = module_name,
                        import = name,
                        kind = "memory"
                    );
                }
                ExternType::Func(func_ty) => {
                    let Some(entry) = self.imports.resolve(name) else {
                        return Err(Error::MissingImport {
                            module: module_name.to_string(),
                            name: name.to_string(),
                        });
                    };
                    let stubbed = matches!(entry, ImportEntry::Unsupported(_))
                        && !self.imports.contains(name);
                    tracing::debug!(
                        target: "harness",
                        stage = "harness.link",
                        module = module_name,
                        import = name,
                        kind = entry.kind(),
                        stubbed
                    );
                    let func = bind_import(store, entry, &func_ty)?;
                    linker
                        .define(&*store, module_name, name, func)
                        .map_err(|err| Error::instantiate(format!("{err:#}")))?;
                }
                other => {
                    return Err(Error::UnsupportedImportKind {
                        module: module_name.to_string(),
                        name: name.to_string(),
                        kind: extern_kind(&other),
                    });
                }
            }
        }
        Ok(linker)
    }
}

/// Name of the exported memory the host routines must operate on.
///
/// `None` means the routines use the host heap: the module either imports
/// its memory or has none. A memory the module defines without exporting is
/// unreachable from the host and rejected.
fn memory_binding(module: &Module) -> Result<Option<String>> {
    let exported = module
        .exports()
        .find(|export| matches!(export.ty(), ExternType::Memory(_)))
        .map(|export| export.name().to_string());
    let defined = module.resources_required().num_memories;
    if exported.is_none() && defined > 0 {
        return Err(Error::UnexportedMemory);
    }
    Ok(exported)
}

/// Errors raised while the module's code was executing, as opposed to the
/// engine refusing to link it.
fn is_run_fault(err: &wasmtime::Error) -> bool {
    err.downcast_ref::<Signal>().is_some() || err.downcast_ref::<Trap>().is_some()
}

fn extern_kind(ty: &ExternType) -> &'static str {
    match ty {
        ExternType::Global(_) => "global",
        ExternType::Table(_) => "table",
        _ => "extern",
    }
}

/// Flushes the single closing diagnostic and tears the run state down.
fn finish(store: Store<HostContext>, outcome: RunOutcome, started: Instant) -> RunReport {
    let mut context = store.into_data();
    let exit_status = context.exit_status();
    tracing::debug!(
        target: "harness",
        stage = "harness.flush",
        pending_bytes = context.output().pending().len()
    );
    context.output_mut().flush(&outcome.diagnostic());
    let output = context.into_output().into_captured();
    let report = RunReport::new(outcome, exit_status, output);
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    if report.is_success() {
        tracing::info!(
            target: "harness",
            stage = "harness.run.complete",
            outcome = report.outcome.state_name(),
            exit_status = report.exit_status,
            exit_code = report.exit_code,
            elapsed_ms
        );
    } else {
        tracing::warn!(
            target: "harness",
            stage = "harness.run.complete",
            outcome = report.outcome.state_name(),
            exit_status = report.exit_status,
            exit_code = report.exit_code,
            diagnostic = %report.outcome.diagnostic(),
            elapsed_ms
        );
    }
    report
}
