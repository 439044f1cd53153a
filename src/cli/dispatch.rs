use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::cli::{Cli, Command, RunArgs};
use crate::error::{Error, Result};
use crate::harness::Harness;
use crate::logging;
use crate::runtime::RunReport;

/// Execute a parsed invocation and return the process exit code. Logging is
/// configured here so the binary entrypoint can stay thin.
///
/// # Errors
/// Returns an error when the module cannot be loaded or linked, or the
/// report cannot be written. Faults inside the module are not errors; they
/// are folded into the returned exit code.
pub fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Command::Help => {
            println!("{}", Cli::usage());
            Ok(0)
        }
        Command::Version => {
            println!("{}", Cli::version());
            Ok(0)
        }
        Command::Run(args) => {
            let log_options = cli.log.merged_with_env();
            logging::init(log_options);
            tracing::debug!(
                target: "harness",
                stage = "cli.run",
                log_level = %log_options.level,
                log_format = %log_options.format,
                module = %args.module.display()
            );
            run_module(&args)
        }
    }
}

fn run_module(args: &RunArgs) -> Result<u8> {
    if !args.args.is_empty() {
        tracing::debug!(
            target: "harness",
            stage = "cli.run",
            ignored = %args.args.join(" "),
            "module arguments are not forwarded"
        );
    }
    let harness = Harness::new(args.options.clone())?;
    let report = harness.run_file(&args.module)?;
    if let Some(path) = &args.report {
        write_report(&report, path)?;
    }
    Ok(report.process_exit_code())
}

/// Writes `report` as pretty-printed JSON.
///
/// # Errors
/// Returns [`Error::Report`] when serialisation or the write fails.
pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    let mut json = serde_json::to_string_pretty(report)
        .map_err(|err| Error::report(format!("failed to serialise run report: {err}")))?;
    json.push('\n');
    fs::write(path, json)
        .map_err(|err| Error::report(format!("{}: {err}", path.display())))?;
    tracing::debug!(target: "harness", stage = "cli.report", path = %path.display());
    Ok(())
}

pub fn report_error(err: &Error) {
    let mut out = io::stderr();
    if let Err(io_err) = report_error_to(err, &mut out) {
        let _ = writeln!(io::stderr(), "failed to report error: {io_err}");
    }
}

fn report_error_to(err: &Error, out: &mut dyn Write) -> io::Result<()> {
    match err {
        Error::Cli(cli) => writeln!(out, "{cli}"),
        other => writeln!(out, "error: {other}"),
    }
}
