//! Dry-run checker for entry-point metadata.
//!
//! # Responsibility
//! - Run one registration pass over a group of an entry-point file without
//!   loading any code: each entry binds its own declaration.
//! - Print bound names to stdout and per-entry warnings to stderr.
//!
//! # Exit codes
//! - `0`: every entry in the group would register.
//! - `1`: at least one entry failed.
//! - `2`: usage, logging, or parse error.

use clap::error::ErrorKind;
use clap::Parser;
use extload_core::{
    default_log_level, init_logging, EntryPoint, EntryPointTable, ExtensionKey,
    ExtensionRegistrar, LoggingConfig, Namespace,
};
use std::env::VarError;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_CLEAN: u8 = 0;
const EXIT_FAILED_ENTRIES: u8 = 1;
const EXIT_USAGE: u8 = 2;

const LOG_DIR_ENV: &str = "EXTLOAD_LOG_DIR";
const LOG_LEVEL_ENV: &str = "EXTLOAD_LOG_LEVEL";

/// Entry-point registration check.
#[derive(Parser, Debug)]
#[command(name = "extload", version = extload_core::core_version())]
#[command(about = "Check which entries of an entry-point group would register")]
struct Args {
    /// Entry-point metadata file
    #[arg(value_name = "ENTRY_POINTS")]
    path: PathBuf,

    /// Entry-point group to register
    #[arg(value_name = "GROUP")]
    group: String,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::from(parse_error_exit_code(&err));
        }
    };
    let code = execute(&args, &mut io::stdout().lock(), &mut io::stderr().lock());
    ExitCode::from(code)
}

/// `--help` and `--version` exit cleanly; every other parse failure is usage.
fn parse_error_exit_code(err: &clap::Error) -> u8 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_CLEAN,
        _ => EXIT_USAGE,
    }
}

fn execute(args: &Args, out: &mut impl Write, err: &mut impl Write) -> u8 {
    match check(args, out, err) {
        Ok(true) => EXIT_CLEAN,
        Ok(false) => EXIT_FAILED_ENTRIES,
        Err(message) => {
            let _ = writeln!(err, "error: {message}");
            EXIT_USAGE
        }
    }
}

/// Returns whether the pass was clean.
fn check(args: &Args, out: &mut impl Write, err: &mut impl Write) -> Result<bool, String> {
    init_logging_from_env()?;

    let table = EntryPointTable::from_path(&args.path).map_err(|e| e.to_string())?;
    let key = ExtensionKey::from(args.group.as_str());
    let registrar = ExtensionRegistrar::new(&table);
    let mut namespace = Namespace::new(args.group.as_str());

    // Entries must name an object inside a module, not the module itself.
    let report = registrar.register(&mut namespace, &key, |entry: &EntryPoint| {
        entry.target.attr.is_some()
    });

    let write_failed = |e: io::Error| format!("failed to write output: {e}");
    for (name, entry) in namespace.iter() {
        writeln!(out, "{name} -> {}", entry.target).map_err(write_failed)?;
    }
    for warning in &report.warnings {
        writeln!(err, "warning: {warning}").map_err(write_failed)?;
    }
    log::info!(
        "event=cli_check module=cli status=ok group={} bound={} failed={}",
        args.group,
        report.bound.len(),
        report.warnings.len()
    );
    Ok(report.is_clean())
}

fn init_logging_from_env() -> Result<(), String> {
    let log_dir = match std::env::var(LOG_DIR_ENV) {
        Ok(value) => value,
        Err(VarError::NotPresent) => return Ok(()),
        Err(VarError::NotUnicode(_)) => {
            return Err(format!("{LOG_DIR_ENV} must be valid UTF-8"));
        }
    };
    let level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| default_log_level().to_string());
    let config = LoggingConfig::parse(&level, &log_dir).map_err(|e| e.to_string())?;
    init_logging(&config).map_err(|e| e.to_string())
}
