//! CLI module for the `fetcher` and `remover` binaries
//!
//! This module is only available when the "cli" feature is enabled.

pub mod fetcher;
pub mod remover;

use crate::error::PipelineError;
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::process::ExitCode;

/// Exit status for wrong arguments
pub const USAGE_EXIT_CODE: u8 = 1;

/// Parse arguments, printing usage to stdout on misuse.
///
/// `Err` carries the exit code the binary should return: success for
/// `--help`/`--version`, [`USAGE_EXIT_CODE`] for anything else clap rejects.
pub(crate) fn parse_args_from<T, I, A>(args: I) -> Result<T, ExitCode>
where
    T: Parser,
    I: IntoIterator<Item = A>,
    A: Into<OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(cli),
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            println!("{}", err.render());
            Err(ExitCode::SUCCESS)
        },
        Err(err) => {
            println!("{}", err.render());
            Err(ExitCode::from(USAGE_EXIT_CODE))
        },
    }
}

/// Print the full error chain and map it to an exit code
pub(crate) fn report_failure(err: &anyhow::Error) -> ExitCode {
    tracing::debug!(error = %err, "run failed");
    // `{:?}` prints every `Caused by:` line, plus a backtrace under RUST_BACKTRACE
    eprintln!("Error: {err:?}");

    let code = err
        .downcast_ref::<PipelineError>()
        .map_or(1, PipelineError::exit_code);
    ExitCode::from(code)
}

pub(crate) fn init_tracing(verbosity: u8) {
    if let Err(e) = crate::tracing_config::init_cli_tracing(verbosity) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }
}
