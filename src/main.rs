//! # Nextcloud Build CLI
//!
//! This is the binary entry point for the `nextcloud-build` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Printing top-level errors and choosing the process exit code.
//!
//! The build pipeline itself lives in the `nextcloud_build` library crate; the
//! binary is a thin wrapper around it.

mod cli;
mod commands;

use std::process::ExitCode;

use clap::Parser;

use nextcloud_build::error::Error;
use nextcloud_build::exit_codes;

fn main() -> ExitCode {
    let cli = cli::Cli::parse();
    match cli.execute() {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<Error>()
                .map(Error::exit_code)
                .unwrap_or(exit_codes::ERROR);
            ExitCode::from(code as u8)
        }
    }
}
