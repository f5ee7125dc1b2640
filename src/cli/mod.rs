//! CLI module for resourcekit
//!
//! Provides command-line interface for:
//! - schemas: Dump the loaded schema registry
//! - validate: Check a document file against a resource schema
//! - query: Show the query built from request parameters

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{query, run_command, schemas, validate};
pub use errors::{CliError, CliResult};

/// Parse arguments, set up logging and run the selected command.
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}
