//! CLI module for tablescope
//!
//! Provides command-line interface for:
//! - query: one-shot query against a table fixture
//! - explain: one-shot explain of a query
//! - serve: line-delimited JSON requests on stdin

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{explain, query, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_request, write_error, write_response};
