//! CLI argument definitions using clap
//!
//! Commands:
//! - tablescope query --table <fixture> [--request <file>] [--config <file>]
//! - tablescope explain --table <fixture> [--request <file>] [--text]
//! - tablescope serve --table <fixture> [--config <file>]
//!
//! Without `--request` the request is read from stdin.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tablescope - filter, sort and page rows of an index-oriented table
#[derive(Parser, Debug)]
#[command(name = "tablescope")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Execute a single query and print one page of rows
    Query {
        /// Table fixture (schema plus rows) as JSON
        #[arg(long)]
        table: PathBuf,

        /// Query request as JSON, stdin when omitted
        #[arg(long)]
        request: Option<PathBuf>,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Show how a query would run, without running it
    Explain {
        /// Table fixture (schema plus rows) as JSON
        #[arg(long)]
        table: PathBuf,

        /// Query request as JSON, stdin when omitted
        #[arg(long)]
        request: Option<PathBuf>,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print a human readable plan instead of JSON
        #[arg(long)]
        text: bool,
    },

    /// Answer one JSON request per stdin line until EOF
    Serve {
        /// Table fixture (schema plus rows) as JSON
        #[arg(long)]
        table: PathBuf,

        /// Engine configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
