//! CLI command implementations
//!
//! Every command loads the engine configuration, initializes logging and
//! loads the table fixture into a `MemoryTable` before touching a request.
//! Logs go to stderr; stdout carries only JSON responses (or the text plan).

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::executor::{QueryExecutor, QueryWorker};
use crate::store::{MemoryTable, TableStore};

use super::args::Command;
use super::errors::{CliErrorCode, CliResult};
use super::io::{read_request, read_requests, write_error, write_response, write_text};

/// Main CLI entry point
///
/// Parses arguments and dispatches to the appropriate command.
/// This is the only function that main.rs should call.
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Query {
            table,
            request,
            config,
        } => query(&table, request.as_deref(), config.as_deref()),
        Command::Explain {
            table,
            request,
            config,
            text,
        } => explain(&table, request.as_deref(), config.as_deref(), text),
        Command::Serve { table, config } => serve(&table, config.as_deref()),
    }
}

/// Execute a single query and exit
pub fn query(
    table_path: &Path,
    request_path: Option<&Path>,
    config_path: Option<&Path>,
) -> CliResult<()> {
    let config = boot(config_path)?;
    let table = load_table(table_path)?;
    let request = read_request(request_path)?;

    let runtime = tokio::runtime::Runtime::new()?;
    let worker = QueryWorker::new(Arc::new(table), Arc::new(config));
    let response = runtime.block_on(worker.run(request))?;

    write_response(serde_json::to_value(response)?)
}

/// Explain a single query and exit
pub fn explain(
    table_path: &Path,
    request_path: Option<&Path>,
    config_path: Option<&Path>,
    text: bool,
) -> CliResult<()> {
    let config = boot(config_path)?;
    let table = load_table(table_path)?;
    let request = read_request(request_path)?;

    let executor = QueryExecutor::new(&table, &config)?;
    let plan = executor.explain(&request);
    if text {
        write_text(&plan.to_string())
    } else {
        write_response(serde_json::to_value(plan)?)
    }
}

/// Answer requests line by line until stdin closes.
///
/// A malformed or rejected request produces an error line and the loop
/// continues; an I/O failure ends it.
pub fn serve(table_path: &Path, config_path: Option<&Path>) -> CliResult<()> {
    let config = boot(config_path)?;
    let table = load_table(table_path)?;
    let executor = QueryExecutor::new(&table, &config)?;
    let cancel = CancellationToken::new();

    let mut served = 0usize;
    for request in read_requests() {
        let request = match request {
            Ok(request) => request,
            Err(e) if *e.code() == CliErrorCode::BadRequest => {
                warn!(error = %e, "malformed request");
                write_error(e.code_str(), e.message())?;
                continue;
            }
            Err(e) => return Err(e),
        };
        match executor.execute(&request, &cancel) {
            Ok(response) => write_response(serde_json::to_value(response)?)?,
            Err(e) => write_error(e.code(), &e.to_string())?,
        }
        served += 1;
    }

    info!(table = %table.name(), served, "input closed");
    Ok(())
}

fn boot(config_path: Option<&Path>) -> CliResult<EngineConfig> {
    let config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    init_logging(&config.log_level);
    Ok(config)
}

/// RUST_LOG wins over the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A second init in the same process keeps the first subscriber
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load_table(path: &Path) -> CliResult<MemoryTable> {
    let table = MemoryTable::load(path)?;
    info!(
        table = %table.name(),
        rows = table.count_all()?,
        "table loaded"
    );
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_fixture(dir: &TempDir) -> std::path::PathBuf {
        let path = dir.path().join("people.json");
        let fixture = json!({
            "name": "people",
            "schema": {"primKey": {"kind": "named", "name": "id"}, "indexes": []},
            "rows": [{"id": 1}, {"id": 2}]
        });
        fs::write(&path, fixture.to_string()).unwrap();
        path
    }

    #[test]
    fn test_load_table_fixture() {
        let dir = TempDir::new().unwrap();
        let table = load_table(&write_fixture(&dir)).unwrap();
        assert_eq!(table.name(), "people");
        assert_eq!(table.count_all().unwrap(), 2);
    }

    #[test]
    fn test_load_table_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_table(&dir.path().join("missing.json")).unwrap_err();
        assert_eq!(err.code_str(), "SCOPE_CLI_TABLE_LOAD");
    }

    #[test]
    fn test_boot_with_invalid_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"default_limit": 0}"#).unwrap();
        let err = boot(Some(&path)).unwrap_err();
        assert_eq!(err.code_str(), "SCOPE_CLI_CONFIG_ERROR");
    }
}
