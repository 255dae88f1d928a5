//! CLI command implementations
//!
//! Each command loads the configuration first; nothing else starts if it is
//! invalid.

use std::io::Write;
use std::path::Path;

use super::args::Command;
use super::errors::{CliError, CliResult};
use crate::config::AppConfig;
use crate::http_server::{AppState, HttpServer};
use crate::observability::init_logging;
use crate::postgres::Database;
use crate::service::Stores;

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
        Command::Serve { config } => serve(&config),
        Command::Migrate { config } => migrate(&config),
        Command::CheckConfig { config } => check_config(&config),
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| CliError::boot_failed(format!("Failed to create tokio runtime: {}", e)))
}

fn start_logging(config: &AppConfig) -> CliResult<()> {
    init_logging(&config.log)
        .map_err(|e| CliError::boot_failed(format!("Failed to initialise logging: {}", e)))
}

/// Start the HTTP server
///
/// With a `database` section the schema is ensured before the listener binds;
/// without one every store lives in process memory.
pub fn serve(config_path: &Path) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    start_logging(&config)?;

    runtime()?.block_on(async {
        let database = config.database.as_ref().map(Database::connect_lazy);

        let stores = match &database {
            Some(database) => {
                database.migrate().await.map_err(|e| {
                    CliError::boot_failed(format!("Database migration failed: {}", e))
                })?;
                database.stores()
            }
            None => {
                tracing::warn!("no database configured; state is kept in memory only");
                Stores::in_memory()
            }
        };

        let state = AppState::new(stores, &config.session);
        let result = HttpServer::new(config.server.clone(), state)
            .run()
            .await
            .map_err(|e| CliError::boot_failed(format!("HTTP server failed: {}", e)));

        if let Some(database) = &database {
            database.close().await;
        }
        tracing::info!("server stopped");
        result
    })
}

/// Create the relational schema and exit
pub fn migrate(config_path: &Path) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    let db_config = config.database.as_ref().ok_or_else(|| {
        CliError::config_error("migrate requires a database section in the config")
    })?;
    start_logging(&config)?;

    runtime()?.block_on(async {
        let database = Database::connect_lazy(db_config);
        let result = database
            .migrate()
            .await
            .map_err(|e| CliError::boot_failed(format!("Database migration failed: {}", e)));
        database.close().await;
        result
    })
}

/// Print the effective configuration with secrets redacted
pub fn check_config(config_path: &Path) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    let rendered = serde_json::to_string_pretty(&config.redacted())?;

    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", rendered)?;
    Ok(())
}
