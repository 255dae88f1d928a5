//! CLI module for hoodbook
//!
//! Provides command-line interface for:
//! - serve: Start the HTTP server
//! - migrate: Create the PostgreSQL schema
//! - check-config: Validate and print the configuration

mod args;
mod commands;
mod errors;

pub use args::{Cli, Command};
pub use commands::{check_config, migrate, run, run_command, serve};
pub use errors::{CliError, CliErrorCode, CliResult};
