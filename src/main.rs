//! hoodbook entry point
//!
//! Argument parsing, configuration and startup all live in the CLI module;
//! this only reports a failure and sets the exit code.

use hoodbook::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
