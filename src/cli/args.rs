//! CLI argument definitions using clap
//!
//! Commands:
//! - hoodbook serve --config <path>
//! - hoodbook migrate --config <path>
//! - hoodbook check-config --config <path>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Hoodbook - fume hood booking service
#[derive(Parser, Debug)]
#[command(name = "hoodbook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the HTTP server
    Serve {
        /// Path to configuration file
        #[arg(long, default_value = "./hoodbook.json")]
        config: PathBuf,
    },

    /// Create the database schema and exit
    Migrate {
        /// Path to configuration file
        #[arg(long, default_value = "./hoodbook.json")]
        config: PathBuf,
    },

    /// Validate the configuration and print it with secrets hidden
    CheckConfig {
        /// Path to configuration file
        #[arg(long, default_value = "./hoodbook.json")]
        config: PathBuf,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_serve_with_default_config() {
        let cli = Cli::try_parse_from(["hoodbook", "serve"]).unwrap();
        match cli.command {
            Command::Serve { config } => assert_eq!(config, PathBuf::from("./hoodbook.json")),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_check_config_with_path() {
        let cli =
            Cli::try_parse_from(["hoodbook", "check-config", "--config", "/etc/hoodbook.json"])
                .unwrap();
        match cli.command {
            Command::CheckConfig { config } => {
                assert_eq!(config, PathBuf::from("/etc/hoodbook.json"))
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["hoodbook", "start"]).is_err());
    }
}
