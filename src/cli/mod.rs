//! CLI module for Cronmesh
//!
//! - `serve`: HTTP job API plus a scheduler loop (default)
//! - `worker`: scheduler loop only, for extra instances

use clap::{Parser, Subcommand};

use crate::server::RunMode;

/// Cronmesh CLI
#[derive(Parser, Debug)]
#[command(name = "cronmesh")]
#[command(about = "Horizontally scalable cron scheduler")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP API and a scheduler (default)
    Serve,
    /// Start a scheduler without the HTTP API
    Worker,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let mode = match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => RunMode::Serve,
        Commands::Worker => RunMode::Worker,
    };
    crate::server::run(mode).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::try_parse_from(["cronmesh"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_worker_command() {
        let cli = Cli::try_parse_from(["cronmesh", "worker"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Worker));
    }

    #[test]
    fn test_unknown_command_rejected() {
        assert!(Cli::try_parse_from(["cronmesh", "init"]).is_err());
    }
}
