//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI parser for `almsync`.
#[derive(Debug, Parser)]
#[command(
    name = "almsync",
    version,
    about = "Synchronize security tasks with an ALM tool"
)]
pub struct Cli {
    /// Log at debug level (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one synchronization.
    Sync(SyncArgs),
    /// Load and validate the settings file without contacting any system.
    Check {
        /// Settings file (defaults to `$ALMSYNC_CONFIG`, then `almsync.yaml`).
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

/// Arguments of `almsync sync`. Flags override the `sync` section of the
/// settings file.
#[derive(Debug, Default, Args)]
pub struct SyncArgs {
    /// Settings file (defaults to `$ALMSYNC_CONFIG`, then `almsync.yaml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Delete existing remote items before reconciling.
    #[arg(long)]
    pub start_fresh: bool,

    /// Side that wins a status conflict: alm, sde or timestamp.
    #[arg(long, value_name = "POLICY")]
    pub conflict_policy: Option<String>,

    /// Only test connectivity: server or project.
    #[arg(long, value_name = "STEP")]
    pub test_connection: Option<String>,

    /// Only synchronize these tasks (e.g. `T21,T22`).
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    pub tasks: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_sync_with_overrides() {
        let cli = Cli::parse_from([
            "almsync",
            "sync",
            "--config",
            "prod.yaml",
            "--start-fresh",
            "--conflict-policy",
            "timestamp",
            "--tasks",
            "T21,T22",
        ]);
        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.config.unwrap().to_str(), Some("prod.yaml"));
        assert!(args.start_fresh);
        assert_eq!(args.conflict_policy.as_deref(), Some("timestamp"));
        assert_eq!(args.tasks, vec!["T21", "T22"]);
        assert!(args.test_connection.is_none());
    }

    #[test]
    fn parses_check_subcommand() {
        let cli = Cli::parse_from(["almsync", "check"]);
        assert!(matches!(cli.command, Command::Check { config: None }));
        assert!(!cli.verbose);
    }

    #[test]
    fn verbose_is_global() {
        let cli = Cli::parse_from(["almsync", "sync", "-v"]);
        assert!(cli.verbose);
    }

    #[test]
    fn rejects_unknown_subcommand() {
        assert!(Cli::try_parse_from(["almsync", "plan"]).is_err());
    }
}
