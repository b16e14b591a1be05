//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - run: full ingestion and ranking job
//! - sync: users or organizations only
//! - score / rank: derived fields only
//! - show: print one user's ledger summary

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ghledger - harvests public GitHub contributions into per-user ledgers
#[derive(Parser, Debug)]
#[command(name = "ghledger")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to stderr instead of the log file
    #[arg(long, global = true)]
    pub log_stderr: bool,

    /// Subcommand to execute (defaults to `run`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Sync users and organizations, then score, rank and record stats
    Run,

    /// Sync one kind of subject
    Sync {
        #[command(subcommand)]
        target: SyncTarget,
    },

    /// Recompute score and commitsTotalCount for every user
    Score,

    /// Recompute score_rank and contributions_rank for every user
    Rank,

    /// Show a user's derived fields and repositories
    Show {
        /// GitHub login
        username: String,
    },
}

/// What `sync` operates on
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTarget {
    /// Discover users and sync their contributions
    Users,

    /// Discover organizations and sync repositories and members
    Orgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_args() {
        let cli = Cli::try_parse_from(["ghledger"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
        assert!(!cli.log_stderr);
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_parse_run_with_globals() {
        let cli = Cli::try_parse_from(["ghledger", "run", "-v", "--log-stderr", "-c", "/tmp/g.yml"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Run));
        assert!(cli.is_verbose());
        assert!(cli.log_stderr);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/g.yml")));
    }

    #[test]
    fn test_cli_parse_sync_targets() {
        let cli = Cli::try_parse_from(["ghledger", "sync", "users"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Sync {
                target: SyncTarget::Users
            })
        );

        let cli = Cli::try_parse_from(["ghledger", "sync", "orgs"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Sync {
                target: SyncTarget::Orgs
            })
        );
    }

    #[test]
    fn test_cli_parse_show() {
        let cli = Cli::try_parse_from(["ghledger", "show", "alice"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Show {
                username: "alice".to_string()
            })
        );
    }

    #[test]
    fn test_cli_sync_requires_target() {
        assert!(Cli::try_parse_from(["ghledger", "sync"]).is_err());
    }
}
