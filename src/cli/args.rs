//! CLI argument parsing structures.

use clap::{Args, Parser};
use std::path::PathBuf;

use super::commands::Commands;

/// Main CLI structure for dsvform.
#[derive(Parser, Debug)]
#[command(name = "dsvform")]
#[command(about = "Reconcile declared secrets and clients with a DevOps Secrets Vault", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands.
#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Path to the desired-state document (defaults to ./dsv.kdl, then ~/.config/dsvform/dsv.kdl)
    #[arg(short, long, global = true)]
    pub file: Option<PathBuf>,

    /// Log reconciler activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
}
