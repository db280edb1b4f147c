//! Command and subcommand definitions.

use clap::Subcommand;
use std::path::PathBuf;

/// Top-level commands available in dsvform.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter dsv.kdl
    Init {
        /// Where to write the document (defaults to ./dsv.kdl)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Replace an existing document
        #[arg(long)]
        overwrite: bool,
    },

    /// Show what apply would change
    Plan,

    /// Create, update, replace and delete resources to match the document
    Apply,

    /// Re-read managed resources from the vault and update state
    Refresh,

    /// Delete every managed resource
    Destroy {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Show managed resources from state (sensitive values redacted)
    Show {
        /// Only show this address, e.g. secret.database
        address: Option<String>,
    },

    /// Read objects directly from the vault
    Lookup {
        #[command(subcommand)]
        command: LookupCommands,
    },

    /// Manage roles in the local vault
    Role {
        #[command(subcommand)]
        command: RoleCommands,
    },

    /// Show the operation log
    Log {
        /// Limit number of entries shown
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

/// Lookup subcommands
#[derive(Subcommand, Debug)]
pub enum LookupCommands {
    /// Read a secret by path
    Secret { path: String },

    /// Read a client by client id
    Client { client_id: String },

    /// Read a role by name
    Role { name: String },
}

/// Role subcommands
#[derive(Subcommand, Debug)]
pub enum RoleCommands {
    /// Register a role that clients can be created for
    Add {
        name: String,

        #[arg(short, long)]
        description: Option<String>,
    },
}
