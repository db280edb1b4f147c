//! Command-line interface definitions.

mod args;
mod commands;

pub use args::{Cli, GlobalArgs};
pub use commands::{Commands, LookupCommands, RoleCommands};
