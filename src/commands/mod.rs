//! Command handlers for the dsvform CLI.
//!
//! This module contains all the command handler functions, organized by command type.

mod init;
mod log;
mod lookup;
mod reconcile;
mod role;
mod show;

pub use init::handle_init;
pub use log::handle_log;
pub use lookup::handle_lookup;
pub use reconcile::{handle_apply, handle_destroy, handle_plan, handle_refresh};
pub use role::handle_role;
pub use show::handle_show;

use std::path::Path;

use crate::config::Document;
use crate::db::StateStore;
use crate::error::Result;
use crate::resolver::{ConnectionDescriptor, resolve};
use crate::vault::LocalConnector;

/// Everything a command needs: the loaded document, its state store and a
/// connector to the vault it describes.
pub struct Workspace {
    pub document: Document,
    pub store: StateStore,
    pub connector: LocalConnector,
}

impl Workspace {
    /// Load the document at `file` (or the standard locations) and open
    /// the state and vault it points at.
    pub fn open(file: Option<&Path>) -> Result<Self> {
        let document = Document::load(file)?;
        let store = StateStore::open(&document.state_path())?;
        let connector = LocalConnector::new(document.vault_path());
        Ok(Self {
            document,
            store,
            connector,
        })
    }

    /// Resolve the document's provider settings.
    pub fn descriptor(&self) -> Result<ConnectionDescriptor> {
        resolve(&self.document.provider_settings())
    }
}
