//! Reconciliation engine.
//!
//! The engine ties the desired-state document, the state store and the
//! reconcilers together:
//! 1. Refresh - re-read every stored resource from the vault
//! 2. Planning - compare the document with refreshed state
//! 3. Applying - run the planned actions one at a time, persisting each success

mod apply;
mod plan;

pub use apply::ApplySummary;
pub use plan::{Action, Change, Plan};

use tracing::{debug, warn};

use crate::config::Document;
use crate::db::{StateStore, StoredResource};
use crate::error::Result;
use crate::resolver::ConnectionDescriptor;
use crate::resource::{ClientReconciler, SecretReconciler};
use crate::vault::Connector;

/// Outcome of a refresh.
#[derive(Debug, Default)]
pub struct RefreshSummary {
    pub refreshed: usize,
    /// Addresses dropped because the vault no longer has them.
    pub dropped: Vec<String>,
}

pub struct Engine<'a> {
    connector: &'a dyn Connector,
    conn: &'a ConnectionDescriptor,
    store: &'a StateStore,
}

impl<'a> Engine<'a> {
    pub fn new(
        connector: &'a dyn Connector,
        conn: &'a ConnectionDescriptor,
        store: &'a StateStore,
    ) -> Self {
        Self {
            connector,
            conn,
            store,
        }
    }

    /// Re-read every stored resource and record what the vault reports.
    ///
    /// Resources the vault no longer knows are removed from state; any other
    /// failure aborts the refresh.
    pub fn refresh(&self) -> Result<RefreshSummary> {
        let mut summary = RefreshSummary::default();

        for entry in self.store.list()? {
            let address = entry.address.as_str();
            debug!(address, "refreshing");

            match self.read(&entry.resource) {
                Ok(observed) => {
                    self.store.put(address, &observed)?;
                    summary.refreshed += 1;
                }
                Err(e) if e.is_not_found() => {
                    warn!(address, "resource no longer exists, removing from state");
                    self.store.remove(address)?;
                    self.store.log_operation("forget", address, None)?;
                    summary.dropped.push(entry.address);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(summary)
    }

    /// Refresh, then compute the actions needed to reach `document`.
    pub fn plan(&self, document: &Document) -> Result<Plan> {
        self.refresh()?;
        let state = self.store.list()?;
        Plan::compute(document, &state)
    }

    fn read(&self, stored: &StoredResource) -> Result<StoredResource> {
        match stored {
            StoredResource::Secret(s) => SecretReconciler::new(self.connector)
                .read(&s.path, self.conn)
                .map(StoredResource::Secret),
            StoredResource::Client(c) => {
                let mut observed =
                    ClientReconciler::new(self.connector).read(&c.identifier, self.conn)?;
                // Only the create response reveals the secret.
                observed.client_secret = c.client_secret.clone();
                Ok(StoredResource::Client(observed))
            }
        }
    }
}
