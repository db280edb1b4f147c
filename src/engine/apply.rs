//! Plan execution.

use tracing::{debug, info};

use super::Engine;
use super::plan::{Action, Change, Plan};
use crate::db::StoredResource;
use crate::error::{DsvError, Result};
use crate::resource::{ClientReconciler, SecretReconciler};

/// Summary of apply results
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub created: usize,
    pub updated: usize,
    pub replaced: usize,
    pub deleted: usize,
    pub unchanged: usize,
}

impl ApplySummary {
    pub fn total_changes(&self) -> usize {
        self.created + self.updated + self.replaced + self.deleted
    }
}

impl Engine<'_> {
    /// Execute `plan` in order.
    ///
    /// Each successful change is written to state before the next one runs.
    /// The first failure stops the run; changes already applied stay
    /// recorded.
    pub fn apply(&self, plan: &Plan) -> Result<ApplySummary> {
        let mut summary = ApplySummary::default();

        for change in &plan.changes {
            let address = change.address.as_str();
            match change.action {
                Action::NoOp => {
                    summary.unchanged += 1;
                    continue;
                }
                Action::Create => {
                    let observed = self.create(desired(change)?)?;
                    self.record(address, &observed, "create")?;
                    summary.created += 1;
                }
                Action::Update => {
                    let observed = self.update(change)?;
                    self.record(address, &observed, "update")?;
                    summary.updated += 1;
                }
                Action::Replace => {
                    if let Some(current) = &change.current {
                        self.remove(current)?;
                        // The old object is gone even if the create below fails.
                        self.store.remove(address)?;
                        self.store.log_operation("delete", address, None)?;
                    }
                    let observed = self.create(desired(change)?)?;
                    self.record(address, &observed, "replace")?;
                    summary.replaced += 1;
                }
                Action::Delete => {
                    if let Some(current) = &change.current {
                        self.remove(current)?;
                    }
                    self.store.remove(address)?;
                    self.store.log_operation("delete", address, None)?;
                    summary.deleted += 1;
                }
            }
            info!(address, action = %change.action, "applied");
        }

        Ok(summary)
    }

    /// Delete every resource in state. Returns the number destroyed.
    pub fn destroy(&self) -> Result<usize> {
        let mut destroyed = 0;
        for entry in self.store.list()? {
            let address = entry.address.as_str();
            self.remove(&entry.resource)?;
            self.store.remove(address)?;
            self.store.log_operation("destroy", address, None)?;
            info!(address, "destroyed");
            destroyed += 1;
        }
        Ok(destroyed)
    }

    fn create(&self, desired: &StoredResource) -> Result<StoredResource> {
        match desired {
            StoredResource::Secret(s) => SecretReconciler::new(self.connector)
                .create(s, self.conn)
                .map(StoredResource::Secret),
            StoredResource::Client(c) => ClientReconciler::new(self.connector)
                .create(c, self.conn)
                .map(StoredResource::Client),
        }
    }

    fn update(&self, change: &Change) -> Result<StoredResource> {
        match (desired(change)?, &change.current) {
            (StoredResource::Secret(d), Some(StoredResource::Secret(c))) => {
                SecretReconciler::new(self.connector)
                    .update(&c.path, d, self.conn)
                    .map(StoredResource::Secret)
            }
            _ => Err(DsvError::document(format!(
                "'{}' cannot be updated in place",
                change.address
            ))),
        }
    }

    /// Delete the remote object; one that is already gone counts as deleted.
    fn remove(&self, current: &StoredResource) -> Result<()> {
        let key = current.lookup_key();
        let result = match current {
            StoredResource::Secret(_) => SecretReconciler::new(self.connector).delete(key, self.conn),
            StoredResource::Client(_) => ClientReconciler::new(self.connector).delete(key, self.conn),
        };
        match result {
            Err(e) if e.is_not_found() => {
                debug!(key, "already deleted");
                Ok(())
            }
            other => other,
        }
    }

    fn record(&self, address: &str, observed: &StoredResource, operation: &str) -> Result<()> {
        self.store.put(address, observed)?;
        let details = serde_json::json!({
            "identifier": observed.identifier(),
            "version": observed.version(),
        });
        self.store
            .log_operation(operation, address, Some(&details.to_string()))
    }
}

fn desired(change: &Change) -> Result<&StoredResource> {
    change.desired.as_ref().ok_or_else(|| {
        DsvError::document(format!("'{}' has no declared state", change.address))
    })
}
