//! Secret resource reconciliation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use super::session;
use crate::error::{DsvError, ResourceKind, Result};
use crate::resolver::ConnectionDescriptor;
use crate::vault::{Connector, Secret, VaultClient};

const KIND: ResourceKind = ResourceKind::Secret;

/// A secret as declared and tracked in desired state.
///
/// `path` is the natural key; `identifier` and `version` are assigned by the
/// vault and stay empty/zero until a create or read succeeds.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecretResource {
    #[serde(default)]
    pub identifier: String,
    pub path: String,
    #[serde(default)]
    pub description: String,
    pub data: BTreeMap<String, Value>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Value>,
    #[serde(default)]
    pub version: i64,
}

impl SecretResource {
    /// A not-yet-created secret at `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    /// Whether the user-settable fields match `other`.
    pub fn same_content(&self, other: &SecretResource) -> bool {
        self.description == other.description
            && self.data == other.data
            && self.attributes == other.attributes
    }

    /// Copy the user-settable fields onto a vault record. The path is left as is.
    fn apply_to(&self, secret: &mut Secret) {
        secret.description = self.description.clone();
        secret.data = self.data.clone();
        secret.attributes = self.attributes.clone();
    }
}

impl From<Secret> for SecretResource {
    fn from(secret: Secret) -> Self {
        Self {
            identifier: secret.id,
            path: secret.path,
            description: secret.description,
            data: secret.data,
            attributes: secret.attributes,
            version: secret.version,
        }
    }
}

impl fmt::Debug for SecretResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretResource")
            .field("identifier", &self.identifier)
            .field("path", &self.path)
            .field("description", &self.description)
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .field("attributes", &self.attributes)
            .field("version", &self.version)
            .finish()
    }
}

/// Create, read, update and delete secrets in the vault.
pub struct SecretReconciler<'a> {
    connector: &'a dyn Connector,
}

impl<'a> SecretReconciler<'a> {
    pub fn new(connector: &'a dyn Connector) -> Self {
        Self { connector }
    }

    /// Create the secret, then read it back.
    ///
    /// The returned resource carries the vault-assigned identifier and
    /// version. Nothing is returned on failure, so no partial identifier can
    /// leak into desired state.
    pub fn create(
        &self,
        desired: &SecretResource,
        conn: &ConnectionDescriptor,
    ) -> Result<SecretResource> {
        let path = desired.path.as_str();
        if path.is_empty() {
            return Err(DsvError::precondition(KIND, path, "path must be set"));
        }
        if desired.data.is_empty() {
            return Err(DsvError::precondition(KIND, path, "data must not be empty"));
        }

        let client = session(self.connector, conn).map_err(|e| DsvError::create(KIND, path, e))?;

        let mut secret = Secret::new(path);
        desired.apply_to(&mut secret);

        debug!(path, "creating secret");
        client.create_secret(&secret).map_err(|e| {
            error!(path, error = %e, "unable to create secret");
            DsvError::create(KIND, path, e)
        })?;

        fetch(client.as_ref(), path)
    }

    /// Fetch the secret's current remote representation.
    pub fn read(&self, path: &str, conn: &ConnectionDescriptor) -> Result<SecretResource> {
        let client = session(self.connector, conn).map_err(|e| DsvError::read(KIND, path, e))?;
        fetch(client.as_ref(), path)
    }

    /// Overwrite description, data and attributes of the secret at `path`,
    /// asking the vault to bump its version, then read it back.
    ///
    /// Always submits, even when nothing changed; skipping no-op updates is
    /// left to the caller.
    pub fn update(
        &self,
        path: &str,
        desired: &SecretResource,
        conn: &ConnectionDescriptor,
    ) -> Result<SecretResource> {
        if desired.data.is_empty() {
            return Err(DsvError::precondition(KIND, path, "data must not be empty"));
        }

        let client = session(self.connector, conn).map_err(|e| DsvError::update(KIND, path, e))?;

        debug!(path, "getting secret");
        let mut secret = client.get_secret(path).map_err(|e| {
            debug!(path, error = %e, "unable to get secret");
            DsvError::read(KIND, path, e)
        })?;

        desired.apply_to(&mut secret);

        client.update_secret(&secret, true).map_err(|e| {
            error!(path, error = %e, "unable to update secret");
            DsvError::update(KIND, path, e)
        })?;

        fetch(client.as_ref(), path)
    }

    /// Permanently remove the secret at `path`.
    pub fn delete(&self, path: &str, conn: &ConnectionDescriptor) -> Result<()> {
        let client = session(self.connector, conn).map_err(|e| DsvError::delete(KIND, path, e))?;

        debug!(path, "getting secret");
        let secret = client.get_secret(path).map_err(|e| {
            debug!(path, error = %e, "unable to get secret");
            DsvError::delete(KIND, path, e)
        })?;

        client.delete_secret(&secret.path, true).map_err(|e| {
            debug!(path, error = %e, "unable to delete secret");
            DsvError::delete(KIND, path, e)
        })
    }
}

pub(super) fn fetch(client: &dyn VaultClient, path: &str) -> Result<SecretResource> {
    debug!(path, "getting secret");
    let secret = client.get_secret(path).map_err(|e| {
        debug!(path, error = %e, "unable to get secret");
        DsvError::read(KIND, path, e)
    })?;
    Ok(SecretResource::from(secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{CountingConnector, UnavailableConnector, descriptor};
    use crate::vault::VaultErrorKind;

    fn desired(path: &str) -> SecretResource {
        let mut resource = SecretResource::new(path);
        resource
            .data
            .insert("k".to_string(), Value::String("v".to_string()));
        resource
    }

    #[test]
    fn test_create_then_read() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);
        let conn = descriptor();

        let created = reconciler.create(&desired("/p1"), &conn).unwrap();
        assert!(!created.identifier.is_empty());
        assert_eq!(created.version, 1);

        let read = reconciler.read("/p1", &conn).unwrap();
        assert_eq!(read.data["k"], Value::String("v".to_string()));
        assert_eq!(read.identifier, created.identifier);
    }

    #[test]
    fn test_create_carries_description_and_attributes() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);

        let mut resource = desired("app/db");
        resource.description = "database".to_string();
        resource
            .attributes
            .insert("ttl".to_string(), Value::from(300));

        let created = reconciler.create(&resource, &descriptor()).unwrap();
        assert_eq!(created.description, "database");
        assert_eq!(created.attributes["ttl"], Value::from(300));
        assert!(created.same_content(&resource));
    }

    #[test]
    fn test_create_with_empty_data_makes_no_call() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);

        let err = reconciler
            .create(&SecretResource::new("/p1"), &descriptor())
            .unwrap_err();
        assert!(matches!(err, DsvError::Precondition { .. }));
        assert_eq!(connector.session_count(), 0);
    }

    #[test]
    fn test_create_without_path_makes_no_call() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);

        let err = reconciler.create(&desired(""), &descriptor()).unwrap_err();
        assert!(matches!(err, DsvError::Precondition { .. }));
        assert_eq!(connector.session_count(), 0);
    }

    #[test]
    fn test_create_conflict_is_create_error() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);
        let conn = descriptor();

        reconciler.create(&desired("/p1"), &conn).unwrap();
        match reconciler.create(&desired("/p1"), &conn).unwrap_err() {
            DsvError::Create { key, source, .. } => {
                assert_eq!(key, "/p1");
                assert_eq!(source.kind, VaultErrorKind::Conflict);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_missing_is_not_found() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);

        let err = reconciler.read("/missing", &descriptor()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_read_connection_failure_is_read_error() {
        let reconciler = SecretReconciler::new(&UnavailableConnector);
        let err = reconciler.read("/p1", &descriptor()).unwrap_err();
        assert!(matches!(err, DsvError::Read { .. }));
    }

    #[test]
    fn test_update_keeps_data_and_bumps_version() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);
        let conn = descriptor();

        let created = reconciler.create(&desired("/p1"), &conn).unwrap();
        let first = reconciler.update("/p1", &desired("/p1"), &conn).unwrap();
        let second = reconciler.update("/p1", &desired("/p1"), &conn).unwrap();

        assert_eq!(first.data, created.data);
        assert_eq!(second.data, created.data);
        assert!(first.version > created.version);
        assert!(second.version > first.version);
        assert_eq!(second.identifier, created.identifier);
    }

    #[test]
    fn test_update_overwrites_fields_not_path() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);
        let conn = descriptor();
        reconciler.create(&desired("app/db"), &conn).unwrap();

        let mut changed = desired("elsewhere");
        changed.description = "rotated".to_string();
        changed
            .data
            .insert("k".to_string(), Value::String("v2".to_string()));

        let updated = reconciler.update("app/db", &changed, &conn).unwrap();
        assert_eq!(updated.path, "app/db");
        assert_eq!(updated.description, "rotated");
        assert_eq!(updated.data["k"], Value::String("v2".to_string()));
        assert!(reconciler.read("elsewhere", &conn).unwrap_err().is_not_found());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);

        let err = reconciler
            .update("/missing", &desired("/missing"), &descriptor())
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_delete_then_read_is_not_found() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);
        let conn = descriptor();

        reconciler.create(&desired("/p1"), &conn).unwrap();
        reconciler.delete("/p1", &conn).unwrap();

        assert!(reconciler.read("/p1", &conn).unwrap_err().is_not_found());
        // Hard delete frees the path for reuse.
        reconciler.create(&desired("/p1"), &conn).unwrap();
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let connector = CountingConnector::new();
        let reconciler = SecretReconciler::new(&connector);

        let err = reconciler.delete("/missing", &descriptor()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_debug_hides_data_values() {
        let debug = format!("{:?}", desired("/p1"));
        assert!(debug.contains("\"k\""));
        assert!(!debug.contains("\"v\""));
    }
}
