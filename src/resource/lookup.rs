//! Read-only lookups of vault objects that are not managed here.

use super::client::{self, ClientResource};
use super::secret::{self, SecretResource};
use super::session;
use crate::error::{DsvError, ResourceKind, Result};
use crate::resolver::ConnectionDescriptor;
use crate::vault::{Connector, Role};

pub struct Lookup<'a> {
    connector: &'a dyn Connector,
}

impl<'a> Lookup<'a> {
    pub fn new(connector: &'a dyn Connector) -> Self {
        Self { connector }
    }

    pub fn secret(&self, path: &str, conn: &ConnectionDescriptor) -> Result<SecretResource> {
        let vault = session(self.connector, conn)
            .map_err(|e| DsvError::read(ResourceKind::Secret, path, e))?;
        secret::fetch(vault.as_ref(), path)
    }

    pub fn client(&self, client_id: &str, conn: &ConnectionDescriptor) -> Result<ClientResource> {
        let vault = session(self.connector, conn)
            .map_err(|e| DsvError::read(ResourceKind::Client, client_id, e))?;
        client::fetch(vault.as_ref(), client_id)
    }

    pub fn role(&self, name: &str, conn: &ConnectionDescriptor) -> Result<Role> {
        let vault = session(self.connector, conn)
            .map_err(|e| DsvError::read(ResourceKind::Role, name, e))?;
        tracing::debug!(name, "getting role");
        vault
            .get_role(name)
            .map_err(|e| DsvError::read(ResourceKind::Role, name, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{CountingConnector, descriptor};
    use crate::vault::{Secret, VaultClient};
    use serde_json::Value;

    #[test]
    fn test_lookups() {
        let connector = CountingConnector::new();
        let vault = connector.inner.vault("acme").unwrap();
        vault.create_role("reader", Some("read only")).unwrap();

        let mut stored = Secret::new("shared/api");
        stored
            .data
            .insert("token".to_string(), Value::String("t".to_string()));
        vault.create_secret(&stored).unwrap();
        let client = vault.create_client("reader", None).unwrap();

        let lookup = Lookup::new(&connector);
        let conn = descriptor();
        assert_eq!(lookup.secret("shared/api", &conn).unwrap().version, 1);
        assert_eq!(lookup.client(&client.client_id, &conn).unwrap().role, "reader");
        assert_eq!(lookup.role("reader", &conn).unwrap().description, "read only");
        assert!(lookup.role("writer", &conn).unwrap_err().is_not_found());
    }
}
