//! Client credential resource reconciliation.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{debug, error};

use super::session;
use crate::error::{DsvError, ResourceKind, Result};
use crate::resolver::ConnectionDescriptor;
use crate::vault::{ClientCredential, Connector, VaultClient};

const KIND: ResourceKind = ResourceKind::Client;

/// Client credentials for a role, as tracked in desired state.
///
/// The vault only reveals `client_secret` when the client is created, so it
/// is carried over from the create response and kept from then on.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ClientResource {
    #[serde(default)]
    pub identifier: String,
    pub role: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "exposed")]
    pub client_secret: Option<SecretString>,
}

impl ClientResource {
    pub fn new(role: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            ..Default::default()
        }
    }
}

impl From<ClientCredential> for ClientResource {
    fn from(credential: ClientCredential) -> Self {
        Self {
            identifier: credential.client_id,
            role: credential.role,
            description: credential.description,
            client_secret: credential.client_secret,
        }
    }
}

impl fmt::Debug for ClientResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientResource")
            .field("identifier", &self.identifier)
            .field("role", &self.role)
            .field("description", &self.description)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Serde for the client secret in persisted state.
mod exposed {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<SecretString>,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error> {
        value
            .as_ref()
            .map(|s| s.expose_secret())
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> std::result::Result<Option<SecretString>, D::Error> {
        Ok(Option::<String>::deserialize(deserializer)?.map(SecretString::from))
    }
}

/// Create, read and delete clients in the vault.
///
/// Clients have no in-place update: a different role means a new client.
pub struct ClientReconciler<'a> {
    connector: &'a dyn Connector,
}

impl<'a> ClientReconciler<'a> {
    pub fn new(connector: &'a dyn Connector) -> Self {
        Self { connector }
    }

    /// Create a client for `desired.role`, then read it back.
    pub fn create(
        &self,
        desired: &ClientResource,
        conn: &ConnectionDescriptor,
    ) -> Result<ClientResource> {
        let role = desired.role.as_str();
        if role.is_empty() {
            return Err(DsvError::precondition(KIND, role, "role must be set"));
        }

        let client = session(self.connector, conn).map_err(|e| DsvError::create(KIND, role, e))?;

        let description = (!desired.description.is_empty()).then_some(desired.description.as_str());
        debug!(role, "creating client");
        let created = client.create_client(role, description).map_err(|e| {
            error!(role, error = %e, "unable to create client");
            DsvError::create(KIND, role, e)
        })?;

        let mut resource = fetch(client.as_ref(), &created.client_id)?;
        resource.client_secret = created.client_secret;
        Ok(resource)
    }

    /// Fetch the client's current remote representation. The secret is never
    /// part of a read.
    pub fn read(&self, client_id: &str, conn: &ConnectionDescriptor) -> Result<ClientResource> {
        let client =
            session(self.connector, conn).map_err(|e| DsvError::read(KIND, client_id, e))?;
        fetch(client.as_ref(), client_id)
    }

    /// Permanently remove the client.
    pub fn delete(&self, client_id: &str, conn: &ConnectionDescriptor) -> Result<()> {
        let client =
            session(self.connector, conn).map_err(|e| DsvError::delete(KIND, client_id, e))?;

        debug!(client_id, "getting client");
        let existing = client
            .get_client(client_id)
            .map_err(|e| DsvError::delete(KIND, client_id, e))?;

        client
            .delete_client(&existing.client_id, true)
            .map_err(|e| {
                debug!(client_id, error = %e, "unable to delete client");
                DsvError::delete(KIND, client_id, e)
            })
    }
}

pub(super) fn fetch(client: &dyn VaultClient, client_id: &str) -> Result<ClientResource> {
    debug!(client_id, "getting client");
    let credential = client.get_client(client_id).map_err(|e| {
        debug!(client_id, error = %e, "unable to get client");
        DsvError::read(KIND, client_id, e)
    })?;
    Ok(ClientResource::from(credential))
}
