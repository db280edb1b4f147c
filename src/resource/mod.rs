//! Managed resources and their reconcilers.
//!
//! A resource is the typed, desired-state view of a vault object. The
//! reconcilers map the four lifecycle transitions (create, read, update,
//! delete) onto vault client calls. Every mutation is paired with an explicit
//! read so computed fields always come from the vault's own answer.

mod client;
mod lookup;
mod secret;

pub use client::{ClientReconciler, ClientResource};
pub use lookup::Lookup;
pub use secret::{SecretReconciler, SecretResource};

use crate::resolver::ConnectionDescriptor;
use crate::vault::{Connector, VaultClient, VaultError};

/// Open a vault session for one operation.
fn session(
    connector: &dyn Connector,
    descriptor: &ConnectionDescriptor,
) -> Result<Box<dyn VaultClient>, VaultError> {
    connector.connect(descriptor).inspect_err(|e| {
        tracing::debug!(error = %e, "configuration error");
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! Connectors for exercising the reconcilers.

    use std::sync::atomic::{AtomicUsize, Ordering};

    use secrecy::SecretString;

    use crate::resolver::ConnectionDescriptor;
    use crate::vault::{Connector, LocalConnector, VaultClient, VaultError};

    /// Wraps the in-memory local vault and counts opened sessions.
    pub struct CountingConnector {
        pub inner: LocalConnector,
        pub sessions: AtomicUsize,
    }

    impl CountingConnector {
        pub fn new() -> Self {
            Self {
                inner: LocalConnector::in_memory(),
                sessions: AtomicUsize::new(0),
            }
        }

        pub fn session_count(&self) -> usize {
            self.sessions.load(Ordering::SeqCst)
        }
    }

    impl Connector for CountingConnector {
        fn connect(
            &self,
            descriptor: &ConnectionDescriptor,
        ) -> Result<Box<dyn VaultClient>, VaultError> {
            self.sessions.fetch_add(1, Ordering::SeqCst);
            self.inner.connect(descriptor)
        }
    }

    /// A connector whose sessions are always refused.
    pub struct UnavailableConnector;

    impl Connector for UnavailableConnector {
        fn connect(&self, _: &ConnectionDescriptor) -> Result<Box<dyn VaultClient>, VaultError> {
            Err(VaultError::unavailable("connection refused"))
        }
    }

    pub fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor {
            tenant: "acme".to_string(),
            client_id: "client".to_string(),
            client_secret: SecretString::from("secret".to_string()),
            top_level_domain: None,
            url_template: None,
        }
    }
}
