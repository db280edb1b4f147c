//! Desired-state document definitions.

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

use knuffel::Decode;
use secrecy::SecretString;
use serde_json::Value;

use crate::error::DsvError;
use crate::resolver::ProviderSettings;
use crate::resource::{ClientResource, SecretResource};

/// Expand tilde (~) prefix to the user's home directory.
/// Handles both "~" alone and "~/path/to/something" patterns.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// The desired-state document parsed from dsv.kdl.
#[derive(Debug, Decode, Clone, Default)]
pub struct Document {
    #[knuffel(child)]
    pub defaults: Option<Defaults>,

    #[knuffel(child)]
    pub provider: Option<ProviderConfig>,

    #[knuffel(children(name = "secret"))]
    pub secrets: Vec<SecretDecl>,

    #[knuffel(children(name = "client"))]
    pub clients: Vec<ClientDecl>,
}

/// Where local files live.
#[derive(Debug, Decode, Clone, Default)]
pub struct Defaults {
    #[knuffel(property(name = "state_path"))]
    pub state_path: Option<String>,

    #[knuffel(property(name = "vault_path"))]
    pub vault_path: Option<String>,
}

/// Provider-level connection settings.
#[derive(Debug, Decode, Clone, Default)]
pub struct ProviderConfig {
    #[knuffel(property)]
    pub tenant: Option<String>,

    #[knuffel(property(name = "client_id"))]
    pub client_id: Option<String>,

    #[knuffel(property(name = "client_secret"))]
    pub client_secret: Option<String>,

    /// Name of an environment variable holding the client secret.
    #[knuffel(property(name = "client_secret_env"))]
    pub client_secret_env: Option<String>,

    #[knuffel(property)]
    pub tld: Option<String>,

    #[knuffel(property(name = "url_template"))]
    pub url_template: Option<String>,
}

/// A `secret "name" path="..." { ... }` declaration.
#[derive(Debug, Decode, Clone)]
pub struct SecretDecl {
    #[knuffel(argument)]
    pub name: String,

    #[knuffel(property)]
    pub path: String,

    #[knuffel(child, unwrap(argument))]
    pub description: Option<String>,

    #[knuffel(child)]
    pub data: Option<Entries>,

    #[knuffel(child)]
    pub attributes: Option<Entries>,
}

/// A `client "name" role="..."` declaration.
#[derive(Debug, Decode, Clone)]
pub struct ClientDecl {
    #[knuffel(argument)]
    pub name: String,

    #[knuffel(property)]
    pub role: String,

    #[knuffel(child, unwrap(argument))]
    pub description: Option<String>,
}

/// A block of `key "value"` lines.
#[derive(Debug, Decode, Clone, Default)]
pub struct Entries {
    #[knuffel(children)]
    pub entries: Vec<Entry>,
}

/// One map entry. Values are strings unless `json=true` asks for the value
/// to be parsed as JSON.
#[derive(Debug, Decode, Clone)]
pub struct Entry {
    #[knuffel(node_name)]
    pub key: String,

    #[knuffel(argument)]
    pub value: String,

    #[knuffel(property)]
    pub json: Option<bool>,
}

impl Entries {
    fn to_map(&self, address: &str) -> crate::error::Result<BTreeMap<String, Value>> {
        let mut map = BTreeMap::new();
        for entry in &self.entries {
            let value = if entry.json.unwrap_or(false) {
                serde_json::from_str(&entry.value).map_err(|e| {
                    DsvError::document(format!(
                        "{}: value of '{}' is not valid JSON: {}",
                        address, entry.key, e
                    ))
                })?
            } else {
                Value::String(entry.value.clone())
            };
            if map.insert(entry.key.clone(), value).is_some() {
                return Err(DsvError::document(format!(
                    "{}: key '{}' is declared twice",
                    address, entry.key
                )));
            }
        }
        Ok(map)
    }
}

impl SecretDecl {
    pub fn address(&self) -> String {
        format!("secret.{}", self.name)
    }

    /// Map the declaration onto a typed resource.
    pub fn to_resource(&self) -> crate::error::Result<SecretResource> {
        let address = self.address();
        let mut resource = SecretResource::new(self.path.clone());
        resource.description = self.description.clone().unwrap_or_default();
        if let Some(data) = &self.data {
            resource.data = data.to_map(&address)?;
        }
        if let Some(attributes) = &self.attributes {
            resource.attributes = attributes.to_map(&address)?;
        }
        Ok(resource)
    }
}

impl ClientDecl {
    pub fn address(&self) -> String {
        format!("client.{}", self.name)
    }

    pub fn to_resource(&self) -> ClientResource {
        let mut resource = ClientResource::new(self.role.clone());
        resource.description = self.description.clone().unwrap_or_default();
        resource
    }
}

impl ProviderConfig {
    /// Collect the declared settings. An inline client secret wins over
    /// `client_secret_env`; the environment is only read when named.
    pub fn settings(&self) -> ProviderSettings {
        let client_secret = self.client_secret.clone().or_else(|| {
            self.client_secret_env
                .as_deref()
                .and_then(|var| std::env::var(var).ok())
        });

        ProviderSettings {
            tenant: self.tenant.clone(),
            client_id: self.client_id.clone(),
            client_secret: client_secret.map(SecretString::from),
            tld: self.tld.clone(),
            url_template: self.url_template.clone(),
        }
    }
}

impl Document {
    /// Get the state database path, defaulting to "./.dsv/state.db"
    pub fn state_path(&self) -> PathBuf {
        self.defaults
            .as_ref()
            .and_then(|d| d.state_path.as_deref())
            .map(expand_tilde)
            .unwrap_or_else(|| PathBuf::from("./.dsv/state.db"))
    }

    /// Get the local vault directory, defaulting to "./.dsv/vault"
    pub fn vault_path(&self) -> PathBuf {
        self.defaults
            .as_ref()
            .and_then(|d| d.vault_path.as_deref())
            .map(expand_tilde)
            .unwrap_or_else(|| PathBuf::from("./.dsv/vault"))
    }

    /// Declared provider settings; empty when no provider node exists.
    pub fn provider_settings(&self) -> ProviderSettings {
        self.provider
            .as_ref()
            .map(ProviderConfig::settings)
            .unwrap_or_default()
    }

    /// Reject duplicate resource names and secrets sharing a path.
    pub fn validate(&self) -> crate::error::Result<()> {
        let mut paths = HashSet::new();
        for decl in &self.secrets {
            if !paths.insert(decl.path.as_str()) {
                return Err(DsvError::document(format!(
                    "{}: path '{}' is already declared by another secret",
                    decl.address(),
                    decl.path
                )));
            }
        }

        let mut seen = HashSet::new();
        let addresses = self
            .secrets
            .iter()
            .map(SecretDecl::address)
            .chain(self.clients.iter().map(ClientDecl::address));
        for address in addresses {
            if !seen.insert(address.clone()) {
                return Err(DsvError::document(format!(
                    "'{}' is declared more than once",
                    address
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn parse(text: &str) -> Document {
        knuffel::parse::<Document>("dsv.kdl", text).unwrap()
    }

    #[test]
    fn test_parse_full_document() {
        let doc = parse(
            r#"
            defaults state_path="/tmp/state.db" vault_path="/tmp/vault"
            provider tenant="acme" client_id="abc" client_secret="xyz" tld="eu"
            secret "db" path="app/db" {
                description "database credentials"
                data {
                    username "app"
                    password "s3cret"
                }
                attributes {
                    ttl "300" json=true
                    owner "platform"
                }
            }
            client "ci" role="deployer" {
                description "pipeline"
            }
            "#,
        );

        assert_eq!(doc.state_path(), PathBuf::from("/tmp/state.db"));
        assert_eq!(doc.vault_path(), PathBuf::from("/tmp/vault"));
        assert_eq!(doc.secrets.len(), 1);
        assert_eq!(doc.clients.len(), 1);

        let secret = doc.secrets[0].to_resource().unwrap();
        assert_eq!(secret.path, "app/db");
        assert_eq!(secret.description, "database credentials");
        assert_eq!(secret.data["password"], Value::String("s3cret".to_string()));
        assert_eq!(secret.attributes["ttl"], Value::from(300));
        assert_eq!(secret.attributes["owner"], Value::String("platform".to_string()));
        assert!(secret.identifier.is_empty());

        let client = doc.clients[0].to_resource();
        assert_eq!(client.role, "deployer");
        assert_eq!(client.description, "pipeline");
        assert_eq!(doc.clients[0].address(), "client.ci");

        let settings = doc.provider_settings();
        assert_eq!(settings.tenant.as_deref(), Some("acme"));
        assert_eq!(settings.tld.as_deref(), Some("eu"));
        assert!(settings.url_template.is_none());
        assert_eq!(settings.client_secret.unwrap().expose_secret(), "xyz");
    }

    #[test]
    fn test_defaults_when_unset() {
        let doc = parse("");
        assert_eq!(doc.state_path(), PathBuf::from("./.dsv/state.db"));
        assert!(doc.provider_settings().tenant.is_none());
    }

    #[test]
    fn test_client_secret_from_env() {
        let var = format!("DSVFORM_TEST_SECRET_{}", std::process::id());
        // SAFETY: the variable name is unique to this test.
        unsafe {
            std::env::set_var(&var, "from-env");
        }
        let doc = parse(&format!(
            r#"provider tenant="acme" client_id="abc" client_secret_env="{}""#,
            var
        ));
        let settings = doc.provider_settings();
        assert_eq!(settings.client_secret.unwrap().expose_secret(), "from-env");
        unsafe {
            std::env::remove_var(&var);
        }
    }

    #[test]
    fn test_duplicate_addresses_rejected() {
        let doc = parse(
            r#"
            secret "db" path="a" { data { k "v"; }; }
            secret "db" path="b" { data { k "v"; }; }
            "#,
        );
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_shared_path_rejected() {
        let doc = parse(
            r#"
            secret "a" path="app/db" { data { k "v"; }; }
            secret "b" path="app/db" { data { k "v"; }; }
            "#,
        );
        let err = doc.validate().unwrap_err();
        assert!(matches!(err, DsvError::Document(_)));
        assert!(err.to_string().contains("secret.b"));
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let doc = parse(r#"secret "db" path="a" { data { k "v"; k "w"; }; }"#);
        assert!(doc.secrets[0].to_resource().is_err());
    }

    #[test]
    fn test_bad_json_value_rejected() {
        let doc = parse(r#"secret "db" path="a" { data { k "{" json=true; }; }"#);
        let err = doc.secrets[0].to_resource().unwrap_err();
        assert!(err.to_string().contains("not valid JSON"));
    }
}
