//! Provider settings → connection descriptor.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::{DsvError, Result};

/// Provider-level settings as declared by the operator.
///
/// Every field is optional at this point; `resolve` decides what is required.
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub tenant: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
    pub tld: Option<String>,
    pub url_template: Option<String>,
}

/// Everything a vault client needs to open a session.
///
/// Built fresh for every reconciliation pass and never persisted.
#[derive(Debug, Clone)]
pub struct ConnectionDescriptor {
    pub tenant: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub top_level_domain: Option<String>,
    pub url_template: Option<String>,
}

impl ConnectionDescriptor {
    /// The top-level domain override, or "" when the vault default applies.
    pub fn tld(&self) -> &str {
        self.top_level_domain.as_deref().unwrap_or("")
    }

    /// The URL template override, or "" when the vault default applies.
    pub fn url_template(&self) -> &str {
        self.url_template.as_deref().unwrap_or("")
    }
}

fn required(value: Option<&str>, field: &str) -> Result<String> {
    match value {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(DsvError::configuration(format!("'{}' must be set", field))),
    }
}

fn optional(value: Option<&String>) -> Option<String> {
    value.filter(|v| !v.is_empty()).cloned()
}

/// Build a connection descriptor from declared provider settings.
///
/// Optional overrides are only carried when explicitly set; no defaults are
/// injected here so the vault client can apply its own.
pub fn resolve(settings: &ProviderSettings) -> Result<ConnectionDescriptor> {
    let tenant = required(settings.tenant.as_deref(), "tenant")?;
    let client_id = required(settings.client_id.as_deref(), "client_id")?;
    let client_secret = match &settings.client_secret {
        Some(secret) if !secret.expose_secret().is_empty() => secret.clone(),
        _ => return Err(DsvError::configuration("'client_secret' must be set")),
    };

    debug!(tenant = %tenant, "tenant is set");

    let top_level_domain = optional(settings.tld.as_ref());
    if let Some(tld) = &top_level_domain {
        debug!(tld = %tld, "tld is set");
    }

    let url_template = optional(settings.url_template.as_ref());
    if let Some(template) = &url_template {
        debug!(url_template = %template, "url_template is set");
    }

    Ok(ConnectionDescriptor {
        tenant,
        client_id,
        client_secret,
        top_level_domain,
        url_template,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            tenant: Some("t".to_string()),
            client_id: Some("c".to_string()),
            client_secret: Some(SecretString::from("s".to_string())),
            tld: None,
            url_template: None,
        }
    }

    #[test]
    fn test_unset_overrides_stay_empty() {
        let descriptor = resolve(&settings()).unwrap();
        assert_eq!(descriptor.tenant, "t");
        assert_eq!(descriptor.client_id, "c");
        assert_eq!(descriptor.client_secret.expose_secret(), "s");
        assert_eq!(descriptor.tld(), "");
        assert_eq!(descriptor.url_template(), "");
        assert!(descriptor.top_level_domain.is_none());
    }

    #[test]
    fn test_overrides_carried_through() {
        let mut s = settings();
        s.tld = Some("eu".to_string());
        s.url_template = Some("https://%s.example.%s/v1/%s%s".to_string());

        let descriptor = resolve(&s).unwrap();
        assert_eq!(descriptor.tld(), "eu");
        assert_eq!(descriptor.url_template(), "https://%s.example.%s/v1/%s%s");
    }

    #[test]
    fn test_missing_required_fields() {
        for field in ["tenant", "client_id", "client_secret"] {
            let mut s = settings();
            match field {
                "tenant" => s.tenant = None,
                "client_id" => s.client_id = Some(String::new()),
                _ => s.client_secret = None,
            }
            let err = resolve(&s).unwrap_err();
            assert!(matches!(err, DsvError::Configuration(_)));
            assert!(err.to_string().contains(field));
        }
    }

    #[test]
    fn test_empty_client_secret_rejected() {
        let mut s = settings();
        s.client_secret = Some(SecretString::from(String::new()));
        let err = resolve(&s).unwrap_err();
        assert!(err.to_string().contains("client_secret"));
    }

    #[test]
    fn test_descriptor_debug_hides_secret() {
        let descriptor = resolve(&settings()).unwrap();
        let debug = format!("{:?}", descriptor);
        assert!(!debug.contains("client_secret: \"s\""));
    }
}
