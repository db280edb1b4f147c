//! Desired-state document loading and generation.

use std::path::{Path, PathBuf};

use super::types::Document;
use crate::error::{DsvError, Result};

const DOCUMENT_NAME: &str = "dsv.kdl";

impl Document {
    /// Get the explicit ~/.config/dsvform/dsv.kdl path
    fn xdg_document_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".config/dsvform").join(DOCUMENT_NAME))
    }

    /// Get the list of document search paths in priority order
    fn get_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(DOCUMENT_NAME)];
        if let Some(xdg_path) = Self::xdg_document_path() {
            paths.push(xdg_path);
        }
        paths
    }

    /// Find an existing document by searching the standard locations
    pub fn find_existing() -> Option<PathBuf> {
        Self::get_search_paths()
            .into_iter()
            .find(|path| path.exists())
    }

    /// Load and validate a document from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DsvError::document(format!("unable to read {}: {}", path.display(), e))
        })?;
        let name = path.to_string_lossy();
        let document = knuffel::parse::<Document>(&name, &content)?;
        document.validate()?;
        Ok(document)
    }

    /// Load the document at `path`, or search the standard locations
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load_from_path(p),
            None => match Self::find_existing() {
                Some(found) => Self::load_from_path(&found),
                None => Err(DsvError::document(format!(
                    "no {} found; run 'dsvform init' to create one",
                    DOCUMENT_NAME
                ))),
            },
        }
    }

    /// Write a starter document
    pub fn generate_file(path: Option<PathBuf>, overwrite: bool) -> Result<PathBuf> {
        let path = path.unwrap_or_else(|| PathBuf::from(DOCUMENT_NAME));

        if path.exists() && !overwrite {
            return Err(DsvError::document(format!(
                "{} already exists. Use --overwrite to replace it.",
                path.display()
            )));
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let kdl_content = r#"// Local files (state holds sensitive values; keep it out of version control)
defaults state_path="./.dsv/state.db" vault_path="./.dsv/vault"

// Connection settings. tld and url_template are optional overrides.
provider tenant="my-tenant" client_id="my-client-id" client_secret_env="DSV_CLIENT_SECRET"

// Example secret
// secret "database" path="apps/web/database" {
//     description "web database credentials"
//     data {
//         username "web"
//         password "change-me"
//     }
//     attributes {
//         ttl "3600" json=true
//     }
// }

// Example client credentials for an existing role
// client "ci" role="deployer"
"#;

        std::fs::write(&path, kdl_content)?;
        Ok(path)
    }
}
