//! Show command handler - printing stored state.

use std::collections::BTreeMap;

use serde_json::Value;

use super::Workspace;
use crate::db::StoredResource;
use crate::utils::SENSITIVE;

/// Handle the show command
pub fn handle_show(
    ws: &Workspace,
    address: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let entries = match address {
        Some(address) => match ws.store.get(&address)? {
            Some(entry) => vec![entry],
            None => return Err(format!("'{}' is not in state", address).into()),
        },
        None => ws.store.list()?,
    };

    if entries.is_empty() {
        println!("No resources in state. Run 'dsvform apply' first.");
        return Ok(());
    }

    for entry in entries {
        println!("{}:", entry.address);
        for line in render(&entry.resource) {
            println!("    {}", line);
        }
        println!();
    }

    Ok(())
}

/// Attribute lines for a resource with sensitive values redacted.
pub(super) fn render(resource: &StoredResource) -> Vec<String> {
    match resource {
        StoredResource::Secret(s) => vec![
            format!("identifier  = {}", s.identifier),
            format!("path        = {}", s.path),
            format!("description = {}", s.description),
            format!("version     = {}", s.version),
            format!("data        = {}", redacted(&s.data)),
            format!("attributes  = {}", Value::Object(s.attributes.clone().into_iter().collect())),
        ],
        StoredResource::Client(c) => vec![
            format!("identifier    = {}", c.identifier),
            format!("role          = {}", c.role),
            format!("description   = {}", c.description),
            format!(
                "client_secret = {}",
                if c.client_secret.is_some() { SENSITIVE } else { "" }
            ),
        ],
    }
}

fn redacted(map: &BTreeMap<String, Value>) -> String {
    let keys: Vec<String> = map
        .keys()
        .map(|k| format!("{}: {}", k, SENSITIVE))
        .collect();
    format!("{{{}}}", keys.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::SecretResource;

    #[test]
    fn test_render_hides_data_values() {
        let mut secret = SecretResource::new("app/db");
        secret
            .data
            .insert("password".to_string(), Value::String("hunter2".to_string()));
        secret
            .attributes
            .insert("ttl".to_string(), Value::from(60));

        let lines = render(&StoredResource::Secret(secret)).join("\n");
        assert!(!lines.contains("hunter2"));
        assert!(lines.contains("password: (sensitive)"));
        assert!(lines.contains("{\"ttl\":60}"));
    }
}
