//! Diff computation between the document and stored state.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::config::Document;
use crate::db::{StateEntry, StoredResource};
use crate::error::Result;

/// What apply will do to one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Create,
    /// Delete the existing object and create a new one.
    Replace,
    Update,
    NoOp,
    Delete,
}

impl Action {
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::Create => "+",
            Action::Replace => "-/+",
            Action::Update => "~",
            Action::NoOp => " ",
            Action::Delete => "-",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Action::Create => "create",
            Action::Replace => "replace",
            Action::Update => "update",
            Action::NoOp => "no-op",
            Action::Delete => "delete",
        };
        f.write_str(s)
    }
}

/// A planned action with the states on both sides.
#[derive(Debug, Clone)]
pub struct Change {
    pub address: String,
    pub action: Action,
    pub desired: Option<StoredResource>,
    pub current: Option<StoredResource>,
}

#[derive(Debug, Clone, Default)]
pub struct Plan {
    pub changes: Vec<Change>,
}

impl Plan {
    /// Compare declared resources with `state`.
    ///
    /// Deletions of undeclared addresses come first, sorted by address, so
    /// the paths they hold are free before anything is created. Declared
    /// secrets follow in document order, then declared clients.
    pub fn compute(document: &Document, state: &[StateEntry]) -> Result<Plan> {
        let stored: BTreeMap<&str, &StoredResource> = state
            .iter()
            .map(|e| (e.address.as_str(), &e.resource))
            .collect();

        let mut declared = Vec::new();
        for decl in &document.secrets {
            declared.push((decl.address(), StoredResource::Secret(decl.to_resource()?)));
        }
        for decl in &document.clients {
            declared.push((decl.address(), StoredResource::Client(decl.to_resource())));
        }

        let seen: HashSet<&str> = declared.iter().map(|(a, _)| a.as_str()).collect();
        let mut changes = Vec::new();

        for (address, current) in &stored {
            if !seen.contains(address) {
                changes.push(Change {
                    address: address.to_string(),
                    action: Action::Delete,
                    desired: None,
                    current: Some((*current).clone()),
                });
            }
        }

        for (address, desired) in declared.iter().cloned() {
            let current = stored.get(address.as_str()).map(|r| (*r).clone());
            let action = match &current {
                None => Action::Create,
                Some(current) => diff(&desired, current),
            };
            changes.push(Change {
                address,
                action,
                desired: Some(desired),
                current,
            });
        }

        Ok(Plan { changes })
    }

    pub fn has_changes(&self) -> bool {
        self.changes.iter().any(|c| c.action != Action::NoOp)
    }

    pub fn count(&self, action: Action) -> usize {
        self.changes.iter().filter(|c| c.action == action).count()
    }
}

fn diff(desired: &StoredResource, current: &StoredResource) -> Action {
    match (desired, current) {
        (StoredResource::Secret(d), StoredResource::Secret(c)) => {
            if d.path != c.path {
                Action::Replace
            } else if !d.same_content(c) {
                Action::Update
            } else {
                Action::NoOp
            }
        }
        // Clients cannot be changed in place.
        (StoredResource::Client(d), StoredResource::Client(c)) => {
            if d.role != c.role || d.description != c.description {
                Action::Replace
            } else {
                Action::NoOp
            }
        }
        _ => Action::Replace,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ClientResource, SecretResource};
    use chrono::Utc;
    use serde_json::Value;

    fn document(text: &str) -> Document {
        knuffel::parse::<Document>("dsv.kdl", text).unwrap()
    }

    fn stored_secret(address: &str, path: &str, password: &str) -> StateEntry {
        let mut s = SecretResource::new(path);
        s.identifier = "id".to_string();
        s.version = 1;
        s.data
            .insert("password".to_string(), Value::String(password.to_string()));
        StateEntry {
            address: address.to_string(),
            resource: StoredResource::Secret(s),
            updated_at: Utc::now(),
        }
    }

    fn actions(plan: &Plan) -> Vec<(&str, Action)> {
        plan.changes
            .iter()
            .map(|c| (c.address.as_str(), c.action))
            .collect()
    }

    #[test]
    fn test_plan_actions() {
        let doc = document(
            r#"
            secret "same" path="a/same" { data { password "pw"; }; }
            secret "changed" path="a/changed" { data { password "new"; }; }
            secret "moved" path="a/moved-here" { data { password "pw"; }; }
            secret "fresh" path="a/fresh" { data { password "pw"; }; }
            "#,
        );
        let state = vec![
            stored_secret("secret.same", "a/same", "pw"),
            stored_secret("secret.changed", "a/changed", "old"),
            stored_secret("secret.moved", "a/moved", "pw"),
            stored_secret("secret.gone", "a/gone", "pw"),
        ];

        let plan = Plan::compute(&doc, &state).unwrap();
        assert_eq!(
            actions(&plan),
            vec![
                ("secret.gone", Action::Delete),
                ("secret.same", Action::NoOp),
                ("secret.changed", Action::Update),
                ("secret.moved", Action::Replace),
                ("secret.fresh", Action::Create),
            ]
        );
        assert!(plan.has_changes());
        assert_eq!(plan.count(Action::NoOp), 1);
    }

    #[test]
    fn test_renamed_address_deletes_before_create() {
        let doc = document(r#"secret "new" path="app/db" { data { password "pw"; }; }"#);
        let state = vec![stored_secret("secret.old", "app/db", "pw")];

        let plan = Plan::compute(&doc, &state).unwrap();
        assert_eq!(
            actions(&plan),
            vec![("secret.old", Action::Delete), ("secret.new", Action::Create)]
        );
    }

    #[test]
    fn test_client_role_change_replaces() {
        let doc = document(r#"client "ci" role="writer""#);
        let mut client = ClientResource::new("reader");
        client.identifier = "c-1".to_string();
        let state = vec![StateEntry {
            address: "client.ci".to_string(),
            resource: StoredResource::Client(client),
            updated_at: Utc::now(),
        }];

        let plan = Plan::compute(&doc, &state).unwrap();
        assert_eq!(actions(&plan), vec![("client.ci", Action::Replace)]);
    }

    #[test]
    fn test_empty_plan() {
        let plan = Plan::compute(&Document::default(), &[]).unwrap();
        assert!(!plan.has_changes());
        assert!(plan.changes.is_empty());
    }
}
