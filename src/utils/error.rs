//! Error formatting utilities.

use crate::error::DsvError;
use crate::vault::{VaultError, VaultErrorKind};

/// Format an error in a user-friendly way.
/// Appends a hint for vault failures the operator can act on.
pub fn format_error(e: &(dyn std::error::Error + 'static)) -> String {
    let msg = e.to_string();

    if let Some(DsvError::Configuration(_)) = e.downcast_ref::<DsvError>() {
        return format!("{} (check the provider node in dsv.kdl)", msg);
    }

    let hint = match vault_error(e).map(|v| v.kind) {
        Some(VaultErrorKind::Unauthorized) => Some("check tenant and client credentials"),
        Some(VaultErrorKind::Conflict) => Some("another object already uses this key"),
        Some(VaultErrorKind::Unavailable) => Some("the vault could not be reached"),
        _ => None,
    };

    match hint {
        Some(hint) => format!("{} ({})", msg, hint),
        // Default: return the Display version (cleaner than Debug)
        None => msg,
    }
}

fn vault_error<'a>(e: &'a (dyn std::error::Error + 'static)) -> Option<&'a VaultError> {
    let mut current = Some(e);
    while let Some(err) = current {
        if let Some(vault) = err.downcast_ref::<VaultError>() {
            return Some(vault);
        }
        current = err.source();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResourceKind;

    #[test]
    fn test_hint_for_wrapped_vault_error() {
        let err = DsvError::create(
            ResourceKind::Secret,
            "app/db",
            VaultError::conflict("path in use"),
        );
        let msg = format_error(&err);
        assert!(msg.starts_with("unable to create secret 'app/db'"));
        assert!(msg.ends_with("(another object already uses this key)"));
    }

    #[test]
    fn test_plain_errors_unchanged() {
        let err = DsvError::document("bad node");
        assert_eq!(format_error(&err), "document error: bad node");
    }
}
