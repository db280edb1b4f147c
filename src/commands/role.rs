//! Role command handlers.

use super::Workspace;
use crate::cli::RoleCommands;

/// Handle the role subcommands. Roles only exist in the local vault's
/// tenant named by the document.
pub fn handle_role(ws: &Workspace, command: RoleCommands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        RoleCommands::Add { name, description } => {
            let conn = ws.descriptor()?;
            let vault = ws.connector.vault(&conn.tenant)?;
            let role = vault.create_role(&name, description.as_deref())?;
            println!("Added role '{}' to tenant '{}'", role.name, conn.tenant);
        }
    }
    Ok(())
}
