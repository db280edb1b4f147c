//! Lookup command handlers - reading unmanaged vault objects.

use super::Workspace;
use super::show::render;
use crate::cli::LookupCommands;
use crate::db::StoredResource;
use crate::resource::Lookup;

/// Handle the lookup subcommands
pub fn handle_lookup(
    ws: &Workspace,
    command: LookupCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    let conn = ws.descriptor()?;
    let lookup = Lookup::new(&ws.connector);

    let lines = match command {
        LookupCommands::Secret { path } => {
            render(&StoredResource::Secret(lookup.secret(&path, &conn)?))
        }
        LookupCommands::Client { client_id } => {
            render(&StoredResource::Client(lookup.client(&client_id, &conn)?))
        }
        LookupCommands::Role { name } => {
            let role = lookup.role(&name, &conn)?;
            vec![
                format!("name        = {}", role.name),
                format!("description = {}", role.description),
                format!("provider    = {}", role.provider.as_deref().unwrap_or("")),
                format!("external_id = {}", role.external_id.as_deref().unwrap_or("")),
            ]
        }
    };

    for line in lines {
        println!("{}", line);
    }
    Ok(())
}
