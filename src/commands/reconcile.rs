//! Plan, apply, refresh and destroy command handlers.

use std::io::{self, Write};

use super::Workspace;
use super::show::render;
use crate::db::StoredResource;
use crate::engine::{Action, Change, Engine, Plan};

/// Handle the plan command
pub fn handle_plan(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let conn = ws.descriptor()?;
    let engine = Engine::new(&ws.connector, &conn, &ws.store);

    let plan = engine.plan(&ws.document)?;
    print_plan(&plan);
    Ok(())
}

/// Handle the apply command
pub fn handle_apply(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let conn = ws.descriptor()?;
    let engine = Engine::new(&ws.connector, &conn, &ws.store);

    let plan = engine.plan(&ws.document)?;
    print_plan(&plan);
    if !plan.has_changes() {
        return Ok(());
    }

    let summary = engine.apply(&plan)?;
    println!();
    println!(
        "Apply complete! Resources: {} created, {} updated, {} replaced, {} deleted.",
        summary.created, summary.updated, summary.replaced, summary.deleted
    );
    Ok(())
}

/// Handle the refresh command
pub fn handle_refresh(ws: &Workspace) -> Result<(), Box<dyn std::error::Error>> {
    let conn = ws.descriptor()?;
    let engine = Engine::new(&ws.connector, &conn, &ws.store);

    let summary = engine.refresh()?;
    for address in &summary.dropped {
        println!("  {} no longer exists; removed from state", address);
    }
    println!("Refreshed {} resource(s).", summary.refreshed);
    Ok(())
}

/// Handle the destroy command
pub fn handle_destroy(ws: &Workspace, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    let entries = ws.store.list()?;
    if entries.is_empty() {
        println!("No resources in state.");
        return Ok(());
    }

    println!("The following resources will be PERMANENTLY deleted:");
    for entry in &entries {
        println!("  - {}", entry.address);
    }

    if !yes {
        println!();
        print!("Type 'yes' to confirm: ");
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if input.trim().to_lowercase() != "yes" {
            println!("Aborted.");
            return Ok(());
        }
    }

    let conn = ws.descriptor()?;
    let engine = Engine::new(&ws.connector, &conn, &ws.store);
    let destroyed = engine.destroy()?;
    println!("Destroy complete! {} resource(s) destroyed.", destroyed);
    Ok(())
}

fn print_plan(plan: &Plan) {
    if !plan.has_changes() {
        println!("No changes. State matches the document.");
        return;
    }

    for change in plan.changes.iter().filter(|c| c.action != Action::NoOp) {
        println!("  {:>3} {} ({})", change.action.symbol(), change.address, change.action);
        for line in details(change) {
            println!("        {}", line);
        }
    }

    println!();
    println!(
        "Plan: {} to create, {} to update, {} to replace, {} to delete.",
        plan.count(Action::Create),
        plan.count(Action::Update),
        plan.count(Action::Replace),
        plan.count(Action::Delete)
    );
}

/// What changes for one address. Values stay hidden; only names are shown.
fn details(change: &Change) -> Vec<String> {
    match (&change.desired, &change.current) {
        (Some(StoredResource::Secret(d)), Some(StoredResource::Secret(c))) => {
            let mut lines = Vec::new();
            if d.path != c.path {
                lines.push(format!("path: {} -> {}", c.path, d.path));
            }
            if d.description != c.description {
                lines.push("description changed".to_string());
            }
            for key in d.data.keys().filter(|k| !c.data.contains_key(*k)) {
                lines.push(format!("+ data.{}", key));
            }
            for key in c.data.keys().filter(|k| !d.data.contains_key(*k)) {
                lines.push(format!("- data.{}", key));
            }
            for (key, value) in &d.data {
                if c.data.get(key).is_some_and(|old| old != value) {
                    lines.push(format!("~ data.{}", key));
                }
            }
            if d.attributes != c.attributes {
                lines.push("attributes changed".to_string());
            }
            lines
        }
        (Some(StoredResource::Client(d)), Some(StoredResource::Client(c))) => {
            let mut lines = Vec::new();
            if d.role != c.role {
                lines.push(format!("role: {} -> {}", c.role, d.role));
            }
            if d.description != c.description {
                lines.push("description changed".to_string());
            }
            lines
        }
        (Some(desired), None) => render(desired)
            .into_iter()
            .filter(|line| !line.starts_with("identifier") && !line.starts_with("version"))
            .collect(),
        _ => Vec::new(),
    }
}
