//! Log command handler - viewing operation history.

use chrono_humanize::HumanTime;

use super::Workspace;

/// Handle the log command - show recorded operations, newest first
pub fn handle_log(ws: &Workspace, limit: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let operations = ws.store.list_operations(limit)?;

    if operations.is_empty() {
        println!("No operations recorded yet.");
        return Ok(());
    }

    println!("Operation log:");
    for op in operations {
        let age = HumanTime::from(op.created_at);
        let details = op.details.as_deref().unwrap_or("");
        println!(
            "  {:>4} | {} | {:8} | {} {}",
            op.id, age, op.operation_type, op.address, details
        );
    }

    Ok(())
}
