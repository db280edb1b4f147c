//! Init command handler - writing a starter document.

use std::path::PathBuf;

use crate::config::Document;

/// Handle the init command
pub fn handle_init(path: Option<PathBuf>, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    let written = Document::generate_file(path, overwrite)?;
    println!("Wrote {}", written.display());
    println!("Edit the provider settings, then run 'dsvform plan'.");
    Ok(())
}
