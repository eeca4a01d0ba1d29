use crate::cli::resolve_spec;
use crate::engine::{ComposeEngine, ShellEngine};
use crate::errors::Result;
use colored::Colorize;
use std::path::PathBuf;

/// Stop and remove the environment
pub fn run(files: Vec<PathBuf>, volumes: bool) -> Result<()> {
    let spec = resolve_spec(&files)?;
    let engine = ShellEngine::new();

    println!("Stopping project '{}'...", spec.project_name());
    engine.down(&spec, volumes)?;
    println!("{} Project stopped", "✓".bright_green());

    Ok(())
}
