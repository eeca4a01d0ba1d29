use crate::cli::resolve_spec;
use crate::engine::{ComposeEngine, ShellEngine};
use crate::errors::Result;
use std::path::PathBuf;

/// Show the state of every unit in the project
pub fn run(files: Vec<PathBuf>) -> Result<()> {
    let spec = resolve_spec(&files)?;
    let engine = ShellEngine::new();

    let units = engine.list_running(&spec)?;
    if units.is_empty() {
        println!("No containers running for project '{}'", spec.project_name());
        return Ok(());
    }

    println!("{:<30} {:<15} {:<10}", "CONTAINER", "SERVICE", "STATE");
    println!("{}", "-".repeat(55));
    for unit in units {
        println!("{:<30} {:<15} {:<10}", unit.name, unit.service, unit.state);
    }

    Ok(())
}
