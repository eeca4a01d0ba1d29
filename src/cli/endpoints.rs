use crate::cli::resolve_spec;
use crate::engine::{ComposeEngine, ShellEngine};
use crate::errors::{Result, TcError};
use crate::netinfo;
use std::path::PathBuf;

/// Print service endpoints, optionally for one service, optionally as JSON
pub fn run(files: Vec<PathBuf>, service: Option<String>, json: bool) -> Result<()> {
    let spec = resolve_spec(&files)?;
    let engine = ShellEngine::new();

    let units = engine.list_running(&spec)?;
    let mut services = netinfo::extract(&engine, &units)?;

    if let Some(name) = service {
        let handles = services.remove(&name).ok_or_else(|| TcError::ServiceNotFound {
            service: name.clone(),
            project: spec.project_name().to_string(),
        })?;
        services = std::iter::once((name, handles)).collect();
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&services)
                .map_err(|e| TcError::ConfigError(format!("serialization failed: {}", e)))?
        );
        return Ok(());
    }

    for (name, handles) in &services {
        for handle in handles {
            if handle.network_info.is_empty() {
                println!("{} ({}): no exposed ports", name, handle.unit.name);
                continue;
            }
            for info in &handle.network_info {
                println!(
                    "{} ({}): {} -> {}:{}",
                    name, handle.unit.name, info.container_port, info.hostname, info.host_port
                );
            }
        }
    }

    Ok(())
}
