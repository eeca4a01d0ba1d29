use crate::cli::resolve_spec;
use crate::config::HarnessConfig;
use crate::engine::{ComposeEngine, ShellEngine};
use crate::errors::Result;
use crate::netinfo;
use crate::waiter::ReadinessWaiter;
use colored::Colorize;
use std::path::PathBuf;

/// Build, start and wait for the environment, then print its endpoints
pub fn run(files: Vec<PathBuf>, no_build: bool) -> Result<()> {
    let spec = resolve_spec(&files)?;
    let config = HarnessConfig::load(&std::env::current_dir()?)?;
    let engine = ShellEngine::new();

    if !no_build && !config.no_build {
        println!("Building project '{}'...", spec.project_name());
        engine.build(&spec)?;
    }

    println!("Starting project '{}'...", spec.project_name());
    let units = engine.up(&spec)?;

    let waiter = ReadinessWaiter::new(config.poll_interval());
    let ready = waiter.wait(&engine, &spec, &units, config.startup_timeout()?)?;

    println!(
        "{} {} container(s) running",
        "✓".bright_green(),
        ready.len()
    );

    let services = netinfo::extract(&engine, &ready)?;
    for (service, handles) in &services {
        for handle in handles {
            for info in &handle.network_info {
                println!(
                    "  {} {} -> {}:{}",
                    service.bright_cyan(),
                    info.container_port,
                    info.hostname,
                    info.host_port
                );
            }
        }
    }

    Ok(())
}
