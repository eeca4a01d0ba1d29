// Shell binding to docker compose
// All invocations go through the project name and file list carried by the
// spec, so concurrent projects never see each other's containers.

use crate::engine::ComposeEngine;
use crate::errors::{Result, TcError};
use crate::model::{PortBinding, Unit, UnitState};
use crate::spec::CompositionSpec;
use regex::Regex;
use serde::Deserialize;
use std::process::Command;

/// Docker Compose command variant
#[derive(Debug, Clone, Copy)]
pub enum ComposeVariant {
    /// Legacy docker-compose (with hyphen)
    Hyphenated,
    /// Modern docker compose (no hyphen, subcommand of docker)
    Subcommand,
}

/// One line of `docker compose ps --format json` output
#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Service")]
    service: String,
    #[serde(rename = "State")]
    state: String,
}

pub struct ShellEngine {
    variant: ComposeVariant,
}

impl ShellEngine {
    pub fn new() -> Self {
        Self {
            variant: Self::detect_variant(),
        }
    }

    /// Pin the compose variant instead of probing for it
    pub fn with_variant(variant: ComposeVariant) -> Self {
        Self { variant }
    }

    /// Detect which docker-compose variant is available, preferring the
    /// modern subcommand
    fn detect_variant() -> ComposeVariant {
        let modern = Command::new("docker")
            .arg("compose")
            .arg("version")
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false);

        if modern {
            ComposeVariant::Subcommand
        } else {
            ComposeVariant::Hyphenated
        }
    }

    /// Get the compose program and args for the detected variant, with the
    /// project name and every compose file prepended
    fn compose_command(&self, spec: &CompositionSpec, args: &[&str]) -> (String, Vec<String>) {
        let mut scoped = vec!["-p".to_string(), spec.project_name().to_string()];
        for file in spec.files() {
            scoped.push("-f".to_string());
            scoped.push(file.to_string_lossy().to_string());
        }
        scoped.extend(args.iter().map(|a| a.to_string()));

        match self.variant {
            ComposeVariant::Subcommand => {
                let mut full = vec!["compose".to_string()];
                full.extend(scoped);
                ("docker".to_string(), full)
            }
            ComposeVariant::Hyphenated => ("docker-compose".to_string(), scoped),
        }
    }

    /// Run a compose subcommand and return its stdout
    fn run_compose(&self, spec: &CompositionSpec, op: &str, args: &[&str]) -> Result<String> {
        let (program, full_args) = self.compose_command(spec, args);
        let output = Command::new(&program)
            .args(&full_args)
            .current_dir(spec.project_dir())
            .output()
            .map_err(|e| TcError::Engine {
                op: op.to_string(),
                detail: format!("failed to run {}: {}", program, e),
            })?;

        if !output.status.success() {
            return Err(TcError::Engine {
                op: op.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run a plain docker subcommand (per-container operations)
    fn run_docker(&self, op: &str, args: &[&str]) -> Result<String> {
        let output = Command::new("docker")
            .args(args)
            .output()
            .map_err(|e| TcError::Engine {
                op: op.to_string(),
                detail: format!("failed to run docker: {}", e),
            })?;

        if !output.status.success() {
            return Err(TcError::Engine {
                op: op.to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn ps_units(&self, spec: &CompositionSpec, args: &[&str]) -> Result<Vec<Unit>> {
        let mut full_args = vec!["ps"];
        full_args.extend_from_slice(args);
        full_args.extend_from_slice(&["--format", "json"]);
        let stdout = self.run_compose(spec, "ps", &full_args)?;
        parse_ps_output(&stdout)
    }
}

impl Default for ShellEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeEngine for ShellEngine {
    fn build(&self, spec: &CompositionSpec) -> Result<()> {
        self.run_compose(spec, "build", &["build"])?;
        Ok(())
    }

    fn up(&self, spec: &CompositionSpec) -> Result<Vec<Unit>> {
        self.run_compose(spec, "up", &["up", "-d"])?;
        self.ps_units(spec, &["-a"])
    }

    fn down(&self, spec: &CompositionSpec, remove_volumes: bool) -> Result<()> {
        let mut args = vec!["down", "--remove-orphans"];
        if remove_volumes {
            args.push("--volumes");
        }
        self.run_compose(spec, "down", &args)?;
        Ok(())
    }

    fn list_running(&self, spec: &CompositionSpec) -> Result<Vec<Unit>> {
        self.ps_units(spec, &[])
    }

    fn services(&self, spec: &CompositionSpec) -> Result<Vec<String>> {
        let stdout = self.run_compose(spec, "config", &["config", "--services"])?;
        Ok(stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    fn status(&self, _spec: &CompositionSpec, unit: &Unit) -> Result<UnitState> {
        let stdout = self.run_docker(
            "inspect",
            &["inspect", "-f", "{{.State.Status}}", &unit.id],
        )?;
        Ok(UnitState::from_engine(stdout.trim()))
    }

    fn port_bindings(&self, unit: &Unit) -> Result<Vec<PortBinding>> {
        let stdout = self.run_docker("port", &["port", &unit.id])?;
        Ok(stdout.lines().filter_map(parse_port_line).collect())
    }

    fn logs(&self, unit: &Unit) -> Result<String> {
        let output = Command::new("docker")
            .args(["logs", &unit.id])
            .output()
            .map_err(|e| TcError::Engine {
                op: "logs".to_string(),
                detail: format!("failed to run docker: {}", e),
            })?;

        // docker logs interleaves the container's stdout and stderr
        let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }
}

/// Parse `docker compose ps --format json` output. Depending on the
/// engine version this is either one JSON object per line or a single
/// JSON array.
fn parse_ps_output(stdout: &str) -> Result<Vec<Unit>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| TcError::Engine {
            op: "ps".to_string(),
            detail: format!("unparseable ps output: {}", e),
        })?
    } else {
        trimmed
            .lines()
            .map(|line| serde_json::from_str(line))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| TcError::Engine {
                op: "ps".to_string(),
                detail: format!("unparseable ps output: {}", e),
            })?
    };

    Ok(entries
        .into_iter()
        .map(|entry| Unit {
            id: entry.id,
            name: entry.name,
            service: entry.service,
            state: UnitState::from_engine(&entry.state),
        })
        .collect())
}

/// Parse one line of `docker port` output, e.g.
/// `8000/tcp -> 0.0.0.0:32768` or `8000/tcp -> [::]:32768`
fn parse_port_line(line: &str) -> Option<PortBinding> {
    // Compiled per call; port listings are a handful of lines
    let re = Regex::new(r"^(?P<cport>\S+)\s*->\s*(?P<addr>\S+):(?P<port>\d+)$").unwrap();
    let caps = re.captures(line.trim())?;

    let host_address = caps["addr"].trim_matches(|c| c == '[' || c == ']').to_string();
    let host_port = caps["port"].parse().ok()?;

    Some(PortBinding {
        container_port: caps["cport"].to_string(),
        host_address,
        host_port,
    })
}
