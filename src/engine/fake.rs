// Scriptable in-memory engine
// Stands in for docker compose in tests: scripted services and ports,
// staged startup (units reach running after a configurable number of
// status polls), call recording, and failure injection.

use crate::engine::ComposeEngine;
use crate::errors::{Result, TcError};
use crate::model::{PortBinding, Unit, UnitState};
use crate::spec::CompositionSpec;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Clone)]
struct ServiceDef {
    name: String,
    replicas: usize,
    ports: Vec<PortBinding>,
    logs: String,
}

#[derive(Debug, Default)]
struct Inner {
    services: Vec<ServiceDef>,
    units: Vec<Unit>,
    next_id: u32,
    startup_polls: u32,
    polls_remaining: HashMap<String, u32>,
    never_ready: HashSet<String>,
    calls: Vec<String>,
    fail_on: Option<String>,
    builds: u32,
    ups: u32,
    downs: u32,
}

#[derive(Debug, Default)]
pub struct FakeEngine {
    inner: Mutex<Inner>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a single-replica service with the given port bindings
    /// (container port, host address, host port)
    pub fn add_service(&self, name: &str, ports: &[(&str, &str, u16)]) {
        self.add_scaled_service(name, 1, ports);
    }

    /// Script a horizontally scaled service; each replica reports the same
    /// port bindings
    pub fn add_scaled_service(&self, name: &str, replicas: usize, ports: &[(&str, &str, u16)]) {
        let ports = ports
            .iter()
            .map(|(container_port, host_address, host_port)| PortBinding {
                container_port: container_port.to_string(),
                host_address: host_address.to_string(),
                host_port: *host_port,
            })
            .collect();
        self.inner.lock().unwrap().services.push(ServiceDef {
            name: name.to_string(),
            replicas,
            ports,
            logs: String::new(),
        });
    }

    /// Units started from now on become running only after this many
    /// status polls
    pub fn set_startup_polls(&self, polls: u32) {
        self.inner.lock().unwrap().startup_polls = polls;
    }

    /// Units of this service stay pending forever
    pub fn set_never_ready(&self, service: &str) {
        self.inner
            .lock()
            .unwrap()
            .never_ready
            .insert(service.to_string());
    }

    /// Fail the next calls of the named operation
    pub fn set_fail_on(&self, op: &str) {
        self.inner.lock().unwrap().fail_on = Some(op.to_string());
    }

    pub fn clear_fail_on(&self) {
        self.inner.lock().unwrap().fail_on = None;
    }

    pub fn set_logs(&self, service: &str, logs: &str) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(def) = inner.services.iter_mut().find(|d| d.name == service) {
            def.logs = logs.to_string();
        }
    }

    /// Simulate a service's containers exiting after startup
    pub fn stop_service(&self, service: &str) {
        let mut inner = self.inner.lock().unwrap();
        for unit in inner.units.iter_mut().filter(|u| u.service == service) {
            unit.state = UnitState::Exited;
        }
    }

    /// Simulate containers started outside the harness (running mode)
    pub fn start_service_externally(&self, spec: &CompositionSpec, service: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.start_units(spec, Some(service), 0);
    }

    pub fn start_all_externally(&self, spec: &CompositionSpec) {
        let mut inner = self.inner.lock().unwrap();
        inner.start_units(spec, None, 0);
    }

    pub fn calls(&self) -> Vec<String> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn build_count(&self) -> u32 {
        self.inner.lock().unwrap().builds
    }

    pub fn up_count(&self) -> u32 {
        self.inner.lock().unwrap().ups
    }

    pub fn down_count(&self) -> u32 {
        self.inner.lock().unwrap().downs
    }
}

impl Inner {
    fn record(&mut self, call: &str) {
        self.calls.push(call.to_string());
    }

    fn check_fail(&self, op: &str) -> Result<()> {
        if self.fail_on.as_deref() == Some(op) {
            return Err(TcError::Engine {
                op: op.to_string(),
                detail: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    /// Start units for every scripted service (or one service), skipping
    /// replicas that are already up
    fn start_units(&mut self, spec: &CompositionSpec, only: Option<&str>, startup_polls: u32) {
        let defs: Vec<ServiceDef> = self
            .services
            .iter()
            .filter(|d| only.map_or(true, |name| d.name == name))
            .cloned()
            .collect();

        for def in defs {
            let existing = self.units.iter().filter(|u| u.service == def.name).count();
            for replica in existing..def.replicas {
                self.next_id += 1;
                let id = format!("u{}", self.next_id);
                let state = if startup_polls == 0 && !self.never_ready.contains(&def.name) {
                    UnitState::Running
                } else {
                    UnitState::Pending
                };
                if startup_polls > 0 {
                    self.polls_remaining.insert(id.clone(), startup_polls);
                }
                self.units.push(Unit {
                    id,
                    name: format!("{}-{}-{}", spec.project_name(), def.name, replica + 1),
                    service: def.name.clone(),
                    state,
                });
            }
        }
    }
}

impl ComposeEngine for FakeEngine {
    fn build(&self, _spec: &CompositionSpec) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.record("build");
        inner.check_fail("build")?;
        inner.builds += 1;
        Ok(())
    }

    fn up(&self, spec: &CompositionSpec) -> Result<Vec<Unit>> {
        let mut inner = self.inner.lock().unwrap();
        inner.record("up");
        inner.check_fail("up")?;
        inner.ups += 1;
        let polls = inner.startup_polls;
        inner.start_units(spec, None, polls);
        Ok(inner.units.clone())
    }

    fn down(&self, _spec: &CompositionSpec, _remove_volumes: bool) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.record("down");
        inner.check_fail("down")?;
        inner.downs += 1;
        inner.units.clear();
        inner.polls_remaining.clear();
        Ok(())
    }

    fn list_running(&self, _spec: &CompositionSpec) -> Result<Vec<Unit>> {
        let mut inner = self.inner.lock().unwrap();
        inner.record("list_running");
        inner.check_fail("list_running")?;
        Ok(inner.units.clone())
    }

    fn services(&self, _spec: &CompositionSpec) -> Result<Vec<String>> {
        let mut inner = self.inner.lock().unwrap();
        inner.record("services");
        inner.check_fail("services")?;
        Ok(inner.services.iter().map(|d| d.name.clone()).collect())
    }

    fn status(&self, _spec: &CompositionSpec, unit: &Unit) -> Result<UnitState> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(&format!("status:{}", unit.name));
        inner.check_fail("status")?;

        let ready = match inner.polls_remaining.get_mut(&unit.id) {
            Some(remaining) => {
                *remaining = remaining.saturating_sub(1);
                *remaining == 0
            }
            None => true,
        };

        let never_ready = inner.never_ready.contains(&unit.service);
        if let Some(entry) = inner.units.iter_mut().find(|u| u.id == unit.id) {
            if ready && !never_ready && entry.state == UnitState::Pending {
                entry.state = UnitState::Running;
            }
            Ok(entry.state)
        } else {
            Ok(UnitState::Unknown)
        }
    }

    fn port_bindings(&self, unit: &Unit) -> Result<Vec<PortBinding>> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(&format!("port_bindings:{}", unit.name));
        inner.check_fail("port_bindings")?;
        Ok(inner
            .services
            .iter()
            .find(|d| d.name == unit.service)
            .map(|d| d.ports.clone())
            .unwrap_or_default())
    }

    fn logs(&self, unit: &Unit) -> Result<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(&format!("logs:{}", unit.name));
        inner.check_fail("logs")?;
        Ok(inner
            .services
            .iter()
            .find(|d| d.name == unit.service)
            .map(|d| d.logs.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn spec_in(temp: &TempDir) -> CompositionSpec {
        let file = temp.path().join("docker-compose.yml");
        fs::write(&file, "services: {}\n").unwrap();
        CompositionSpec::resolve(&[file]).unwrap()
    }

    #[test]
    fn test_up_starts_scripted_services() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[("5432/tcp", "0.0.0.0", 49100)]);
        engine.add_scaled_service("worker", 2, &[]);

        let units = engine.up(&spec).unwrap();
        assert_eq!(units.len(), 3);
        assert!(units.iter().all(|u| u.is_running()));
        assert_eq!(
            units.iter().filter(|u| u.service == "worker").count(),
            2
        );
    }

    #[test]
    fn test_up_is_idempotent_for_started_units() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);

        let first = engine.up(&spec).unwrap();
        let second = engine.up(&spec).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 1);
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn test_staged_startup_needs_polls() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("api", &[]);
        engine.set_startup_polls(2);

        let units = engine.up(&spec).unwrap();
        assert_eq!(units[0].state, UnitState::Pending);
        assert_eq!(engine.status(&spec, &units[0]).unwrap(), UnitState::Pending);
        assert_eq!(engine.status(&spec, &units[0]).unwrap(), UnitState::Running);
    }

    #[test]
    fn test_failure_injection() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        engine.set_fail_on("down");

        engine.up(&spec).unwrap();
        assert!(engine.down(&spec, false).is_err());
        engine.clear_fail_on();
        assert!(engine.down(&spec, false).is_ok());
    }

    #[test]
    fn test_down_clears_units() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);

        engine.up(&spec).unwrap();
        engine.down(&spec, false).unwrap();
        assert!(engine.list_running(&spec).unwrap().is_empty());
        assert_eq!(engine.down_count(), 1);
    }
}
