// Activated environment
// One live compose project: its units, the endpoint records derived from
// them, and the teardown capability. Shared behind an Arc by every getter
// attached to the same scope chain.

use crate::engine::ComposeEngine;
use crate::errors::{Result, TcError};
use crate::model::{Unit, UnitHandle};
use crate::spec::CompositionSpec;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Whether this harness owns the environment's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentMode {
    /// Built and started by the harness, torn down when the last holder
    /// releases
    Managed,
    /// Attached to externally started containers; teardown never fires
    RunningExternal,
}

#[derive(Debug)]
pub struct Environment {
    spec: CompositionSpec,
    mode: EnvironmentMode,
    units: Vec<Unit>,
    services: BTreeMap<String, Vec<UnitHandle>>,
    torn_down: AtomicBool,
}

impl Environment {
    pub(crate) fn new(
        spec: CompositionSpec,
        mode: EnvironmentMode,
        units: Vec<Unit>,
        services: BTreeMap<String, Vec<UnitHandle>>,
    ) -> Self {
        Self {
            spec,
            mode,
            units,
            services,
            torn_down: AtomicBool::new(false),
        }
    }

    pub fn spec(&self) -> &CompositionSpec {
        &self.spec
    }

    pub fn mode(&self) -> EnvironmentMode {
        self.mode
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn service_names(&self) -> Vec<&str> {
        self.services.keys().map(String::as_str).collect()
    }

    /// Unit handles for one service, in engine enumeration order
    pub fn service(&self, name: &str) -> Result<&[UnitHandle]> {
        self.services
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| TcError::ServiceNotFound {
                service: name.to_string(),
                project: self.spec.project_name().to_string(),
            })
    }

    pub fn services(&self) -> &BTreeMap<String, Vec<UnitHandle>> {
        &self.services
    }

    /// Stop the environment. Idempotent: only the first call reaches the
    /// engine, and only in managed mode.
    pub(crate) fn teardown(
        &self,
        engine: &dyn ComposeEngine,
        remove_volumes: bool,
        print_logs: bool,
    ) -> Result<()> {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if self.mode == EnvironmentMode::RunningExternal {
            return Ok(());
        }

        if print_logs {
            self.print_unit_logs(engine);
        }

        engine
            .down(&self.spec, remove_volumes)
            .map_err(|e| TcError::Teardown {
                project: self.spec.project_name().to_string(),
                detail: e.to_string(),
            })
    }

    /// Dump each unit's logs so they land in the test report
    fn print_unit_logs(&self, engine: &dyn ComposeEngine) {
        let mut units: Vec<&Unit> = self.units.iter().collect();
        units.sort_by(|a, b| a.name.cmp(&b.name));

        for unit in units {
            let logs = engine.logs(unit).unwrap_or_default();
            let header = format!("Logs from {}:", unit.name);
            eprintln!("{}", header);
            eprintln!("{}", "=".repeat(header.len()));
            if logs.is_empty() {
                eprintln!("(no logs)\n");
            } else {
                eprintln!("{}\n", logs);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ComposeEngine, FakeEngine};
    use crate::netinfo;
    use std::fs;
    use tempfile::TempDir;

    fn build_env(engine: &FakeEngine, temp: &TempDir, mode: EnvironmentMode) -> Environment {
        let file = temp.path().join("docker-compose.yml");
        fs::write(&file, "services: {}\n").unwrap();
        let spec = CompositionSpec::resolve(&[file]).unwrap();
        let units = engine.up(&spec).unwrap();
        let services = netinfo::extract(engine, &units).unwrap();
        Environment::new(spec, mode, units, services)
    }

    #[test]
    fn test_service_lookup() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine.add_service("db", &[("5432/tcp", "", 49100)]);
        let env = build_env(&engine, &temp, EnvironmentMode::Managed);

        assert_eq!(env.service_names(), vec!["db"]);
        assert_eq!(env.service("db").unwrap().len(), 1);
        assert!(matches!(
            env.service("cache"),
            Err(TcError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_teardown_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        let env = build_env(&engine, &temp, EnvironmentMode::Managed);

        env.teardown(&engine, false, false).unwrap();
        env.teardown(&engine, false, false).unwrap();
        assert_eq!(engine.down_count(), 1);
    }

    #[test]
    fn test_running_external_never_calls_down() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        let env = build_env(&engine, &temp, EnvironmentMode::RunningExternal);

        env.teardown(&engine, false, false).unwrap();
        assert_eq!(engine.down_count(), 0);
    }

    #[test]
    fn test_teardown_logs_are_pulled_when_requested() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        engine.set_logs("db", "ready to accept connections\n");
        let env = build_env(&engine, &temp, EnvironmentMode::Managed);

        env.teardown(&engine, false, true).unwrap();
        assert!(engine.calls().iter().any(|c| c.starts_with("logs:")));
    }

    #[test]
    fn test_teardown_failure_is_classified() {
        let temp = TempDir::new().unwrap();
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        let env = build_env(&engine, &temp, EnvironmentMode::Managed);

        engine.set_fail_on("down");
        assert!(matches!(
            env.teardown(&engine, false, false),
            Err(TcError::Teardown { .. })
        ));
    }
}
