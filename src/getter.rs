// Scope-bound container getter
// The per-test accessor: acquires the environment for its scope chain on
// construction and releases it when dropped, so teardown follows the last
// getter out of scope. The four scope levels differ only in the chain they
// bind; the acquisition/release protocol is identical.

use crate::environment::Environment;
use crate::errors::Result;
use crate::model::{ScopeChain, ScopeLevel, UnitHandle, UnitState};
use crate::registry::ActivationRegistry;
use crate::report::WarningKind;
use crate::spec::CompositionSpec;
use colored::Colorize;
use std::sync::Arc;

pub struct ContainerGetter {
    registry: Arc<ActivationRegistry>,
    env: Arc<Environment>,
    released: bool,
}

impl std::fmt::Debug for ContainerGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerGetter")
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl ContainerGetter {
    /// Bind to an arbitrary scope chain
    pub fn bind(
        registry: Arc<ActivationRegistry>,
        spec: &CompositionSpec,
        chain: ScopeChain,
    ) -> Result<Self> {
        let env = registry.acquire(spec, chain)?;
        Ok(Self {
            registry,
            env,
            released: false,
        })
    }

    /// Getter scoped to a single test function
    pub fn function(
        registry: Arc<ActivationRegistry>,
        spec: &CompositionSpec,
        collection: impl Into<String>,
    ) -> Result<Self> {
        Self::bind(registry, spec, ScopeChain::new(ScopeLevel::Function, collection))
    }

    /// Getter scoped to a test class (a `mod` of related tests)
    pub fn class(
        registry: Arc<ActivationRegistry>,
        spec: &CompositionSpec,
        collection: impl Into<String>,
    ) -> Result<Self> {
        Self::bind(registry, spec, ScopeChain::new(ScopeLevel::Class, collection))
    }

    /// Getter scoped to a test module (source file)
    pub fn module(
        registry: Arc<ActivationRegistry>,
        spec: &CompositionSpec,
        collection: impl Into<String>,
    ) -> Result<Self> {
        Self::bind(registry, spec, ScopeChain::new(ScopeLevel::Module, collection))
    }

    /// Getter scoped to the whole test session
    pub fn session(registry: Arc<ActivationRegistry>, spec: &CompositionSpec) -> Result<Self> {
        Self::bind(registry, spec, ScopeChain::new(ScopeLevel::Session, "session"))
    }

    /// The first unit of a service, with its endpoint records attached.
    /// Checks live state: a service whose containers have since stopped is
    /// returned with a warning rather than refused, since it may have
    /// exited deliberately.
    pub fn get(&self, service: &str) -> Result<&UnitHandle> {
        let handles = self.get_all(service)?;
        let first = &handles[0];

        let states: Vec<UnitState> = handles
            .iter()
            .map(|h| {
                self.registry
                    .engine()
                    .status(self.env.spec(), &h.unit)
                    .unwrap_or(h.unit.state)
            })
            .collect();
        if !states.contains(&UnitState::Running) {
            self.registry.record_warning(
                WarningKind::StoppedService,
                format!(
                    "Service '{}' only has stopped containers (state: {})",
                    service, states[0]
                ),
            );
        }
        Ok(first)
    }

    /// Every unit of a service (scaled services have several)
    pub fn get_all(&self, service: &str) -> Result<&[UnitHandle]> {
        self.env.service(service)
    }

    /// The raw environment handle, for callers that need more than
    /// per-service access
    pub fn environment(&self) -> &Arc<Environment> {
        &self.env
    }

    /// Release explicitly to observe registry invariant errors; dropping
    /// the getter does the same with errors logged instead
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.registry.release(self.env.spec().project_name())
    }
}

impl Drop for ContainerGetter {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.registry.release(self.env.spec().project_name()) {
            // A registry invariant failure inside a destructor can only be
            // reported, not propagated
            eprintln!("{} {}", "✗".bright_red(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use crate::engine::FakeEngine;
    use crate::errors::TcError;
    use std::fs;
    use tempfile::TempDir;

    fn spec_in(temp: &TempDir) -> CompositionSpec {
        let file = temp.path().join("docker-compose.yml");
        fs::write(&file, "services: {}\n").unwrap();
        CompositionSpec::resolve(&[file]).unwrap()
    }

    fn registry_with(engine: FakeEngine) -> Arc<ActivationRegistry> {
        Arc::new(ActivationRegistry::new(
            Arc::new(engine),
            HarnessConfig::default(),
        ))
    }

    #[test]
    fn test_get_attaches_network_info() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("api", &[("8000/tcp", "0.0.0.0", 32768)]);
        let registry = registry_with(engine);

        let getter = ContainerGetter::function(registry, &spec, "tests::api").unwrap();
        let handle = getter.get("api").unwrap();
        assert_eq!(handle.network_info.len(), 1);
        assert_eq!(handle.network_info[0].host_port, 32768);
    }

    #[test]
    fn test_unknown_service_is_an_error() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("api", &[]);
        let registry = registry_with(engine);

        let getter = ContainerGetter::function(registry, &spec, "tests::api").unwrap();
        assert!(matches!(
            getter.get("db"),
            Err(TcError::ServiceNotFound { .. })
        ));
    }

    #[test]
    fn test_stopped_service_warns_but_returns() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = Arc::new(FakeEngine::new());
        engine.add_service("oneshot", &[]);
        let registry = Arc::new(ActivationRegistry::new(
            Arc::clone(&engine) as Arc<dyn crate::engine::ComposeEngine>,
            HarnessConfig::default(),
        ));

        let getter =
            ContainerGetter::function(Arc::clone(&registry), &spec, "tests::oneshot").unwrap();
        getter.get("oneshot").unwrap();
        assert!(registry.warnings().is_empty());

        // The container exits after the environment came up
        engine.stop_service("oneshot");

        let handle = getter.get("oneshot").unwrap();
        assert_eq!(handle.unit.service, "oneshot");
        let warnings = registry.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("oneshot"));
        assert!(warnings[0].message.contains("exited"));
    }

    #[test]
    fn test_drop_releases() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        let registry = registry_with(engine);

        {
            let _getter =
                ContainerGetter::function(Arc::clone(&registry), &spec, "tests::db").unwrap();
            assert!(registry.is_active(spec.project_name()));
        }
        assert!(!registry.is_active(spec.project_name()));
    }

    #[test]
    fn test_explicit_release_consumes() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        let registry = registry_with(engine);

        let getter = ContainerGetter::session(Arc::clone(&registry), &spec).unwrap();
        getter.release().unwrap();
        assert_eq!(registry.active_count(), 0);
    }
}
