/// Common test utilities for testcompose integration tests
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;
use testcompose::engine::FakeEngine;
use testcompose::{ActivationRegistry, CompositionSpec, HarnessConfig};

/// A compose project rooted in a temp directory, with a scriptable engine
#[allow(dead_code)]
pub struct TestProject {
    pub temp_dir: TempDir,
    pub spec: CompositionSpec,
    pub engine: Arc<FakeEngine>,
}

#[allow(dead_code)]
impl TestProject {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let compose_file = temp_dir.path().join("docker-compose.yml");
        fs::write(&compose_file, "services: {}\n").expect("Failed to write compose file");

        let spec = CompositionSpec::resolve(&[compose_file]).expect("Failed to resolve spec");

        Self {
            temp_dir,
            spec,
            engine: Arc::new(FakeEngine::new()),
        }
    }

    /// Registry with default (managed-mode) config
    pub fn registry(&self) -> Arc<ActivationRegistry> {
        self.registry_with(HarnessConfig::default())
    }

    pub fn registry_with(&self, config: HarnessConfig) -> Arc<ActivationRegistry> {
        Arc::new(ActivationRegistry::new(
            Arc::clone(&self.engine) as Arc<dyn testcompose::engine::ComposeEngine>,
            config,
        ))
    }

    /// Config for attaching to externally managed containers
    pub fn running_mode_config(no_build: bool) -> HarnessConfig {
        HarnessConfig {
            use_running_containers: true,
            no_build,
            ..HarnessConfig::default()
        }
    }
}
