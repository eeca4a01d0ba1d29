// Library interface for testcompose
// Scope-aware docker-compose environments for integration tests: the
// environment is activated at most once per scope chain, shared by
// refcount, and torn down when the last getter releases.
//
// Typical session-scoped use:
//
//     use std::sync::{Arc, OnceLock};
//     use testcompose::{ActivationRegistry, CompositionSpec, ContainerGetter, HarnessConfig};
//     use testcompose::engine::ShellEngine;
//
//     static REGISTRY: OnceLock<Arc<ActivationRegistry>> = OnceLock::new();
//
//     fn registry() -> Arc<ActivationRegistry> {
//         Arc::clone(REGISTRY.get_or_init(|| {
//             let config = HarnessConfig::load(std::path::Path::new(".")).unwrap();
//             Arc::new(ActivationRegistry::new(Arc::new(ShellEngine::new()), config))
//         }))
//     }
//
//     #[test]
//     fn talks_to_the_database() {
//         let config = registry().config().clone();
//         let spec = CompositionSpec::resolve(&config.compose_files).unwrap();
//         let db = ContainerGetter::session(registry(), &spec).unwrap();
//         let endpoint = &db.get("postgres").unwrap().network_info[0];
//         // connect to endpoint.hostname:endpoint.host_port ...
//     }

pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod environment;
pub mod errors;
pub mod getter;
pub mod model;
pub mod netinfo;
pub mod registry;
pub mod report;
pub mod spec;
pub mod waiter;

pub use config::HarnessConfig;
pub use environment::{Environment, EnvironmentMode};
pub use errors::{Result, TcError};
pub use getter::ContainerGetter;
pub use model::{NetworkInfo, PortBinding, ScopeChain, ScopeLevel, Unit, UnitHandle, UnitState};
pub use registry::ActivationRegistry;
pub use report::{HarnessWarning, RunReport, WarningKind};
pub use spec::CompositionSpec;
