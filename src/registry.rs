// Scope activation registry
// Process-wide table of active environments: who owns them (scope chain),
// how many getters are attached, and when the last release should tear
// them down. One lock guards the whole acquire/release path; the
// activation algorithm is check-then-build and must never race with
// itself, and the engine refuses a second concurrent up on one project.

use crate::config::HarnessConfig;
use crate::engine::ComposeEngine;
use crate::environment::{Environment, EnvironmentMode};
use crate::errors::{Result, TcError};
use crate::model::ScopeChain;
use crate::netinfo;
use crate::report::{HarnessWarning, RunReport, WarningKind};
use crate::spec::CompositionSpec;
use crate::waiter::ReadinessWaiter;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct ActiveEntry {
    env: Arc<Environment>,
    chain: ScopeChain,
    refcount: usize,
}

#[derive(Default)]
struct RegistryState {
    active: HashMap<String, ActiveEntry>,
    warnings: Vec<HarnessWarning>,
}

/// Owns every activated environment for one test-run process. Construct
/// once at run start, share behind an Arc, and call `shutdown` at the end
/// to surface leaks and collected warnings.
///
/// Not a cross-process coordinator: parallel test-runner worker processes
/// each build their own registry and will race on `docker compose up` for
/// a shared project. That limitation is documented, not worked around.
pub struct ActivationRegistry {
    engine: Arc<dyn ComposeEngine>,
    config: HarnessConfig,
    state: Mutex<RegistryState>,
}

impl ActivationRegistry {
    pub fn new(engine: Arc<dyn ComposeEngine>, config: HarnessConfig) -> Self {
        Self {
            engine,
            config,
            state: Mutex::new(RegistryState::default()),
        }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub(crate) fn engine(&self) -> &dyn ComposeEngine {
        self.engine.as_ref()
    }

    /// Attach a requester to the environment for (spec, chain). Reuses the
    /// active environment when the chain matches, refuses when it does
    /// not, activates when there is none.
    pub fn acquire(&self, spec: &CompositionSpec, chain: ScopeChain) -> Result<Arc<Environment>> {
        let mut state = self.state.lock().unwrap();
        let project = spec.project_name().to_string();

        if let Some(entry) = state.active.get_mut(&project) {
            if entry.chain == chain {
                entry.refcount += 1;
                return Ok(Arc::clone(&entry.env));
            }
            // Two scope levels (or two collections) cannot share one
            // environment: the engine refuses a second up, and teardown
            // timing would be ambiguous
            return Err(TcError::ScopeConflict {
                project,
                requested_scope: chain.level.to_string(),
                requested_collection: chain.collection.clone(),
                active_scope: entry.chain.level.to_string(),
                active_collection: entry.chain.collection.clone(),
            });
        }

        let env = Arc::new(self.activate(spec, &mut state.warnings)?);
        state.active.insert(
            project,
            ActiveEntry {
                env: Arc::clone(&env),
                chain,
                refcount: 1,
            },
        );
        Ok(env)
    }

    /// Detach one requester. The last release out tears the environment
    /// down (managed mode) or just drops the bookkeeping (running mode).
    /// Teardown failures are recorded as warnings, not returned: the tests
    /// that used the environment already finished.
    pub fn release(&self, project: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();

        let entry = state.active.get_mut(project).ok_or_else(|| {
            TcError::RegistryInvariant(format!(
                "release for project '{}' which has no active environment",
                project
            ))
        })?;

        if entry.refcount == 0 {
            return Err(TcError::RegistryInvariant(format!(
                "refcount underflow for project '{}'",
                project
            )));
        }

        entry.refcount -= 1;
        if entry.refcount > 0 {
            return Ok(());
        }

        // Teardown happens before the lock drops, so no new acquire can
        // observe a half-torn-down entry
        let Some(entry) = state.active.remove(project) else {
            return Ok(());
        };
        if let Err(e) = entry.env.teardown(
            self.engine.as_ref(),
            self.config.remove_volumes,
            self.config.teardown_logs,
        ) {
            state
                .warnings
                .push(HarnessWarning::emit(WarningKind::Teardown, e.to_string()));
        }
        Ok(())
    }

    /// Environment build / activation. Called with the registry lock
    /// held.
    fn activate(
        &self,
        spec: &CompositionSpec,
        warnings: &mut Vec<HarnessWarning>,
    ) -> Result<Environment> {
        let project = spec.project_name().to_string();
        let mode = if self.config.use_running_containers {
            EnvironmentMode::RunningExternal
        } else {
            EnvironmentMode::Managed
        };

        if !self.config.no_build {
            self.engine.build(spec)?;
            if mode == EnvironmentMode::RunningExternal {
                warnings.push(HarnessWarning::emit(
                    WarningKind::NoBuildHint,
                    format!(
                        "use_running_containers is set without no_build: containers already \
                         running for project '{}' will not use the freshly built images",
                        project
                    ),
                ));
            }
        }

        let units = match mode {
            EnvironmentMode::RunningExternal => {
                let expected = self.engine.services(spec)?;
                let running = self.engine.list_running(spec)?;
                let missing: Vec<String> = expected
                    .into_iter()
                    .filter(|svc| !running.iter().any(|u| &u.service == svc))
                    .collect();

                if missing.is_empty() {
                    running
                } else {
                    warnings.push(HarnessWarning::emit(
                        WarningKind::ContainerNotRunning,
                        format!(
                            "Expected running containers for project '{}' but services \
                             [{}] were not up; starting them now",
                            project,
                            missing.join(", ")
                        ),
                    ));
                    self.engine.up(spec)?
                }
            }
            EnvironmentMode::Managed => {
                let already = self.engine.list_running(spec)?;
                if !already.is_empty() {
                    return Err(TcError::EnvironmentAlreadyRunning {
                        project,
                        units: already.into_iter().map(|u| u.name).collect(),
                    });
                }
                self.engine.up(spec)?
            }
        };

        if units.is_empty() {
            return Err(TcError::NoUnitsStarted(project));
        }

        let timeout = self.config.startup_timeout()?;
        let waiter = ReadinessWaiter::new(self.config.poll_interval());
        let ready = match waiter.wait(self.engine.as_ref(), spec, &units, timeout) {
            Ok(ready) => ready,
            Err(e) => {
                self.rollback(spec, mode, warnings);
                return Err(e);
            }
        };

        let services = match netinfo::extract(self.engine.as_ref(), &ready) {
            Ok(services) => services,
            Err(e) => {
                self.rollback(spec, mode, warnings);
                return Err(e);
            }
        };

        Ok(Environment::new(spec.clone(), mode, ready, services))
    }

    /// A failed activation must not leak partially started units
    fn rollback(
        &self,
        spec: &CompositionSpec,
        mode: EnvironmentMode,
        warnings: &mut Vec<HarnessWarning>,
    ) {
        if mode != EnvironmentMode::Managed {
            return;
        }
        if let Err(e) = self.engine.down(spec, self.config.remove_volumes) {
            warnings.push(HarnessWarning::emit(
                WarningKind::Teardown,
                format!(
                    "Rollback of partially started project '{}' failed: {}",
                    spec.project_name(),
                    e
                ),
            ));
        }
    }

    pub(crate) fn record_warning(&self, kind: WarningKind, message: impl Into<String>) {
        let warning = HarnessWarning::emit(kind, message);
        self.state.lock().unwrap().warnings.push(warning);
    }

    pub fn is_active(&self, project: &str) -> bool {
        self.state.lock().unwrap().active.contains_key(project)
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().unwrap().active.len()
    }

    /// Current refcount for a project, if active
    pub fn refcount(&self, project: &str) -> Option<usize> {
        self.state
            .lock()
            .unwrap()
            .active
            .get(project)
            .map(|e| e.refcount)
    }

    pub fn warnings(&self) -> Vec<HarnessWarning> {
        self.state.lock().unwrap().warnings.clone()
    }

    /// End-of-run report: collected warnings, plus one leak warning per
    /// environment still active (the registry is expected to be empty by
    /// the time the run ends).
    pub fn shutdown(&self) -> RunReport {
        let mut state = self.state.lock().unwrap();

        let leaked: Vec<(String, usize)> = state
            .active
            .iter()
            .map(|(project, entry)| (project.clone(), entry.refcount))
            .collect();
        for (project, refcount) in leaked {
            state.warnings.push(HarnessWarning::emit(
                WarningKind::LeakedEnvironment,
                format!(
                    "Environment '{}' still active at shutdown ({} holder(s) never released)",
                    project, refcount
                ),
            ));
        }

        RunReport {
            warnings: std::mem::take(&mut state.warnings),
        }
    }
}
