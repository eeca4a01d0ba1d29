// Readiness waiter
// Polls the engine until every unit reports running or the deadline
// passes. Confirms only that the container process is up; application
// readiness (an HTTP 200, a ready log line) stays with the test author,
// layered on the endpoint records.

use crate::clock::{Clock, SystemClock};
use crate::engine::ComposeEngine;
use crate::errors::{Result, TcError};
use crate::model::{Unit, UnitState};
use crate::spec::CompositionSpec;
use std::time::Duration;

pub struct ReadinessWaiter<C: Clock = SystemClock> {
    clock: C,
    poll_interval: Duration,
}

impl ReadinessWaiter<SystemClock> {
    pub fn new(poll_interval: Duration) -> Self {
        Self {
            clock: SystemClock,
            poll_interval,
        }
    }
}

impl<C: Clock> ReadinessWaiter<C> {
    pub fn with_clock(clock: C, poll_interval: Duration) -> Self {
        Self {
            clock,
            poll_interval,
        }
    }

    /// Block until every unit is running, returning the units with their
    /// refreshed state. A deadline miss is terminal for the activation
    /// attempt; the caller rolls back whatever started.
    pub fn wait(
        &self,
        engine: &dyn ComposeEngine,
        spec: &CompositionSpec,
        units: &[Unit],
        timeout: Duration,
    ) -> Result<Vec<Unit>> {
        let start = self.clock.now();

        loop {
            let mut refreshed = Vec::with_capacity(units.len());
            let mut pending = Vec::new();

            for unit in units {
                let state = engine.status(spec, unit)?;
                if state != UnitState::Running {
                    pending.push(unit.name.clone());
                }
                refreshed.push(Unit {
                    state,
                    ..unit.clone()
                });
            }

            if pending.is_empty() {
                return Ok(refreshed);
            }

            if self.clock.now().duration_since(start) >= timeout {
                return Err(TcError::StartupTimeout {
                    project: spec.project_name().to_string(),
                    pending,
                    timeout_secs: timeout.as_secs(),
                });
            }

            self.clock.sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::test_support::FakeClock;
    use crate::engine::FakeEngine;
    use std::fs;
    use tempfile::TempDir;

    fn spec_in(temp: &TempDir) -> CompositionSpec {
        let file = temp.path().join("docker-compose.yml");
        fs::write(&file, "services: {}\n").unwrap();
        CompositionSpec::resolve(&[file]).unwrap()
    }

    #[test]
    fn test_returns_once_everything_is_running() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        engine.add_service("api", &[]);
        engine.set_startup_polls(3);

        let units = engine.up(&spec).unwrap();
        let clock = FakeClock::new();
        let waiter = ReadinessWaiter::with_clock(clock.clone(), Duration::from_millis(250));

        let ready = waiter
            .wait(&engine, &spec, &units, Duration::from_secs(30))
            .unwrap();

        assert!(ready.iter().all(|u| u.is_running()));
        // Two polls short of ready, so the loop slept twice
        assert_eq!(clock.sleep_count(), 2);
    }

    #[test]
    fn test_timeout_names_the_stragglers() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);
        engine.add_service("slow", &[]);
        engine.set_never_ready("slow");
        engine.set_startup_polls(1);

        let units = engine.up(&spec).unwrap();
        let waiter = ReadinessWaiter::with_clock(FakeClock::new(), Duration::from_millis(250));

        let err = waiter
            .wait(&engine, &spec, &units, Duration::from_secs(1))
            .unwrap_err();

        match err {
            TcError::StartupTimeout {
                project,
                pending,
                timeout_secs,
            } => {
                assert_eq!(project, spec.project_name());
                assert_eq!(timeout_secs, 1);
                assert_eq!(pending.len(), 1);
                assert!(pending[0].contains("slow"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_polls_at_least_once_with_zero_timeout() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);

        let units = engine.up(&spec).unwrap();
        let clock = FakeClock::new();
        let waiter = ReadinessWaiter::with_clock(clock.clone(), Duration::from_millis(250));

        // Already running, so even a zero deadline succeeds
        let ready = waiter
            .wait(&engine, &spec, &units, Duration::ZERO)
            .unwrap();
        assert_eq!(ready.len(), 1);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[test]
    fn test_engine_errors_propagate() {
        let temp = TempDir::new().unwrap();
        let spec = spec_in(&temp);
        let engine = FakeEngine::new();
        engine.add_service("db", &[]);

        let units = engine.up(&spec).unwrap();
        engine.set_fail_on("status");
        let waiter = ReadinessWaiter::with_clock(FakeClock::new(), Duration::from_millis(250));

        assert!(matches!(
            waiter.wait(&engine, &spec, &units, Duration::from_secs(5)),
            Err(TcError::Engine { .. })
        ));
    }
}
