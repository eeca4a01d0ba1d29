// Compose engine binding
// Everything the activation engine needs from docker compose, behind one
// trait so the lifecycle logic can be exercised against a fake.

pub mod fake;
pub mod shell;

pub use fake::FakeEngine;
pub use shell::ShellEngine;

use crate::errors::Result;
use crate::model::{PortBinding, Unit, UnitState};
use crate::spec::CompositionSpec;

/// Operations consumed from the compose engine. Engine failures surface as
/// `TcError::Engine` at this boundary; callers never see raw process
/// errors.
pub trait ComposeEngine: Send + Sync {
    /// Build images for the spec's services
    fn build(&self, spec: &CompositionSpec) -> Result<()>;

    /// Start the environment and return the units now started. The engine
    /// refuses a second concurrent up on one project; the registry never
    /// issues one.
    fn up(&self, spec: &CompositionSpec) -> Result<Vec<Unit>>;

    /// Stop and remove the environment. Idempotent per the engine contract.
    fn down(&self, spec: &CompositionSpec, remove_volumes: bool) -> Result<()>;

    /// Units currently started for the spec's project
    fn list_running(&self, spec: &CompositionSpec) -> Result<Vec<Unit>>;

    /// Service names declared by the composition
    fn services(&self, spec: &CompositionSpec) -> Result<Vec<String>>;

    /// Current state of one unit
    fn status(&self, spec: &CompositionSpec, unit: &Unit) -> Result<UnitState>;

    /// Host port mappings for one unit, in engine enumeration order
    fn port_bindings(&self, unit: &Unit) -> Result<Vec<PortBinding>>;

    /// Captured log output for one unit
    fn logs(&self, unit: &Unit) -> Result<String>;
}
