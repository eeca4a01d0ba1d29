// Data model shared between the activation engine and the compose engine
// binding: running units, their port bindings, and the endpoint records
// handed to tests.

use serde::Serialize;
use std::fmt;

/// Lifecycle state of one container as reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitState {
    Pending,
    Running,
    Exited,
    Unknown,
}

impl UnitState {
    /// Map an engine-reported state string onto the lifecycle states the
    /// activation engine cares about
    pub fn from_engine(state: &str) -> Self {
        match state {
            "running" => UnitState::Running,
            "created" | "restarting" => UnitState::Pending,
            "exited" | "dead" | "removing" => UnitState::Exited,
            _ => UnitState::Unknown,
        }
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            UnitState::Pending => "pending",
            UnitState::Running => "running",
            UnitState::Exited => "exited",
            UnitState::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One running container instance, owned by exactly one environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Unit {
    /// Engine-assigned container id
    pub id: String,
    /// Container name (e.g. "myproj-db-1")
    pub name: String,
    /// Compose service this unit belongs to; scaled services share one name
    pub service: String,
    pub state: UnitState,
}

impl Unit {
    pub fn is_running(&self) -> bool {
        self.state == UnitState::Running
    }
}

/// A single container-port to host-port mapping as reported by the engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortBinding {
    /// Port plus protocol tag, e.g. "8000/tcp"
    pub container_port: String,
    /// Address the engine bound on the host; may be empty when it binds
    /// to all interfaces
    pub host_address: String,
    pub host_port: u16,
}

/// How to reach one service port from the test process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkInfo {
    /// Port (usually with protocol name) exposed inside the container
    pub container_port: String,
    /// Hostname to use when accessing this service
    pub hostname: String,
    /// Port number to use when accessing this service
    pub host_port: u16,
}

impl NetworkInfo {
    /// Build an endpoint record from an engine port binding, defaulting the
    /// hostname to localhost when the engine omits it
    pub fn from_binding(binding: &PortBinding) -> Self {
        let hostname = if binding.host_address.is_empty() {
            "localhost".to_string()
        } else {
            binding.host_address.clone()
        };
        Self {
            container_port: binding.container_port.clone(),
            hostname,
            host_port: binding.host_port,
        }
    }
}

/// A unit together with its endpoint records, constructed once at
/// extraction time and never mutated afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitHandle {
    pub unit: Unit,
    pub network_info: Vec<NetworkInfo>,
}

/// Test-scope level a container getter is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeLevel {
    Function,
    Class,
    Module,
    Session,
}

impl fmt::Display for ScopeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScopeLevel::Function => "function",
            ScopeLevel::Class => "class",
            ScopeLevel::Module => "module",
            ScopeLevel::Session => "session",
        };
        write!(f, "{}", s)
    }
}

/// The nesting context a getter is bound to: scope level plus the identity
/// of the enclosing test collection. Requesters with an identical chain
/// share one environment; anything else on the same project is a conflict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChain {
    pub level: ScopeLevel,
    pub collection: String,
}

impl ScopeChain {
    pub fn new(level: ScopeLevel, collection: impl Into<String>) -> Self {
        Self {
            level,
            collection: collection.into(),
        }
    }
}

impl fmt::Display for ScopeChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} scope in '{}'", self.level, self.collection)
    }
}
