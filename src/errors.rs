use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TcError {
    #[error("Compose file not found: {0}")]
    ComposeFileNotFound(PathBuf),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error(
        "Scope conflict for project '{project}': requested {requested_scope} scope \
         in collection '{requested_collection}', but the environment is already active \
         under {active_scope} scope in collection '{active_collection}'"
    )]
    ScopeConflict {
        project: String,
        requested_scope: String,
        requested_collection: String,
        active_scope: String,
        active_collection: String,
    },

    #[error(
        "Containers for project '{project}' did not reach running state within {timeout_secs}s: {}",
        .pending.join(", ")
    )]
    StartupTimeout {
        project: String,
        pending: Vec<String>,
        timeout_secs: u64,
    },

    #[error(
        "Containers for project '{project}' are already running ({}). Run \
         'docker compose down' first, or enable use_running_containers to attach to them.",
        .units.join(", ")
    )]
    EnvironmentAlreadyRunning { project: String, units: Vec<String> },

    #[error("'docker compose up' did not launch any containers for project '{0}'")]
    NoUnitsStarted(String),

    #[error("No service named '{service}' in project '{project}'")]
    ServiceNotFound { service: String, project: String },

    #[error("Teardown of project '{project}' failed: {detail}")]
    Teardown { project: String, detail: String },

    #[error("Compose engine {op} failed: {detail}")]
    Engine { op: String, detail: String },

    #[error("Registry invariant violated: {0}")]
    RegistryInvariant(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TcError>;
