use crate::errors::{Result, TcError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Harness configuration, loaded from `.testcompose.yml` with environment
/// variable overrides (the knobs test runners expose as CLI flags)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarnessConfig {
    /// Compose files in overlay order; a directory means its
    /// docker-compose.yml
    #[serde(default = "default_compose_files")]
    pub compose_files: Vec<PathBuf>,

    /// Skip `docker compose build` during activation
    #[serde(default)]
    pub no_build: bool,

    /// Attach to an externally managed set of running containers instead
    /// of owning the lifecycle; teardown never fires in this mode
    #[serde(default)]
    pub use_running_containers: bool,

    /// Pass --volumes to `docker compose down`
    #[serde(default)]
    pub remove_volumes: bool,

    /// How long to wait for containers to reach running state,
    /// e.g. "30s" or "2m"
    #[serde(default = "default_startup_timeout")]
    pub startup_timeout: String,

    /// Interval between container state polls while waiting
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Print each unit's logs before teardown
    #[serde(default)]
    pub teardown_logs: bool,
}

fn default_compose_files() -> Vec<PathBuf> {
    vec![PathBuf::from("docker-compose.yml")]
}

fn default_startup_timeout() -> String {
    "30s".to_string()
}

fn default_poll_interval_ms() -> u64 {
    250
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            compose_files: default_compose_files(),
            no_build: false,
            use_running_containers: false,
            remove_volumes: false,
            startup_timeout: default_startup_timeout(),
            poll_interval_ms: default_poll_interval_ms(),
            teardown_logs: false,
        }
    }
}

impl HarnessConfig {
    /// Load config from `.testcompose.yml` under the given root, then apply
    /// environment overrides. Missing file means defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(".testcompose.yml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)?;
            serde_yml::from_str(&content)
                .map_err(|e| TcError::ConfigError(format!("Failed to parse config: {}", e)))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Environment overrides stand in for test-runner CLI flags:
    /// TESTCOMPOSE_FILES (comma-separated), TESTCOMPOSE_NO_BUILD,
    /// TESTCOMPOSE_USE_RUNNING_CONTAINERS, TESTCOMPOSE_REMOVE_VOLUMES,
    /// TESTCOMPOSE_STARTUP_TIMEOUT
    pub fn apply_env_overrides(&mut self) {
        if let Ok(files) = std::env::var("TESTCOMPOSE_FILES") {
            self.compose_files = files
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(PathBuf::from)
                .collect();
        }
        if let Some(flag) = env_flag("TESTCOMPOSE_NO_BUILD") {
            self.no_build = flag;
        }
        if let Some(flag) = env_flag("TESTCOMPOSE_USE_RUNNING_CONTAINERS") {
            self.use_running_containers = flag;
        }
        if let Some(flag) = env_flag("TESTCOMPOSE_REMOVE_VOLUMES") {
            self.remove_volumes = flag;
        }
        if let Ok(timeout) = std::env::var("TESTCOMPOSE_STARTUP_TIMEOUT") {
            self.startup_timeout = timeout;
        }
    }

    /// Parsed startup timeout
    pub fn startup_timeout(&self) -> Result<Duration> {
        parse_timeout(&self.startup_timeout).map(Duration::from_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name) {
        Ok(value) => Some(matches!(value.as_str(), "1" | "true" | "yes")),
        Err(_) => None,
    }
}

/// Parse timeout string (e.g., "30s", "1m") into seconds
fn parse_timeout(timeout_str: &str) -> Result<u64> {
    let timeout_str = timeout_str.trim();

    if let Some(num_str) = timeout_str.strip_suffix('s') {
        num_str
            .parse::<u64>()
            .map_err(|_| TcError::ConfigError(format!("Invalid timeout value: {}", timeout_str)))
    } else if let Some(num_str) = timeout_str.strip_suffix('m') {
        let minutes = num_str
            .parse::<u64>()
            .map_err(|_| TcError::ConfigError(format!("Invalid timeout value: {}", timeout_str)))?;
        Ok(minutes * 60)
    } else {
        // Default to seconds if no unit specified
        timeout_str
            .parse::<u64>()
            .map_err(|_| TcError::ConfigError(format!("Invalid timeout value: {}", timeout_str)))
    }
}
