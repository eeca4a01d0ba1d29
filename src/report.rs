// Warning records and the end-of-run report
// Non-fatal problems (teardown failures, containers missing in running
// mode, leaked environments) are printed when they happen and collected
// here so a run can surface them loudly at the end.

use chrono::{DateTime, Utc};
use colored::Colorize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    /// Running-containers mode expected units that were not running
    ContainerNotRunning,
    /// `docker compose down` failed during release
    Teardown,
    /// Running-containers mode without no_build: fresh images will not be
    /// used by containers that are already up
    NoBuildHint,
    /// Registry still held environments at shutdown
    LeakedEnvironment,
    /// A getter returned units that were not running
    StoppedService,
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WarningKind::ContainerNotRunning => "container-not-running",
            WarningKind::Teardown => "teardown",
            WarningKind::NoBuildHint => "no-build-hint",
            WarningKind::LeakedEnvironment => "leaked-environment",
            WarningKind::StoppedService => "stopped-service",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone)]
pub struct HarnessWarning {
    pub kind: WarningKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl HarnessWarning {
    /// Record a warning and print it immediately
    pub fn emit(kind: WarningKind, message: impl Into<String>) -> Self {
        let message = message.into();
        eprintln!("{} {}", "⚠".bright_yellow(), message);
        Self {
            kind,
            message,
            at: Utc::now(),
        }
    }
}

impl fmt::Display for HarnessWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.at.format("%H:%M:%S"),
            self.kind,
            self.message
        )
    }
}

/// Everything non-fatal that happened during a run
#[derive(Debug, Default)]
pub struct RunReport {
    pub warnings: Vec<HarnessWarning>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Print the end-of-run summary
    pub fn print(&self) {
        if self.is_clean() {
            return;
        }

        eprintln!(
            "\n{} ({}):",
            "Harness warnings".bright_yellow().bold(),
            self.warnings.len()
        );
        for warning in &self.warnings {
            eprintln!("  • {}", warning);
        }
    }
}
