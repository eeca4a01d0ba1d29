// CLI glue for poking at compose environments outside the test runner

pub mod down;
pub mod endpoints;
pub mod status;
pub mod up;

use crate::config::HarnessConfig;
use crate::errors::Result;
use crate::spec::CompositionSpec;
use std::path::PathBuf;

/// Resolve the spec from explicit -f arguments, falling back to the
/// configured compose files
pub fn resolve_spec(files: &[PathBuf]) -> Result<CompositionSpec> {
    if files.is_empty() {
        let config = HarnessConfig::load(&std::env::current_dir()?)?;
        CompositionSpec::resolve(&config.compose_files)
    } else {
        CompositionSpec::resolve(files)
    }
}
