// Composition spec resolution
// Turns configured compose file paths into a resolved, immutable identity
// for "which environment": the file list, the project directory, and a
// deterministic compose project name.

use crate::errors::{Result, TcError};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// An ordered, resolved set of compose files. Two specs resolving to the
/// same paths denote the same environment and get the same project name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionSpec {
    files: Vec<PathBuf>,
    project_dir: PathBuf,
    project_name: String,
}

impl CompositionSpec {
    /// Resolve configured paths into a spec. A directory resolves to its
    /// `docker-compose.yml`; anything that is not a file afterwards is an
    /// error naming the offending path.
    pub fn resolve(paths: &[PathBuf]) -> Result<Self> {
        if paths.is_empty() {
            return Err(TcError::ConfigError(
                "at least one compose file is required".to_string(),
            ));
        }

        let mut files = Vec::with_capacity(paths.len());
        for path in paths {
            let mut candidate = path.clone();
            if candidate.is_dir() {
                candidate = candidate.join("docker-compose.yml");
            }
            if !candidate.is_file() {
                return Err(TcError::ComposeFileNotFound(candidate));
            }
            // Canonical paths make the identity independent of how the
            // caller spelled them
            files.push(fs::canonicalize(&candidate)?);
        }

        let project_dir = common_ancestor(&files);
        let project_name = derive_project_name(&project_dir, &files);

        Ok(Self {
            files,
            project_dir,
            project_name,
        })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    /// Compose project name (`-p`) for every engine invocation
    pub fn project_name(&self) -> &str {
        &self.project_name
    }
}

/// Deepest directory containing every compose file. With one file this is
/// simply its parent.
fn common_ancestor(files: &[PathBuf]) -> PathBuf {
    let mut ancestor = files[0]
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("/"));

    for file in &files[1..] {
        while !file.starts_with(&ancestor) {
            match ancestor.parent() {
                Some(parent) => ancestor = parent.to_path_buf(),
                None => return PathBuf::from("/"),
            }
        }
    }

    ancestor
}

/// Project names must be lowercase alphanumeric with hyphens only; a short
/// digest of the resolved file list keeps distinct specs from colliding on
/// a shared directory name.
fn derive_project_name(project_dir: &Path, files: &[PathBuf]) -> String {
    let stem = project_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("testcompose");

    let sanitized = stem
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>();

    let sanitized = sanitized
        .trim_matches('-')
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let mut hasher = Sha256::new();
    for file in files {
        hasher.update(file.to_string_lossy().as_bytes());
        hasher.update(b"\n");
    }
    let digest = format!("{:x}", hasher.finalize());

    if sanitized.is_empty() {
        format!("testcompose-{}", &digest[..8])
    } else {
        format!("{}-{}", sanitized, &digest[..8])
    }
}
