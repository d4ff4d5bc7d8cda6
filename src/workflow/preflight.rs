//! Checks that run before any change is inspected.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::GenerationOptions;
use crate::error::PreflightError;
use crate::git::check_repository;
use crate::llm::{GenerationBackend, connect};

/// Result of a successful preflight.
pub struct Preflight {
    /// Working tree root of the enclosing repository.
    pub repo_root: PathBuf,
    /// Backend handle reused for every generation attempt of the run.
    pub backend: Box<dyn GenerationBackend>,
}

/// Verify the repository and connect the configured backend concurrently.
pub async fn run_checks(
    dir: &Path,
    generation: &GenerationOptions,
) -> Result<Preflight, PreflightError> {
    let repository = async { check_repository(dir) };
    let (repo_root, backend) = tokio::join!(repository, connect(generation));

    let repo_root = repo_root?;
    let backend = backend?;
    debug!(
        "Preflight passed: repository {}, backend {}",
        repo_root.display(),
        backend.kind()
    );

    Ok(Preflight { repo_root, backend })
}
