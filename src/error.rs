//! Error types for auto-commit modules using thiserror.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::llm::BackendKind;

/// Errors from running the system `git` binary.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to run git {operation}: {source}")]
    SpawnFailed {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("git {operation} failed: {stderr}")]
    NonZeroExit { operation: String, stderr: String },

    #[error("git {operation} produced more than {limit} bytes of output")]
    OutputTooLarge { operation: String, limit: usize },

    #[error("Not a git repository. Please run this command in a git repository.")]
    NotARepository(#[source] git2::Error),
}

/// Errors from collecting the repository change summary.
#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("No changes detected")]
    NoChanges,

    #[error("Failed to get git changes: {0}")]
    Query(#[source] GitError),
}

/// Coarse classification of a [`BackendError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    Timeout,
    NoResponse,
    Transport,
}

/// Errors from a single generation backend submission.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request timed out after {}ms", .budget.as_millis())]
    Timeout { budget: Duration },

    #[error("No valid response received from {0}")]
    NoResponse(BackendKind),

    #[error("{backend} failed: {detail}")]
    Transport { backend: BackendKind, detail: String },
}

impl BackendError {
    pub fn kind(&self) -> BackendErrorKind {
        match self {
            BackendError::Timeout { .. } => BackendErrorKind::Timeout,
            BackendError::NoResponse(_) => BackendErrorKind::NoResponse,
            BackendError::Transport { .. } => BackendErrorKind::Transport,
        }
    }

    pub(crate) fn transport(backend: BackendKind, detail: impl Into<String>) -> Self {
        BackendError::Transport {
            backend,
            detail: detail.into(),
        }
    }
}

/// Errors from the retry/timeout orchestrator.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to generate commit message after {attempts} attempts: {last_error}")]
    Exhausted {
        attempts: u32,
        #[source]
        last_error: BackendError,
    },
}

/// Errors from template storage.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("Template \"{0}\" not found")]
    NotFound(String),

    #[error("Invalid template name \"{0}\"")]
    InvalidName(String),

    #[error("Failed to access template {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from resolving configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unsupported language '{0}' (expected one of: zh, en, ja)")]
    InvalidLanguage(String),

    #[error("Unsupported provider '{0}' (expected one of: claude, codex)")]
    InvalidProvider(String),

    #[error("maxRetries must be at least 1")]
    ZeroRetries,

    #[error("timeout must be greater than 0ms")]
    ZeroTimeout,

    #[error("Could not determine the home directory for the config path")]
    NoHomeDir,
}

/// Errors from the checks that run before any change is inspected.
#[derive(Error, Debug)]
pub enum PreflightError {
    #[error(transparent)]
    Repository(#[from] GitError),

    #[error("{backend} CLI is not available: {detail}")]
    BackendUnavailable { backend: BackendKind, detail: String },
}

/// Errors that terminate a pipeline run.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("Failed to check git status: {0}")]
    Status(#[source] GitError),

    #[error("Failed to stage changes: {0}")]
    Staging(#[source] GitError),

    #[error(transparent)]
    Collection(#[from] CollectionError),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Failed to create commit: {0}")]
    Commit(#[source] GitError),
}
