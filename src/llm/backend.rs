//! Backend-agnostic generation interface and backend selection.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::claude::ClaudeBackend;
use crate::codex::CodexBackend;
use crate::config::GenerationOptions;
use crate::error::{BackendError, ConfigError, PreflightError};

/// Timeout for the `--version` availability probe.
const VERSION_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// Claude Code CLI, driven as a one-turn conversational session.
    Claude,
    /// Codex CLI, driven as a single-shot thread run.
    Codex,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Claude => "Claude",
            BackendKind::Codex => "Codex",
        }
    }

    /// Name of the executable looked up on `PATH`.
    pub fn executable(&self) -> &'static str {
        match self {
            BackendKind::Claude => "claude",
            BackendKind::Codex => "codex",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "claude" => Ok(BackendKind::Claude),
            "codex" => Ok(BackendKind::Codex),
            _ => Err(ConfigError::InvalidProvider(s.to_string())),
        }
    }
}

/// A text-generation backend: submit a prompt, receive the terminal text.
///
/// Implementations must stop work and return [`BackendError::Timeout`] once
/// `cancel` fires. `budget` is the time allowed for this submission and is
/// only used for reporting.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn submit(
        &self,
        prompt: &str,
        budget: Duration,
        cancel: CancellationToken,
    ) -> Result<String, BackendError>;
}

/// Resolve and verify the backend selected by `options`.
///
/// The returned handle is built once per run and reused across retry attempts.
pub async fn connect(
    options: &GenerationOptions,
) -> Result<Box<dyn GenerationBackend>, PreflightError> {
    let kind = options.backend;
    let executable = resolve_executable(kind, options.executable_path.as_deref())?;
    check_version(kind, &executable).await?;

    debug!("{} CLI available at {}", kind, executable.display());

    let backend: Box<dyn GenerationBackend> = match kind {
        BackendKind::Claude => Box::new(ClaudeBackend::new(executable, options.model.clone())),
        BackendKind::Codex => Box::new(CodexBackend::new(executable, options.model.clone())),
    };
    Ok(backend)
}

/// Pick the configured executable, falling back to a `PATH` lookup.
fn resolve_executable(
    kind: BackendKind,
    configured: Option<&Path>,
) -> Result<PathBuf, PreflightError> {
    if let Some(path) = configured {
        return Ok(path.to_path_buf());
    }

    which::which(kind.executable()).map_err(|e| PreflightError::BackendUnavailable {
        backend: kind,
        detail: format!("`{}` was not found on PATH ({e})", kind.executable()),
    })
}

/// Run `<executable> --version` to make sure the CLI actually starts.
async fn check_version(kind: BackendKind, executable: &Path) -> Result<(), PreflightError> {
    let unavailable = |detail: String| PreflightError::BackendUnavailable {
        backend: kind,
        detail,
    };

    let output = tokio::time::timeout(
        VERSION_CHECK_TIMEOUT,
        Command::new(executable)
            .arg("--version")
            .kill_on_drop(true)
            .output(),
    )
    .await
    .map_err(|_| unavailable(format!("`{} --version` timed out", executable.display())))?
    .map_err(|e| unavailable(format!("failed to run {}: {e}", executable.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(unavailable(format!(
            "`{} --version` exited with {}: {stderr}",
            executable.display(),
            output.status
        )));
    }

    Ok(())
}
