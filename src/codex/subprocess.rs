//! Codex CLI spawning.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::llm::process::stream_stdout_lines;
use crate::llm::{BackendKind, GenerationBackend};

use super::thread::{ThreadRun, extract_thread_text, parse_event};

/// Single-shot backend: one `codex exec` thread run per submission.
///
/// `CODEX_API_KEY` and `CODEX_BASE_URL` reach the CLI through the inherited
/// environment.
#[derive(Debug, Clone)]
pub struct CodexBackend {
    executable: PathBuf,
    model: Option<String>,
}

impl CodexBackend {
    pub fn new(executable: PathBuf, model: Option<String>) -> Self {
        Self { executable, model }
    }

    /// `codex exec --json --skip-git-repo-check --cd <dir> [--model M]
    /// --output-last-message <file> <prompt>`
    fn command(&self, prompt: &str, workdir: &Path, last_message: &Path) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("exec")
            .arg("--json")
            .arg("--skip-git-repo-check")
            .arg("--cd")
            .arg(workdir);
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }
        cmd.arg("--output-last-message").arg(last_message).arg(prompt);
        cmd
    }
}

#[async_trait]
impl GenerationBackend for CodexBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Codex
    }

    async fn submit(
        &self,
        prompt: &str,
        budget: Duration,
        cancel: CancellationToken,
    ) -> Result<String, BackendError> {
        let workdir = env::current_dir().map_err(|e| {
            BackendError::transport(
                BackendKind::Codex,
                format!("failed to resolve working directory: {e}"),
            )
        })?;
        let last_message = NamedTempFile::new().map_err(|e| {
            BackendError::transport(
                BackendKind::Codex,
                format!("failed to create output file: {e}"),
            )
        })?;

        let mut run = ThreadRun::default();
        let exit = stream_stdout_lines(
            self.command(prompt, &workdir, last_message.path()),
            BackendKind::Codex,
            budget,
            &cancel,
            |line| {
                if let Some(event) = parse_event(line) {
                    run.push(event);
                }
            },
        )
        .await?;

        let final_message = tokio::fs::read_to_string(last_message.path()).await.ok();

        match extract_thread_text(&run, final_message.as_deref()) {
            Err(BackendError::NoResponse(_)) if !exit.status.success() => {
                Err(exit.failure(BackendKind::Codex))
            }
            other => other,
        }
    }
}
