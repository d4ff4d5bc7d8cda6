//! Line-streaming subprocess runner shared by the CLI backends.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;

use super::backend::BackendKind;

/// How a backend process ended.
#[derive(Debug)]
pub struct ProcessExit {
    pub status: ExitStatus,
    pub stderr: String,
}

impl ProcessExit {
    /// Transport error describing a failed exit.
    pub fn failure(&self, backend: BackendKind) -> BackendError {
        let stderr = self.stderr.trim();
        let detail = if stderr.is_empty() {
            format!("{} CLI exited with {}", backend.executable(), self.status)
        } else {
            format!(
                "{} CLI exited with {}: {stderr}",
                backend.executable(),
                self.status
            )
        };
        BackendError::transport(backend, detail)
    }
}

/// Spawn `command` and hand each stdout line to `on_line` as it arrives.
///
/// When `cancel` fires first, the read is abandoned, the child is killed on
/// drop and [`BackendError::Timeout`] is returned.
pub async fn stream_stdout_lines<F>(
    mut command: Command,
    backend: BackendKind,
    budget: Duration,
    cancel: &CancellationToken,
    mut on_line: F,
) -> Result<ProcessExit, BackendError>
where
    F: FnMut(&str),
{
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| {
        BackendError::transport(
            backend,
            format!("failed to spawn {} CLI: {e}", backend.executable()),
        )
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| BackendError::transport(backend, "stdout was not captured"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| BackendError::transport(backend, "stderr was not captured"))?;

    let stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        let _ = stderr.read_to_end(&mut buf).await;
        String::from_utf8_lossy(&buf).into_owned()
    });

    let run = async {
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await.map_err(|e| {
            BackendError::transport(backend, format!("failed to read CLI output: {e}"))
        })? {
            on_line(&line);
        }
        child.wait().await.map_err(|e| {
            BackendError::transport(backend, format!("failed to wait for CLI: {e}"))
        })
    };

    let status = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            stderr_task.abort();
            return Err(BackendError::Timeout { budget });
        }
        status = run => status?,
    };

    let stderr = stderr_task.await.unwrap_or_default();
    Ok(ProcessExit { status, stderr })
}
