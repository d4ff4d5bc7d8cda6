//! Claude Code CLI spawning.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use crate::error::BackendError;
use crate::llm::process::stream_stdout_lines;
use crate::llm::{BackendKind, GenerationBackend};

use super::session::{extract_session_text, log_event, parse_event};

/// Conversational backend: one single-turn Claude Code session per submission.
#[derive(Debug, Clone)]
pub struct ClaudeBackend {
    executable: PathBuf,
    model: Option<String>,
}

impl ClaudeBackend {
    pub fn new(executable: PathBuf, model: Option<String>) -> Self {
        Self { executable, model }
    }

    /// `claude -p <prompt> --output-format stream-json --verbose --max-turns 1`
    fn command(&self, prompt: &str) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.arg("-p")
            .arg(prompt)
            .arg("--output-format")
            .arg("stream-json")
            .arg("--verbose")
            .arg("--max-turns")
            .arg("1");
        if let Some(model) = &self.model {
            cmd.arg("--model").arg(model);
        }
        cmd
    }
}

#[async_trait]
impl GenerationBackend for ClaudeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Claude
    }

    async fn submit(
        &self,
        prompt: &str,
        budget: Duration,
        cancel: CancellationToken,
    ) -> Result<String, BackendError> {
        let mut events = Vec::new();
        let exit = stream_stdout_lines(
            self.command(prompt),
            BackendKind::Claude,
            budget,
            &cancel,
            |line| {
                if let Some(event) = parse_event(line) {
                    log_event(&event);
                    events.push(event);
                }
            },
        )
        .await?;

        match extract_session_text(&events) {
            Err(BackendError::NoResponse(_)) if !exit.status.success() => {
                Err(exit.failure(BackendKind::Claude))
            }
            other => other,
        }
    }
}
