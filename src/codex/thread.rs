//! Codex `exec --json` thread events and result extraction.

use serde::Deserialize;
use tracing::debug;

use crate::error::BackendError;
use crate::llm::BackendKind;

/// One line of `codex exec --json` output.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ThreadEvent {
    #[serde(rename = "thread.started")]
    ThreadStarted {
        #[serde(default)]
        thread_id: Option<String>,
    },
    #[serde(rename = "item.completed")]
    ItemCompleted { item: ThreadItem },
    #[serde(rename = "turn.completed")]
    TurnCompleted {
        #[serde(default)]
        usage: Option<Usage>,
    },
    #[serde(rename = "turn.failed")]
    TurnFailed {
        #[serde(default)]
        error: Option<ErrorPayload>,
    },
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Other,
}

/// A completed thread item. Only the fields used for extraction are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ThreadItem {
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub content: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub cached_input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorPayload {
    #[serde(default)]
    pub message: Option<String>,
}

impl ThreadItem {
    fn is_agent_message(&self) -> bool {
        self.item_type == "agent_message"
    }

    /// Text carried by this item, if any.
    fn text(&self) -> Option<&str> {
        let text = self.text.as_deref().map(str::trim).filter(|t| !t.is_empty());
        if text.is_some() || !self.is_agent_message() {
            return text;
        }
        match &self.content {
            Some(serde_json::Value::String(content)) => {
                Some(content.trim()).filter(|c| !c.is_empty())
            }
            _ => None,
        }
    }
}

/// Everything gathered from one thread run.
#[derive(Debug, Default)]
pub struct ThreadRun {
    pub items: Vec<ThreadItem>,
    pub usage: Option<Usage>,
    pub failure: Option<String>,
}

impl ThreadRun {
    /// Record one event.
    pub fn push(&mut self, event: ThreadEvent) {
        match event {
            ThreadEvent::ThreadStarted { thread_id } => {
                debug!(
                    "Codex thread started: {}",
                    thread_id.as_deref().unwrap_or("unknown")
                );
            }
            ThreadEvent::ItemCompleted { item } => {
                debug!("Codex item completed: {}", item.item_type);
                self.items.push(item);
            }
            ThreadEvent::TurnCompleted { usage } => {
                if let Some(usage) = &usage {
                    debug!(
                        "Codex usage: input={} (cached {}), output={}",
                        usage.input_tokens, usage.cached_input_tokens, usage.output_tokens
                    );
                }
                self.usage = usage;
            }
            ThreadEvent::TurnFailed { error } => {
                self.failure = Some(
                    error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| "turn failed".to_string()),
                );
            }
            ThreadEvent::Error { message } => {
                self.failure = Some(message.unwrap_or_else(|| "stream error".to_string()));
            }
            ThreadEvent::Other => {}
        }
    }

    /// Final response of the run: the last agent message.
    pub fn final_response(&self) -> Option<&str> {
        self.items
            .iter()
            .rev()
            .filter(|item| item.is_agent_message())
            .find_map(ThreadItem::text)
    }
}

/// Parse one output line; non-JSON lines yield `None`.
pub fn parse_event(line: &str) -> Option<ThreadEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("Skipping unparseable Codex output line: {}", e);
            None
        }
    }
}

/// Pick the commit message out of a finished thread run.
///
/// `last_message` is the contents of the `--output-last-message` file. It
/// wins when non-empty; otherwise the run's final response, then the first
/// completed item carrying text. Reasoning items are never used.
pub fn extract_thread_text(
    run: &ThreadRun,
    last_message: Option<&str>,
) -> Result<String, BackendError> {
    if let Some(failure) = &run.failure {
        return Err(BackendError::transport(BackendKind::Codex, failure.clone()));
    }

    if let Some(text) = last_message.map(str::trim).filter(|t| !t.is_empty()) {
        return Ok(text.to_string());
    }

    run.final_response()
        .or_else(|| {
            run.items
                .iter()
                .filter(|item| item.item_type != "reasoning")
                .find_map(ThreadItem::text)
        })
        .map(str::to_string)
        .ok_or(BackendError::NoResponse(BackendKind::Codex))
}
