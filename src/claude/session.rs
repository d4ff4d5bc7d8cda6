//! Claude Code `stream-json` session events and result extraction.

use serde::Deserialize;
use tracing::debug;

use crate::error::BackendError;
use crate::llm::BackendKind;

/// Maximum characters of assistant text echoed to the debug log.
const PREVIEW_CHARS: usize = 200;

/// One line of `claude --output-format stream-json` output.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    System {
        #[serde(default)]
        model: Option<String>,
        #[serde(default, rename = "permissionMode")]
        permission_mode: Option<String>,
    },
    Assistant {
        message: AssistantMessage,
    },
    Result {
        #[serde(default)]
        result: Option<String>,
        #[serde(default)]
        is_error: bool,
        #[serde(default)]
        num_turns: Option<u32>,
        #[serde(default)]
        duration_ms: Option<u64>,
        #[serde(default)]
        total_cost_usd: Option<f64>,
    },
    #[serde(other)]
    Other,
}

/// The `message` payload of an assistant event.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub content: MessageContent,
}

/// Assistant content is either a plain string or a list of content blocks.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Default for MessageContent {
    fn default() -> Self {
        MessageContent::Blocks(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentBlock {
    #[serde(default)]
    pub text: Option<String>,
}

impl AssistantMessage {
    /// Concatenated text of all text blocks, trimmed.
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.trim().to_string(),
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| b.text.as_deref())
                .collect::<String>()
                .trim()
                .to_string(),
        }
    }
}

/// Parse one output line; non-JSON lines yield `None`.
pub fn parse_event(line: &str) -> Option<SessionEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(e) => {
            debug!("Skipping unparseable Claude output line: {}", e);
            None
        }
    }
}

/// Echo the interesting parts of an event to the debug log.
pub fn log_event(event: &SessionEvent) {
    match event {
        SessionEvent::System {
            model,
            permission_mode,
        } => debug!(
            "Claude Code session started: model={}, permissionMode={}",
            model.as_deref().unwrap_or("unknown"),
            permission_mode.as_deref().unwrap_or("default")
        ),
        SessionEvent::Assistant { message } => {
            let text = message.text();
            if !text.is_empty() {
                debug!("Assistant: {}", preview(&text));
            }
        }
        SessionEvent::Result {
            num_turns,
            duration_ms,
            total_cost_usd,
            ..
        } => debug!(
            "Claude Code finished: turns={}, time={}ms, cost=${}",
            num_turns.map_or_else(|| "?".to_string(), |n| n.to_string()),
            duration_ms.unwrap_or(0),
            total_cost_usd.unwrap_or(0.0)
        ),
        SessionEvent::Other => {}
    }
}

/// Pick the commit message out of a finished session.
///
/// The terminal `result` event wins; an error result is reported as a
/// transport failure. Without a usable result, the text of the last
/// assistant event is used.
pub fn extract_session_text(events: &[SessionEvent]) -> Result<String, BackendError> {
    let result = events.iter().find_map(|event| match event {
        SessionEvent::Result {
            result: Some(text),
            is_error,
            ..
        } if !text.trim().is_empty() => Some((text.trim(), *is_error)),
        _ => None,
    });

    if let Some((text, is_error)) = result {
        if is_error {
            return Err(BackendError::transport(BackendKind::Claude, text));
        }
        return Ok(text.to_string());
    }

    events
        .iter()
        .rev()
        .find_map(|event| match event {
            SessionEvent::Assistant { message } => {
                let text = message.text();
                (!text.is_empty()).then_some(text)
            }
            _ => None,
        })
        .ok_or(BackendError::NoResponse(BackendKind::Claude))
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
