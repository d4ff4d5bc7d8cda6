//! Claude Code CLI integration.

pub mod session;
pub mod subprocess;

pub use session::{SessionEvent, extract_session_text};
pub use subprocess::ClaudeBackend;
