//! Codex CLI integration.

pub mod subprocess;
pub mod thread;

pub use subprocess::CodexBackend;
pub use thread::{ThreadEvent, ThreadRun, extract_thread_text};
