//! auto-commit - A CLI tool that writes git commit messages with an AI backend.
//!
//! # Overview
//!
//! auto-commit collects the pending changes of the current repository, asks
//! Claude Code or Codex for a commit message under a retry/timeout policy,
//! appends a signature, and commits (optionally pushing) the result.

pub mod claude;
pub mod codex;
pub mod commit;
pub mod config;
pub mod error;
pub mod git;
pub mod llm;
pub mod workflow;

// Re-export commonly used types
pub use commit::{ChangeSet, CommitMessage, DiffStat, TemplateStore};
pub use config::{GenerationOptions, Language, RunSettings, Settings};
pub use error::{
    BackendError, BackendErrorKind, CollectionError, ConfigError, GenerationError, GitError,
    PreflightError, TemplateError, WorkflowError,
};
pub use llm::{BackendKind, GenerationBackend, RetryPolicy};
pub use workflow::{RunOutcome, Workflow};
