//! Commit message pipeline: change collection, prompt, post-processing and
//! saved templates.

pub mod changes;
pub mod message;
pub mod prompt;
pub mod template;

pub use changes::{ChangeSet, DiffStat, collect};
pub use message::{CommitMessage, SIGNATURE, post_process};
pub use prompt::build_commit_prompt;
pub use template::TemplateStore;
