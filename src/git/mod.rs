//! Git operations via the system `git` binary.

#[cfg(test)]
pub(crate) mod fake;
pub mod ops;
pub mod runner;

pub use ops::{
    changed_file_count, check_repository, create_commit, has_changes, push,
    recent_log, stage_all, status_porcelain,
};
pub use runner::{GitRunner, SystemGit};
