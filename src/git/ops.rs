//! Terminal git operations: repository check, presence check, stage, commit,
//! push and history.
//!
//! These are single-command wrappers around [`GitRunner`] with no
//! coordination logic of their own.

use std::path::{Path, PathBuf};

use git2::Repository;

use crate::error::GitError;

use super::runner::GitRunner;

/// Verify that `path` is inside a git repository and return its root.
///
/// Bare repositories have no working tree; their git directory is returned.
pub fn check_repository(path: &Path) -> Result<PathBuf, GitError> {
    let repo = Repository::discover(path).map_err(GitError::NotARepository)?;
    let root = repo
        .workdir()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| repo.path().to_path_buf());
    Ok(root)
}

/// `git status --porcelain`, returned verbatim so it can be reused by the collector.
pub async fn status_porcelain(git: &dyn GitRunner) -> Result<String, GitError> {
    git.run(&["status", "--porcelain"]).await
}

/// Whether a porcelain status string reports any pending change.
pub fn has_changes(status: &str) -> bool {
    !status.trim().is_empty()
}

/// Number of changed entries in a porcelain status string.
pub fn changed_file_count(status: &str) -> usize {
    status.lines().filter(|l| !l.trim().is_empty()).count()
}

/// Stage every change in the repository (`git add -A`).
pub async fn stage_all(git: &dyn GitRunner) -> Result<(), GitError> {
    git.run(&["add", "-A"]).await.map(|_| ())
}

/// Create a commit with `message` from the current index.
///
/// The message is passed as a single argument, so no shell escaping is needed.
pub async fn create_commit(git: &dyn GitRunner, message: &str) -> Result<(), GitError> {
    git.run(&["commit", "-m", message]).await.map(|_| ())
}

/// Push `branch` to `remote`.
pub async fn push(git: &dyn GitRunner, remote: &str, branch: &str) -> Result<(), GitError> {
    git.run(&["push", remote, branch]).await.map(|_| ())
}

/// One-line summaries of the most recent `count` commits.
pub async fn recent_log(git: &dyn GitRunner, count: usize) -> Result<String, GitError> {
    let limit = format!("-{count}");
    git.run(&["log", "--oneline", &limit]).await
}
