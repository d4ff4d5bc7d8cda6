//! Repository change collection for the commit prompt.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::CollectionError;
use crate::git::GitRunner;

/// Maximum characters of assembled change text before truncation.
pub const MAX_CHANGES_CHARS: usize = 4_000;

/// Appended after the first [`MAX_CHANGES_CHARS`] characters of oversized text.
pub const TRUNCATION_MARKER: &str = "\n... (truncated for brevity)";

/// A `git diff --stat` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffStat {
    Summary(String),
    /// The statistics query failed, usually because its output was too large.
    TooLarge,
}

/// Snapshot of the pending changes in the working tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeSet {
    pub branch_name: String,
    pub status_lines: Vec<String>,
    pub staged_paths: BTreeSet<String>,
    pub unstaged_paths: BTreeSet<String>,
    pub staged_summary: Option<DiffStat>,
    pub unstaged_summary: Option<DiffStat>,
    pub truncated: bool,
    text: String,
}

impl ChangeSet {
    /// Build a change set and render its bounded text.
    pub fn new(
        branch_name: impl Into<String>,
        status_lines: Vec<String>,
        staged_paths: BTreeSet<String>,
        unstaged_paths: BTreeSet<String>,
        staged_summary: Option<DiffStat>,
        unstaged_summary: Option<DiffStat>,
    ) -> Self {
        let mut changes = ChangeSet {
            branch_name: branch_name.into(),
            status_lines,
            staged_paths,
            unstaged_paths,
            staged_summary,
            unstaged_summary,
            truncated: false,
            text: String::new(),
        };
        let (text, truncated) = truncate(render(&changes));
        changes.text = text;
        changes.truncated = truncated;
        changes
    }

    /// The bounded change text used in the prompt.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Query git for the pending changes and assemble them into a [`ChangeSet`].
///
/// `cached_status` is reused instead of running `git status --porcelain`
/// again. The four primary queries run concurrently; any failure among them
/// fails the collection. The two statistics queries run concurrently
/// afterwards, and a failure there only yields [`DiffStat::TooLarge`].
pub async fn collect(
    git: &dyn GitRunner,
    cached_status: Option<&str>,
) -> Result<ChangeSet, CollectionError> {
    let status_query = async {
        match cached_status {
            Some(status) => Ok(status.to_string()),
            None => git.run(&["status", "--porcelain"]).await,
        }
    };

    let (status, branch, staged, unstaged) = tokio::join!(
        status_query,
        git.run(&["branch", "--show-current"]),
        git.run(&["diff", "--cached", "--name-only"]),
        git.run(&["diff", "--name-only"]),
    );
    let status = status.map_err(CollectionError::Query)?;
    let branch = branch.map_err(CollectionError::Query)?;
    let staged = staged.map_err(CollectionError::Query)?;
    let unstaged = unstaged.map_err(CollectionError::Query)?;

    if status.trim().is_empty() {
        return Err(CollectionError::NoChanges);
    }

    let staged_paths = path_set(&staged);
    let unstaged_paths = path_set(&unstaged);

    let staged_stat = async {
        if staged_paths.is_empty() {
            None
        } else {
            Some(diff_stat(git, &["diff", "--cached", "--stat"]).await)
        }
    };
    let unstaged_stat = async {
        if unstaged_paths.is_empty() {
            None
        } else {
            Some(diff_stat(git, &["diff", "--stat"]).await)
        }
    };
    let (staged_summary, unstaged_summary) = tokio::join!(staged_stat, unstaged_stat);

    let changes = ChangeSet::new(
        branch.trim(),
        status
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect(),
        staged_paths,
        unstaged_paths,
        staged_summary,
        unstaged_summary,
    );

    debug!(
        "Collected changes on '{}': {} status lines, {} staged, {} unstaged{}",
        changes.branch_name,
        changes.status_lines.len(),
        changes.staged_paths.len(),
        changes.unstaged_paths.len(),
        if changes.truncated { " (truncated)" } else { "" }
    );

    Ok(changes)
}

async fn diff_stat(git: &dyn GitRunner, args: &[&str]) -> DiffStat {
    match git.run(args).await {
        Ok(stat) => DiffStat::Summary(stat),
        Err(e) => {
            debug!("Diff statistics unavailable: {}", e);
            DiffStat::TooLarge
        }
    }
}

fn path_set(output: &str) -> BTreeSet<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Lines of git output restored to their newline-terminated form.
fn block<'a>(lines: impl IntoIterator<Item = &'a String>) -> String {
    lines.into_iter().map(|l| format!("{l}\n")).collect()
}

fn render(changes: &ChangeSet) -> String {
    let mut text = format!(
        "Branch: {}\n\nStatus:\n{}\n\n",
        changes.branch_name,
        block(&changes.status_lines)
    );

    if !changes.staged_paths.is_empty() {
        text.push_str(&format!("Staged files:\n{}\n", block(&changes.staged_paths)));
    }
    if !changes.unstaged_paths.is_empty() {
        text.push_str(&format!(
            "Unstaged files:\n{}\n",
            block(&changes.unstaged_paths)
        ));
    }

    match &changes.staged_summary {
        Some(DiffStat::Summary(stat)) => {
            text.push_str(&format!("\nStaged changes summary:\n{stat}\n\n"))
        }
        Some(DiffStat::TooLarge) => text.push_str("\nStaged changes: (too large to display)\n\n"),
        None => {}
    }
    match &changes.unstaged_summary {
        Some(DiffStat::Summary(stat)) => {
            text.push_str(&format!("\nUnstaged changes summary:\n{stat}\n"))
        }
        Some(DiffStat::TooLarge) => text.push_str("\nUnstaged changes: (too large to display)\n"),
        None => {}
    }

    text
}

/// Cut `text` to [`MAX_CHANGES_CHARS`] characters plus the marker.
fn truncate(text: String) -> (String, bool) {
    match text.char_indices().nth(MAX_CHANGES_CHARS) {
        Some((cut, _)) => (format!("{}{TRUNCATION_MARKER}", &text[..cut]), true),
        None => (text, false),
    }
}
