//! System `git` spawning.
//!
//! Every git interaction goes through [`GitRunner`] so the collector and the
//! workflow can be driven by a scripted runner in tests. The default
//! [`SystemGit`] shells out to the `git` binary, inheriting the user's git
//! config, SSH agent, and credential store.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::GitError;

/// Maximum bytes accepted on stdout from a single git command (1 MiB).
///
/// The check runs after the command has finished and its whole stdout has
/// been read into memory; larger output is then rejected with
/// [`GitError::OutputTooLarge`].
pub const MAX_OUTPUT_BYTES: usize = 1024 * 1024;

/// Runs a git subcommand and returns its stdout.
#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[&str]) -> Result<String, GitError>;
}

/// Runner backed by the system `git` binary.
#[derive(Debug, Clone, Default)]
pub struct SystemGit {
    workdir: Option<PathBuf>,
}

impl SystemGit {
    /// Run git in the current working directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run git inside `workdir` instead of the current directory.
    pub fn in_dir(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: Some(workdir.into()),
        }
    }
}

#[async_trait]
impl GitRunner for SystemGit {
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let operation = args.join(" ");

        let mut cmd = Command::new("git");
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.workdir {
            cmd.current_dir(dir);
        }

        let output = cmd.output().await.map_err(|source| GitError::SpawnFailed {
            operation: operation.clone(),
            source,
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(GitError::NonZeroExit { operation, stderr });
        }

        if output.stdout.len() > MAX_OUTPUT_BYTES {
            return Err(GitError::OutputTooLarge {
                operation,
                limit: MAX_OUTPUT_BYTES,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
