//! Scripted [`GitRunner`] for unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GitError;

use super::runner::GitRunner;

/// Answers git commands from a table keyed by the joined arguments.
/// Unscripted commands succeed with empty output. Every call is recorded.
#[derive(Default)]
pub struct ScriptedGit {
    responses: HashMap<String, Result<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(mut self, command: &str, stdout: &str) -> Self {
        self.responses
            .insert(command.to_string(), Ok(stdout.to_string()));
        self
    }

    pub fn fail(mut self, command: &str, stderr: &str) -> Self {
        self.responses
            .insert(command.to_string(), Err(stderr.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn was_called(&self, command: &str) -> bool {
        self.calls().iter().any(|c| c == command)
    }
}

#[async_trait]
impl GitRunner for ScriptedGit {
    async fn run(&self, args: &[&str]) -> Result<String, GitError> {
        let operation = args.join(" ");
        self.calls.lock().unwrap().push(operation.clone());
        match self.responses.get(&operation) {
            Some(Ok(stdout)) => Ok(stdout.clone()),
            Some(Err(stderr)) => Err(GitError::NonZeroExit {
                operation,
                stderr: stderr.clone(),
            }),
            None => Ok(String::new()),
        }
    }
}
