//! One auto-commit run.
//!
//! Detects pending changes, stages them, collects the change summary,
//! produces a message from a template or the generation backend, and
//! commits (optionally pushing) unless this is a dry run.

pub mod preflight;

use std::future::Future;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::commit::{CommitMessage, TemplateStore, build_commit_prompt, collect, post_process};
use crate::config::Settings;
use crate::error::{TemplateError, WorkflowError};
use crate::git::{
    GitRunner, changed_file_count, create_commit, has_changes, push, recent_log, stage_all,
    status_porcelain,
};
use crate::llm::{GenerationBackend, generate};

pub use self::preflight::{Preflight, run_checks};

/// Remote that `--push` targets.
const PUSH_REMOTE: &str = "origin";

/// Commits shown by the verbose statistics.
const LOG_COUNT: usize = 10;

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Nothing to commit.
    Clean,
    /// A message was produced but no commit was created.
    DryRun { message: CommitMessage },
    /// A commit was created.
    Committed { message: CommitMessage, pushed: bool },
}

/// Structured record printed in verbose mode when the tree is clean.
#[derive(Debug, Serialize)]
struct ChangeDetectionRecord {
    trace_id: Uuid,
    phase: &'static str,
    changed_files: usize,
    duration_ms: f64,
}

/// Everything a run needs, borrowed from the caller.
pub struct Workflow<'a> {
    git: &'a dyn GitRunner,
    backend: &'a dyn GenerationBackend,
    templates: TemplateStore,
    settings: &'a Settings,
}

impl<'a> Workflow<'a> {
    pub fn new(
        git: &'a dyn GitRunner,
        backend: &'a dyn GenerationBackend,
        templates: TemplateStore,
        settings: &'a Settings,
    ) -> Self {
        Self {
            git,
            backend,
            templates,
            settings,
        }
    }

    /// Execute the pipeline once.
    pub async fn run(&self) -> Result<RunOutcome, WorkflowError> {
        let run = &self.settings.run;
        let started = Instant::now();

        // ── Change detection ──
        let detection_started = Instant::now();
        let status = self
            .measure("Change detection", status_porcelain(self.git))
            .await
            .map_err(WorkflowError::Status)?;

        if !has_changes(&status) {
            println!("No changes detected. Working tree is clean.");
            if run.verbose {
                let record = ChangeDetectionRecord {
                    trace_id: run.trace_id,
                    phase: "change_detection",
                    changed_files: 0,
                    duration_ms: millis(detection_started.elapsed()),
                };
                match serde_json::to_string(&record) {
                    Ok(json) => println!("{json}"),
                    Err(e) => warn!("Failed to serialize change detection record: {}", e),
                }
            }
            return Ok(RunOutcome::Clean);
        }
        debug!("{} changed entries", changed_file_count(&status));

        // ── Staging ──
        // A dry run leaves the index untouched, so the status is still current.
        let cached_status = if run.dry_run {
            Some(status.as_str())
        } else {
            self.measure("Staging changes", stage_all(self.git))
                .await
                .map_err(WorkflowError::Staging)?;
            None
        };

        // ── Collection ──
        let changes = self
            .measure("Git changes analysis", collect(self.git, cached_status))
            .await?;

        // ── Message ──
        let raw = match self.template_message() {
            Some(text) => text,
            None => {
                if run.verbose {
                    println!(
                        "Analyzing changes with {} CLI...",
                        self.backend.kind()
                    );
                }
                let prompt = build_commit_prompt(&changes, &self.settings.generation);
                self.measure(
                    "Commit message generation",
                    generate(
                        self.backend,
                        &prompt,
                        self.settings.generation.retry_policy(),
                    ),
                )
                .await?
            }
        };

        let message = post_process(&raw, run.append_signature);
        print_commit_block(&message);

        if run.dry_run {
            println!();
            println!("Dry run mode - commit not created");
            if let Some(name) = &run.save_template {
                match self.templates.save(name, message.text()) {
                    Ok(_) => println!("Template saved: {name}"),
                    Err(e) => eprintln!("Failed to save template: {e}"),
                }
            }
            return Ok(RunOutcome::DryRun { message });
        }

        // ── Commit ──
        self.measure("Commit", create_commit(self.git, message.text()))
            .await
            .map_err(WorkflowError::Commit)?;
        println!();
        println!("Commit created successfully!");

        let pushed = run.push && self.push_branch(&changes.branch_name).await;

        if run.verbose {
            self.show_statistics().await;
            println!();
            println!("Total execution time: {:.2}ms", millis(started.elapsed()));
        }

        Ok(RunOutcome::Committed { message, pushed })
    }

    /// The named template, or `None` when no template applies.
    fn template_message(&self) -> Option<String> {
        let name = self.settings.run.template_name.as_deref()?;
        match self.templates.load(name) {
            Ok(text) => {
                println!("Using template: {name}");
                Some(text)
            }
            Err(e @ TemplateError::NotFound(_)) => {
                println!("Warning: {e}, generating new message...");
                None
            }
            Err(e) => {
                warn!("{}, generating new message", e);
                None
            }
        }
    }

    /// Push to `origin <branch>`. Failures are reported, never propagated.
    async fn push_branch(&self, branch: &str) -> bool {
        if branch.is_empty() {
            eprintln!("Warning: not on a branch (detached HEAD), skipping push");
            return false;
        }

        match self
            .measure("Push", push(self.git, PUSH_REMOTE, branch))
            .await
        {
            Ok(()) => {
                println!("Pushed to {PUSH_REMOTE}/{branch}");
                true
            }
            Err(e) => {
                eprintln!("Warning: push failed: {e}");
                false
            }
        }
    }

    async fn show_statistics(&self) {
        match recent_log(self.git, LOG_COUNT).await {
            Ok(log) => {
                println!();
                println!("Recent commits:");
                print!("{log}");
            }
            Err(e) => {
                debug!("git log failed: {}", e);
                println!("Could not retrieve commit history");
            }
        }
    }

    /// Await `fut`, printing `<label>: <duration>ms` in verbose mode.
    async fn measure<T>(&self, label: &str, fut: impl Future<Output = T>) -> T {
        let start = Instant::now();
        let output = fut.await;
        if self.settings.run.verbose {
            println!("{label}: {:.2}ms", millis(start.elapsed()));
        }
        output
    }
}

/// Print the message between separator lines.
fn print_commit_block(message: &CommitMessage) {
    let rule = "─".repeat(60);
    println!();
    println!("Generated commit message:");
    println!("{rule}");
    println!("{}", message.text());
    println!("{rule}");
}

/// Milliseconds rounded to two decimals.
fn millis(elapsed: Duration) -> f64 {
    (elapsed.as_secs_f64() * 100_000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::SIGNATURE;
    use crate::config::{GenerationOptions, RunSettings};
    use crate::error::{BackendError, GenerationError};
    use crate::git::fake::ScriptedGit;
    use crate::llm::BackendKind;
    use crate::llm::backend::MockGenerationBackend;
    use tempfile::TempDir;

    const STATUS: &str = " M src/lib.rs\n";

    fn dirty_repo() -> ScriptedGit {
        ScriptedGit::new()
            .ok("status --porcelain", STATUS)
            .ok("branch --show-current", "main\n")
            .ok("diff --cached --name-only", "src/lib.rs\n")
            .ok("diff --cached --stat", " src/lib.rs | 2 +-\n")
    }

    fn settings(run: RunSettings) -> Settings {
        Settings {
            generation: GenerationOptions {
                max_retries: 1,
                ..Default::default()
            },
            run,
        }
    }

    fn replying(text: &'static str) -> MockGenerationBackend {
        let mut backend = MockGenerationBackend::new();
        backend.expect_kind().return_const(BackendKind::Codex);
        backend
            .expect_submit()
            .times(1)
            .returning(move |prompt, _, _| {
                assert!(prompt.contains("Changes:\nBranch: main"));
                Ok(text.to_string())
            });
        backend
    }

    fn unused_backend() -> MockGenerationBackend {
        let mut backend = MockGenerationBackend::new();
        backend.expect_kind().return_const(BackendKind::Codex);
        backend.expect_submit().never();
        backend
    }

    fn commit_calls(git: &ScriptedGit) -> Vec<String> {
        git.calls()
            .into_iter()
            .filter(|c| c.starts_with("commit -m"))
            .collect()
    }

    #[tokio::test]
    async fn test_clean_tree_generates_nothing() {
        let git = ScriptedGit::new().ok("status --porcelain", "");
        let backend = unused_backend();
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings {
            verbose: true,
            ..Default::default()
        });

        let outcome = Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await
            .unwrap();

        assert_eq!(outcome, RunOutcome::Clean);
        assert_eq!(git.calls(), vec!["status --porcelain"]);
    }

    #[tokio::test]
    async fn test_commits_generated_message_with_signature() {
        let git = dirty_repo();
        let backend = replying("feat: add parser\n\n- support nested lists\n");
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings::default());

        let outcome = Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await
            .unwrap();

        let expected = format!("feat: add parser\n\n- support nested lists\n\n{SIGNATURE}");
        match outcome {
            RunOutcome::Committed { message, pushed } => {
                assert_eq!(message.text(), expected);
                assert!(!pushed);
            }
            other => panic!("Expected Committed, got {:?}", other),
        }
        assert!(git.was_called("add -A"));
        assert_eq!(commit_calls(&git), vec![format!("commit -m {expected}")]);
    }

    #[tokio::test]
    async fn test_status_is_queried_again_after_staging() {
        let git = dirty_repo();
        let backend = replying("fix: x");
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings::default());

        Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await
            .unwrap();

        let calls = git.calls();
        let status_calls = calls.iter().filter(|c| *c == "status --porcelain").count();
        assert_eq!(status_calls, 2);
        let add = calls.iter().position(|c| c == "add -A").unwrap();
        let branch = calls.iter().position(|c| c == "branch --show-current").unwrap();
        assert!(add < branch, "staging must precede collection: {calls:?}");
    }

    #[tokio::test]
    async fn test_dry_run_never_stages_or_commits() {
        let git = dirty_repo();
        let backend = replying("docs: update readme");
        let templates = TempDir::new().unwrap();
        let store = TemplateStore::new(templates.path());
        let settings = settings(RunSettings {
            dry_run: true,
            save_template: Some("docs".to_string()),
            ..Default::default()
        });

        let outcome = Workflow::new(&git, &backend, store.clone(), &settings)
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::DryRun { .. }));
        assert!(!git.was_called("add -A"));
        assert!(commit_calls(&git).is_empty());
        let status_calls = git
            .calls()
            .iter()
            .filter(|c| *c == "status --porcelain")
            .count();
        assert_eq!(status_calls, 1);
        assert_eq!(
            store.load("docs").unwrap(),
            format!("docs: update readme\n\n{SIGNATURE}")
        );
    }

    #[tokio::test]
    async fn test_template_bypasses_generation() {
        let git = dirty_repo();
        let backend = unused_backend();
        let templates = TempDir::new().unwrap();
        let store = TemplateStore::new(templates.path());
        store.save("release", "chore: release\n").unwrap();
        let settings = settings(RunSettings {
            template_name: Some("release".to_string()),
            append_signature: false,
            ..Default::default()
        });

        let outcome = Workflow::new(&git, &backend, store, &settings)
            .run()
            .await
            .unwrap();

        match outcome {
            RunOutcome::Committed { message, .. } => assert_eq!(message.text(), "chore: release"),
            other => panic!("Expected Committed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_template_falls_back_to_generation() {
        let git = dirty_repo();
        let backend = replying("refactor: split module");
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings {
            template_name: Some("missing".to_string()),
            append_signature: false,
            ..Default::default()
        });

        let outcome = Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await
            .unwrap();

        match outcome {
            RunOutcome::Committed { message, .. } => {
                assert_eq!(message.text(), "refactor: split module")
            }
            other => panic!("Expected Committed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_push_failure_is_not_fatal() {
        let git = dirty_repo().fail("push origin main", "rejected (non-fast-forward)");
        let backend = replying("fix: y");
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings {
            push: true,
            ..Default::default()
        });

        let outcome = Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Committed { pushed: false, .. }));
        assert!(git.was_called("push origin main"));
    }

    #[tokio::test]
    async fn test_push_uses_collected_branch() {
        let git = dirty_repo();
        let backend = replying("fix: z");
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings {
            push: true,
            verbose: true,
            ..Default::default()
        });

        let outcome = Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Committed { pushed: true, .. }));
        assert!(git.was_called("log --oneline -10"));
    }

    #[tokio::test]
    async fn test_detached_head_skips_push() {
        let git = dirty_repo().ok("branch --show-current", "\n");
        let mut backend = MockGenerationBackend::new();
        backend.expect_kind().return_const(BackendKind::Codex);
        backend
            .expect_submit()
            .times(1)
            .returning(|_, _, _| Ok("chore: tidy".to_string()));
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings {
            push: true,
            ..Default::default()
        });

        let outcome = Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await
            .unwrap();

        assert!(matches!(outcome, RunOutcome::Committed { pushed: false, .. }));
        assert!(!git.calls().iter().any(|c| c.starts_with("push")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_generation_failure_stops_before_commit() {
        let git = dirty_repo();
        let mut backend = MockGenerationBackend::new();
        backend.expect_kind().return_const(BackendKind::Claude);
        backend
            .expect_submit()
            .times(1)
            .returning(|_, _, _| Err(BackendError::NoResponse(BackendKind::Claude)));
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings::default());

        let result = Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await;

        assert!(matches!(
            result,
            Err(WorkflowError::Generation(GenerationError::Exhausted {
                attempts: 1,
                ..
            }))
        ));
        assert!(commit_calls(&git).is_empty());
    }

    #[tokio::test]
    async fn test_commit_failure_is_reported() {
        let message = format!("fix: w\n\n{SIGNATURE}");
        let git = dirty_repo().fail(&format!("commit -m {message}"), "nothing added to commit");
        let backend = replying("fix: w");
        let templates = TempDir::new().unwrap();
        let settings = settings(RunSettings::default());

        let result = Workflow::new(&git, &backend, TemplateStore::new(templates.path()), &settings)
            .run()
            .await;

        assert!(matches!(result, Err(WorkflowError::Commit(_))));
    }

    #[test]
    fn test_change_detection_record_shape() {
        let record = ChangeDetectionRecord {
            trace_id: Uuid::nil(),
            phase: "change_detection",
            changed_files: 0,
            duration_ms: 1.25,
        };
        let json: serde_json::Value = serde_json::to_value(&record).unwrap();
        assert_eq!(json["phase"], "change_detection");
        assert_eq!(json["changed_files"], 0);
        assert_eq!(json["duration_ms"], 1.25);
        assert_eq!(json["trace_id"], "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_millis_rounds_to_two_decimals() {
        assert_eq!(millis(Duration::from_micros(1_234_567)), 1234.57);
    }
}
