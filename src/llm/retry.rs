//! Retry/timeout orchestration shared by every generation backend.
//!
//! Each attempt gets its own [`CancellationToken`] and a timer of
//! `policy.timeout`. When the timer wins, the token is cancelled, the
//! in-flight call is dropped and the attempt counts as timed out. Failed and
//! timed-out attempts are followed by an exponential backoff of
//! `min(1000 * 2^(n-1), 10000)` ms before attempt `n + 1`.

use std::future::Future;
use std::time::Duration;

use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{BackendError, BackendErrorKind, GenerationError};

use super::backend::GenerationBackend;

/// Backoff schedule: base 1s, doubled per attempt, capped at 10s, no jitter.
const INITIAL_INTERVAL_MS: u64 = 1_000;
const MAX_INTERVAL_MS: u64 = 10_000;
const MULTIPLIER: f64 = 2.0;

/// Default number of attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default per-attempt time budget.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Attempt count and per-attempt time budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least 1.
    pub max_retries: u32,
    /// Time allowed for a single attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// The delay schedule between attempts.
pub fn backoff_schedule() -> ExponentialBackoff {
    let initial = Duration::from_millis(INITIAL_INTERVAL_MS);
    ExponentialBackoff {
        current_interval: initial,
        initial_interval: initial,
        randomization_factor: 0.0,
        multiplier: MULTIPLIER,
        max_interval: Duration::from_millis(MAX_INTERVAL_MS),
        max_elapsed_time: None,
        ..Default::default()
    }
}

/// Run `submit` until it succeeds or `policy.max_retries` attempts are used up.
///
/// `submit` receives the cancellation token of the current attempt. It is
/// never called again after a success, and attempt `n + 1` never starts
/// before attempt `n` has resolved and its backoff delay has elapsed.
pub async fn run_with_retry<F, Fut>(
    mut submit: F,
    policy: RetryPolicy,
) -> Result<String, GenerationError>
where
    F: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<String, BackendError>>,
{
    let max_attempts = policy.max_retries.max(1);
    let mut backoff = backoff_schedule();
    let mut attempt = 1;

    loop {
        debug!(
            "Generating commit message (attempt {}/{})",
            attempt, max_attempts
        );

        let error = match attempt_once(&mut submit, policy.timeout).await {
            Ok(text) => return Ok(text),
            Err(e) => e,
        };

        match error.kind() {
            BackendErrorKind::Timeout => warn!("Attempt {} timed out", attempt),
            _ => warn!("Attempt {} failed: {}", attempt, error),
        }

        if attempt >= max_attempts {
            return Err(GenerationError::Exhausted {
                attempts: attempt,
                last_error: error,
            });
        }

        if let Some(wait) = backoff.next_backoff() {
            warn!("Retrying in {}ms...", wait.as_millis());
            tokio::time::sleep(wait).await;
        }
        attempt += 1;
    }
}

/// Generate text from `backend` under the retry/timeout contract.
pub async fn generate(
    backend: &dyn GenerationBackend,
    prompt: &str,
    policy: RetryPolicy,
) -> Result<String, GenerationError> {
    run_with_retry(
        |cancel| backend.submit(prompt, policy.timeout, cancel),
        policy,
    )
    .await
}

/// One attempt raced against its timer.
async fn attempt_once<F, Fut>(submit: &mut F, timeout: Duration) -> Result<String, BackendError>
where
    F: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<String, BackendError>>,
{
    let cancel = CancellationToken::new();
    let call = submit(cancel.clone());

    tokio::select! {
        biased;
        result = call => result,
        _ = tokio::time::sleep(timeout) => {
            cancel.cancel();
            Err(BackendError::Timeout { budget: timeout })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    use crate::llm::backend::{BackendKind, MockGenerationBackend};

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            timeout: Duration::from_millis(30_000),
        }
    }

    fn transport(detail: &str) -> BackendError {
        BackendError::transport(BackendKind::Codex, detail)
    }

    #[test]
    fn test_backoff_schedule_doubles_and_caps_at_ten_seconds() {
        let mut schedule = backoff_schedule();
        let delays: Vec<u128> = (1..=6)
            .map(|_| schedule.next_backoff().unwrap().as_millis())
            .collect();
        assert_eq!(delays, vec![1_000, 2_000, 4_000, 8_000, 10_000, 10_000]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_first_attempt() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let result = run_with_retry(
            move |_| {
                c.fetch_add(1, Ordering::SeqCst);
                async { Ok("feat: add parser".to_string()) }
            },
            policy(3),
        )
        .await;

        assert_eq!(result.unwrap(), "feat: add parser");
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_never_resubmits_after_success() {
        for max_retries in 1..=5 {
            let count = Arc::new(AtomicU32::new(0));
            let c = count.clone();

            let result = run_with_retry(
                move |_| {
                    c.fetch_add(1, Ordering::SeqCst);
                    async { Ok("ok".to_string()) }
                },
                policy(max_retries),
            )
            .await;

            assert!(result.is_ok());
            assert_eq!(count.load(Ordering::SeqCst), 1, "max_retries={max_retries}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_succeeds_on_third_attempt_after_two_backoffs() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();
        let start = tokio::time::Instant::now();

        let result = run_with_retry(
            move |_| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(transport("connection reset"))
                    } else {
                        Ok("fix: handle empty input".to_string())
                    }
                }
            },
            policy(3),
        )
        .await;

        assert_eq!(result.unwrap(), "fix: handle empty input");
        assert_eq!(count.load(Ordering::SeqCst), 3);

        // 1000ms after attempt 1, 2000ms after attempt 2
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(3_000), "waited {:?}", waited);
        assert!(waited < Duration::from_millis(3_100), "waited {:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_after_max_attempts() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let result = run_with_retry(
            move |_| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move { Err(transport(&format!("failure {}", n + 1))) }
            },
            policy(3),
        )
        .await;

        match result {
            Err(GenerationError::Exhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 3);
                assert!(last_error.to_string().contains("failure 3"));
            }
            other => panic!("Expected Exhausted, got {:?}", other),
        }
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_attempt_fails_without_backoff() {
        let start = tokio::time::Instant::now();

        let result = run_with_retry(|_| async { Err(transport("boom")) }, policy(1)).await;

        assert!(matches!(
            result,
            Err(GenerationError::Exhausted { attempts: 1, .. })
        ));
        assert!(start.elapsed() < Duration::from_millis(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_cancels_only_the_current_attempt() {
        let tokens: Arc<Mutex<Vec<CancellationToken>>> = Arc::new(Mutex::new(Vec::new()));
        let seen = tokens.clone();

        let result = run_with_retry(
            move |cancel: CancellationToken| {
                let first = {
                    let mut seen = seen.lock().unwrap();
                    seen.push(cancel.clone());
                    seen.len() == 1
                };
                async move {
                    if first {
                        cancel.cancelled().await;
                        Err(BackendError::Timeout {
                            budget: Duration::from_millis(500),
                        })
                    } else {
                        Ok("docs: update readme".to_string())
                    }
                }
            },
            RetryPolicy {
                max_retries: 2,
                timeout: Duration::from_millis(500),
            },
        )
        .await;

        assert_eq!(result.unwrap(), "docs: update readme");

        let tokens = tokens.lock().unwrap();
        assert_eq!(tokens.len(), 2);
        assert!(tokens[0].is_cancelled());
        assert!(!tokens[1].is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_attempts_timing_out_reports_timeout() {
        let result = run_with_retry(
            |cancel: CancellationToken| async move {
                cancel.cancelled().await;
                Ok("never".to_string())
            },
            RetryPolicy {
                max_retries: 2,
                timeout: Duration::from_millis(200),
            },
        )
        .await;

        match result {
            Err(GenerationError::Exhausted {
                attempts,
                last_error,
            }) => {
                assert_eq!(attempts, 2);
                assert_eq!(last_error.kind(), BackendErrorKind::Timeout);
            }
            other => panic!("Expected Exhausted, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_generate_drives_backend_through_orchestrator() {
        let mut mock = MockGenerationBackend::new();
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        mock.expect_submit().times(2).returning(move |prompt, budget, _| {
            assert!(prompt.contains("Changes:"));
            assert_eq!(budget, Duration::from_millis(30_000));
            let n = c.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Err(BackendError::NoResponse(BackendKind::Claude))
            } else {
                Ok("chore: bump deps".to_string())
            }
        });

        let result = generate(&mock, "Changes:\nBranch: main", policy(3)).await;
        assert_eq!(result.unwrap(), "chore: bump deps");
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
