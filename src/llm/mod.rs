//! Generation backends and the retry/timeout orchestrator that drives them.

pub mod backend;
pub mod process;
pub mod retry;

pub use backend::{BackendKind, GenerationBackend, connect};
pub use retry::{RetryPolicy, backoff_schedule, generate, run_with_retry};
