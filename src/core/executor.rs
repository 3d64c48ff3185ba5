//! Operation executor
//!
//! Runs one command as an independently scheduled unit of work and enforces
//! a per-command deadline.
//!
//! # Design
//!
//! ```text
//! Session ──permit──▶ OperationExecutor::execute
//!                         ├── spawn_blocking(unit of work) ── holds the permit
//!                         └── timeout(deadline)
//!                               ├── done in time  → Outcome::Completed
//!                               ├── panicked      → Outcome::Failed
//!                               └── elapsed       → Outcome::TimedOut + cancel
//! ```
//!
//! The unit of work runs on the blocking pool because it takes the ledger's
//! std mutex and writes the snapshot file.
//!
//! # Cancellation
//!
//! Cancellation is best-effort and only honoured before the work starts. A
//! unit of work that is already inside the ledger is never interrupted: it is
//! detached, finishes its mutation and save, and its result is dropped since
//! the client has already been told the command timed out. The permit moves
//! into the unit of work, so it stays held until the work really ends.

use crate::core::AdmissionPermit;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Default per-command deadline
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(5);

/// Result of running one unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The work finished before the deadline
    Completed(T),

    /// The deadline elapsed first
    TimedOut,

    /// The work panicked or was aborted
    Failed(String),
}

/// Runs units of work with a deadline
#[derive(Debug, Clone)]
pub struct OperationExecutor {
    deadline: Duration,
}

impl OperationExecutor {
    /// Create an executor with the given per-command deadline
    ///
    /// A zero deadline would time out every command and is replaced by
    /// [`DEFAULT_DEADLINE`].
    pub fn new(deadline: Duration) -> Self {
        let deadline = if deadline.is_zero() {
            DEFAULT_DEADLINE
        } else {
            deadline
        };

        Self { deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Run `work` while holding `permit`, waiting at most the deadline
    ///
    /// Exactly one [`Outcome`] is returned per call. The deadline starts
    /// now, after the permit has been acquired.
    pub async fn execute<F, T>(&self, permit: AdmissionPermit, work: F) -> Outcome<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            if cancelled.is_cancelled() {
                return None;
            }
            Some(work())
        });

        match tokio::time::timeout(self.deadline, handle).await {
            Ok(Ok(Some(value))) => Outcome::Completed(value),
            // Only reachable if the token was cancelled, which happens after the deadline
            Ok(Ok(None)) => Outcome::TimedOut,
            Ok(Err(e)) => {
                error!(error = %e, "Operation failed");
                Outcome::Failed(e.to_string())
            }
            Err(_) => {
                token.cancel();
                debug!(
                    deadline_ms = self.deadline.as_millis() as u64,
                    "Operation exceeded its deadline"
                );
                Outcome::TimedOut
            }
        }
    }
}

impl Default for OperationExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_DEADLINE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::AdmissionLimiter;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Instant;

    #[test]
    fn test_zero_deadline_falls_back_to_default() {
        assert_eq!(OperationExecutor::new(Duration::ZERO).deadline(), DEFAULT_DEADLINE);
    }

    #[tokio::test]
    async fn test_completed_before_deadline() {
        let limiter = AdmissionLimiter::new(1);
        let executor = OperationExecutor::new(Duration::from_secs(1));

        let permit = limiter.acquire().await.unwrap();
        let outcome = executor.execute(permit, || 40 + 2).await;

        assert_eq!(outcome, Outcome::Completed(42));
    }

    #[tokio::test]
    async fn test_business_errors_are_completed_outcomes() {
        let limiter = AdmissionLimiter::new(1);
        let executor = OperationExecutor::new(Duration::from_secs(1));

        let permit = limiter.acquire().await.unwrap();
        let outcome: Outcome<Result<(), &str>> =
            executor.execute(permit, || Err("insufficient")).await;

        assert_eq!(outcome, Outcome::Completed(Err("insufficient")));
    }

    #[tokio::test]
    async fn test_timeout_returns_promptly_and_work_still_finishes() {
        let limiter = AdmissionLimiter::new(1);
        let executor = OperationExecutor::new(Duration::from_millis(50));
        let finished = Arc::new(AtomicBool::new(false));

        let permit = limiter.acquire().await.unwrap();
        let started = Instant::now();
        let outcome = {
            let finished = Arc::clone(&finished);
            executor
                .execute(permit, move || {
                    std::thread::sleep(Duration::from_millis(300));
                    finished.store(true, Ordering::SeqCst);
                })
                .await
        };

        assert_eq!(outcome, Outcome::TimedOut);
        assert!(started.elapsed() < Duration::from_millis(250));

        // The detached work keeps its permit until it ends
        assert_eq!(limiter.available(), 0);
        let permit = tokio::time::timeout(Duration::from_secs(2), limiter.acquire())
            .await
            .expect("permit is released once the detached work ends")
            .unwrap();
        assert!(finished.load(Ordering::SeqCst));
        drop(permit);
    }

    #[tokio::test]
    async fn test_panicking_work_is_reported_as_failed() {
        let limiter = AdmissionLimiter::new(1);
        let executor = OperationExecutor::new(Duration::from_secs(1));

        let permit = limiter.acquire().await.unwrap();
        let outcome: Outcome<()> = executor.execute(permit, || panic!("boom")).await;

        assert!(matches!(outcome, Outcome::Failed(_)));
        assert_eq!(limiter.available(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_each_call_yields_exactly_one_outcome() {
        let limiter = AdmissionLimiter::new(2);
        let executor = OperationExecutor::new(Duration::from_millis(100));
        let runs = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for i in 0..10u64 {
            let limiter = limiter.clone();
            let executor = executor.clone();
            let runs = Arc::clone(&runs);
            tasks.push(tokio::spawn(async move {
                let permit = limiter.acquire().await.unwrap();
                executor
                    .execute(permit, move || {
                        // Every third unit of work overruns the deadline
                        let delay = if i % 3 == 0 { 200 } else { 1 };
                        std::thread::sleep(Duration::from_millis(delay));
                        runs.fetch_add(1, Ordering::SeqCst);
                        i
                    })
                    .await
            }));
        }

        let mut completed = 0;
        let mut timed_out = 0;
        for task in tasks {
            match task.await.unwrap() {
                Outcome::Completed(_) => completed += 1,
                Outcome::TimedOut => timed_out += 1,
                Outcome::Failed(reason) => panic!("unexpected failure: {}", reason),
            }
        }

        assert_eq!(completed + timed_out, 10);
        assert!(limiter.peak() <= 2);
    }
}
