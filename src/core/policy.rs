//! Task-execution policy: attempts, timeout wrapping, and sink dispatch.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use tracing::{debug, warn};

use crate::core::error::TaskError;

/// Outcome of a single task invocation.
pub type TaskResult<T> = Result<T, anyhow::Error>;

/// A submitted task: a nullary computation yielding a value or an error.
///
/// Reference-counted because the retry loop re-invokes the callable and a
/// timed-out attempt may still be running it in the background.
pub type Task<T> = Arc<dyn Fn() -> TaskResult<T> + Send + Sync + 'static>;

/// Sink invoked with each successful task's value.
pub type ResultSink<T> = Box<dyn Fn(T) + Send + Sync + 'static>;

/// Sink invoked with each failed task's final error.
pub type ErrorSink = Box<dyn Fn(TaskError) + Send + Sync + 'static>;

/// Per-task execution policy shared by every worker.
pub(crate) struct ExecPolicy<T> {
    pub timeout: Option<Duration>,
    pub retry_count: usize,
    pub result_sink: Option<ResultSink<T>>,
    pub error_sink: Option<ErrorSink>,
}

impl<T: Send + 'static> ExecPolicy<T> {
    /// Run one task to completion on the calling worker thread: up to
    /// `1 + retry_count` sequential attempts, then sink dispatch. Outcomes
    /// with no matching sink are dropped.
    pub fn run(&self, task: &Task<T>) {
        let mut outcome = self.attempt(task);
        let mut attempt = 1;
        while outcome.is_err() && attempt <= self.retry_count {
            attempt += 1;
            debug!(attempt, "retrying failed task");
            outcome = self.attempt(task);
        }
        match outcome {
            Ok(value) => {
                if let Some(sink) = &self.result_sink {
                    sink(value);
                }
            }
            Err(err) => {
                if let Some(sink) = &self.error_sink {
                    sink(err);
                }
            }
        }
    }

    /// One invocation of the task body.
    ///
    /// With a timeout configured, the task runs on a transient thread while
    /// this worker waits on a completion channel. Hitting the deadline
    /// abandons the attempt: the computation is opaque and cannot be
    /// interrupted, so the pool merely stops observing it and the eventual
    /// send lands in a dropped channel.
    ///
    /// A panicking task fails the attempt in both branches; it never unwinds
    /// the worker thread.
    fn attempt(&self, task: &Task<T>) -> Result<T, TaskError> {
        let Some(limit) = self.timeout else {
            return match panic::catch_unwind(AssertUnwindSafe(|| task())) {
                Ok(result) => result.map_err(TaskError::Failed),
                Err(_) => {
                    warn!("task panicked, attempt recorded as failed");
                    Err(TaskError::Failed(anyhow::anyhow!("task panicked")))
                }
            };
        };

        let (done_tx, done_rx) = bounded(1);
        let task = Arc::clone(task);
        thread::Builder::new()
            .name("taskpool-attempt".into())
            .spawn(move || {
                let _ = done_tx.send(task());
            })
            .expect("failed to spawn attempt thread");

        match done_rx.recv_timeout(limit) {
            Ok(result) => result.map_err(TaskError::Failed),
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout = ?limit, "task attempt abandoned after deadline");
                Err(TaskError::Timeout)
            }
            // The attempt thread died without reporting (task panicked).
            Err(RecvTimeoutError::Disconnected) => Err(TaskError::Failed(anyhow::anyhow!(
                "task attempt aborted before reporting a result"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting_policy(
        retry_count: usize,
        timeout: Option<Duration>,
    ) -> (ExecPolicy<u32>, Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let results = Arc::new(AtomicUsize::new(0));
        let errors = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&results);
        let e = Arc::clone(&errors);
        let policy = ExecPolicy {
            timeout,
            retry_count,
            result_sink: Some(Box::new(move |_| {
                r.fetch_add(1, Ordering::SeqCst);
            })),
            error_sink: Some(Box::new(move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            })),
        };
        (policy, results, errors)
    }

    #[test]
    fn test_success_routes_to_result_sink() {
        let (policy, results, errors) = counting_policy(0, None);
        let task: Task<u32> = Arc::new(|| Ok(7));
        policy.run(&task);
        assert_eq!(results.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_exhausted_retries_route_to_error_sink_once() {
        let (policy, results, errors) = counting_policy(3, None);
        let invocations = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&invocations);
        let task: Task<u32> = Arc::new(move || {
            n.fetch_add(1, Ordering::SeqCst);
            Err(anyhow::anyhow!("always fails"))
        });
        policy.run(&task);
        assert_eq!(invocations.load(Ordering::SeqCst), 4);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(results.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_retry_stops_on_first_success() {
        let (policy, results, errors) = counting_policy(5, None);
        let invocations = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&invocations);
        let task: Task<u32> = Arc::new(move || {
            if n.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(anyhow::anyhow!("not yet"))
            } else {
                Ok(42)
            }
        });
        policy.run(&task);
        assert_eq!(invocations.load(Ordering::SeqCst), 3);
        assert_eq!(results.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_timeout_produces_sentinel() {
        let timeouts = Arc::new(AtomicUsize::new(0));
        let t = Arc::clone(&timeouts);
        let policy: ExecPolicy<u32> = ExecPolicy {
            timeout: Some(Duration::from_millis(20)),
            retry_count: 0,
            result_sink: None,
            error_sink: Some(Box::new(move |err| {
                assert!(err.is_timeout());
                assert_eq!(err.to_string(), "task timed out");
                t.fetch_add(1, Ordering::SeqCst);
            })),
        };
        let task: Task<u32> = Arc::new(|| {
            thread::sleep(Duration::from_millis(200));
            Ok(1)
        });
        policy.run(&task);
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_panic_is_contained_without_timeout() {
        let (policy, results, errors) = counting_policy(1, None);
        let invocations = Arc::new(AtomicUsize::new(0));
        let n = Arc::clone(&invocations);
        let task: Task<u32> = Arc::new(move || {
            n.fetch_add(1, Ordering::SeqCst);
            panic!("boom")
        });
        policy.run(&task);
        // The panic fails each attempt, so the retry still happens and the
        // final outcome reaches the error sink.
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(results.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_panic_is_contained_with_timeout() {
        let (policy, results, errors) = counting_policy(0, Some(Duration::from_secs(5)));
        let task: Task<u32> = Arc::new(|| panic!("boom"));
        policy.run(&task);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert_eq!(results.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_fast_task_beats_timeout() {
        let (policy, results, errors) = counting_policy(0, Some(Duration::from_secs(5)));
        let task: Task<u32> = Arc::new(|| Ok(9));
        policy.run(&task);
        assert_eq!(results.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 0);
    }
}
