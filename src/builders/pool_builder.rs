//! Builder for [`WorkerPool`] construction.

use std::marker::PhantomData;
use std::time::Duration;

use lock_api::RawMutex;

use crate::config::PoolConfig;
use crate::core::error::{PoolError, TaskError};
use crate::core::policy::{ErrorSink, ExecPolicy, ResultSink};
use crate::core::pool::WorkerPool;

/// Configures and constructs a [`WorkerPool`].
///
/// Options mirror [`PoolConfig`]; sinks and the lock type live here because
/// they are not plain values. The lock is chosen by type parameter:
///
/// ```
/// use taskpool::{RawSpinLock, WorkerPool};
///
/// let pool = WorkerPool::<(), _>::builder(8)
///     .with_lock::<RawSpinLock>()
///     .build()
///     .unwrap();
/// pool.release();
/// ```
pub struct PoolBuilder<T, L = parking_lot::RawMutex>
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    config: PoolConfig,
    result_sink: Option<ResultSink<T>>,
    error_sink: Option<ErrorSink>,
    _lock: PhantomData<L>,
}

impl<T, L> PoolBuilder<T, L>
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    /// Start building a pool with the given roster bound.
    #[must_use]
    pub const fn new(max_workers: usize) -> Self {
        Self {
            config: PoolConfig::new(max_workers),
            result_sink: None,
            error_sink: None,
            _lock: PhantomData,
        }
    }

    /// Use an existing configuration, keeping any sinks already set.
    #[must_use]
    pub fn with_config(mut self, config: PoolConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the minimum (and initial) roster size.
    #[must_use]
    pub const fn with_min_workers(mut self, min_workers: usize) -> Self {
        self.config.min_workers = min_workers;
        self
    }

    /// Set the task queue capacity.
    #[must_use]
    pub const fn with_task_queue_size(mut self, size: usize) -> Self {
        self.config.task_queue_size = size;
        self
    }

    /// Set the number of additional attempts after a failure.
    #[must_use]
    pub const fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.config.retry_count = retry_count;
        self
    }

    /// Set the per-attempt wall-clock limit.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the autoscaler tick interval.
    #[must_use]
    pub const fn with_adjust_interval(mut self, interval: Duration) -> Self {
        self.config.adjust_interval = interval;
        self
    }

    /// Install a sink for successful task values.
    #[must_use]
    pub fn with_result_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(T) + Send + Sync + 'static,
    {
        self.result_sink = Some(Box::new(sink));
        self
    }

    /// Install a sink for final task errors.
    #[must_use]
    pub fn with_error_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(TaskError) + Send + Sync + 'static,
    {
        self.error_sink = Some(Box::new(sink));
        self
    }

    /// Choose the mutual-exclusion primitive guarding the roster and
    /// ready-set.
    #[must_use]
    pub fn with_lock<L2>(self) -> PoolBuilder<T, L2>
    where
        L2: RawMutex + Send + Sync + 'static,
    {
        PoolBuilder {
            config: self.config,
            result_sink: self.result_sink,
            error_sink: self.error_sink,
            _lock: PhantomData,
        }
    }

    /// Validate the configuration and start the pool.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if a constraint is violated.
    pub fn build(self) -> Result<WorkerPool<T, L>, PoolError> {
        let policy = ExecPolicy {
            timeout: self.config.timeout,
            retry_count: self.config.retry_count,
            result_sink: self.result_sink,
            error_sink: self.error_sink,
        };
        WorkerPool::from_parts(self.config, policy)
    }
}
