//! The pool facade and its shared state.
//!
//! # Design
//!
//! - **One lock, one order**: the roster and the ready-set live behind a
//!   single pluggable mutex; critical sections are single push/pop/append
//!   operations, and no lock is held across task execution, sink invocation,
//!   or channel transfer.
//! - **No polling on the hot path**: the dispatcher and `release` park on a
//!   condition variable signalled at every ready-set re-entry. Only the soft
//!   barrier `wait` polls.
//! - **Close by drop**: the task queue closes when its last sender is
//!   dropped, and a worker inbox closes the same way, which is how release
//!   and retirement terminate the background threads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use lock_api::RawMutex;
use tracing::{debug, info, warn};

use crate::builders::PoolBuilder;
use crate::condvar::Condvar;
use crate::config::PoolConfig;
use crate::core::error::PoolError;
use crate::core::policy::{ExecPolicy, Task, TaskResult};
use crate::core::worker::{self, WorkerHandle};
use crate::core::{autoscaler, dispatcher};

/// Shared state guarded by the pool's pluggable lock.
pub(crate) struct PoolState<T> {
    /// The roster: live workers, indexed 0..N-1. Shrinking drops the tail.
    pub workers: Vec<WorkerHandle<T>>,
    /// The ready-set: LIFO stack of idle worker indices. Each index appears
    /// at most once and refers to a live worker with an empty inbox.
    pub idle: Vec<usize>,
    /// Tasks that have completed their final attempt, including sink
    /// dispatch. Compared against `PoolCore::submitted` by the release
    /// barrier.
    pub completed: u64,
}

/// State and policy shared between the facade and the background threads.
pub(crate) struct PoolCore<T, L: RawMutex> {
    pub state: lock_api::Mutex<L, PoolState<T>>,
    /// Signalled whenever a worker enters the ready-set or a task completes.
    pub idle_changed: Condvar,
    pub policy: ExecPolicy<T>,
    pub min_workers: usize,
    pub max_workers: usize,
    pub adjust_interval: Duration,
    /// Tasks accepted by `submit`. Counted under the queue-sender gate so
    /// release observes a final value once it closes the queue.
    pub submitted: AtomicU64,
}

impl<T, L> PoolCore<T, L>
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    /// Called by a worker after finishing a task: re-enter the ready-set and
    /// wake the dispatcher and any release barrier.
    pub fn task_finished(&self, index: usize) {
        let mut state = self.state.lock();
        state.completed += 1;
        state.idle.push(index);
        self.idle_changed.notify_all();
    }
}

/// Snapshot of pool utilization counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PoolStats {
    /// Current roster size.
    pub workers: usize,
    /// Workers currently in the ready-set.
    pub idle_workers: usize,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Tasks accepted by `submit` over the pool's lifetime.
    pub submitted_tasks: u64,
    /// Tasks that have completed their final attempt.
    pub completed_tasks: u64,
}

/// Handles to the background threads, surrendered on release.
struct Background {
    dispatcher: JoinHandle<()>,
    autoscaler: JoinHandle<()>,
    autoscaler_stop: Sender<()>,
}

/// A pool of reusable worker threads executing submitted tasks under a
/// timeout/retry policy.
///
/// `T` is the task value type delivered to the result sink. `L` is the
/// mutual-exclusion primitive guarding the roster and ready-set; any
/// [`lock_api::RawMutex`] works, `parking_lot::RawMutex` is the default and
/// [`RawSpinLock`](crate::spinlock::RawSpinLock) the bundled alternative.
///
/// # Examples
///
/// ```
/// use taskpool::WorkerPool;
///
/// let pool = WorkerPool::new(4).unwrap();
/// for _ in 0..16 {
///     pool.submit(|| Ok(())).unwrap();
/// }
/// pool.wait();
/// pool.release();
/// ```
pub struct WorkerPool<T, L = parking_lot::RawMutex>
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    core: Arc<PoolCore<T, L>>,
    /// Queue sender gate. Taken on release; `None` means closed.
    queue_tx: parking_lot::Mutex<Option<Sender<Task<T>>>>,
    /// Receiver clone used only for depth and emptiness probes; the
    /// dispatcher remains the queue's sole consumer.
    queue_probe: Receiver<Task<T>>,
    config: PoolConfig,
    released: AtomicBool,
    background: parking_lot::Mutex<Option<Background>>,
}

impl<T, L> std::fmt::Debug for WorkerPool<T, L>
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("released", &self.released.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<T> WorkerPool<T>
where
    T: Send + 'static,
{
    /// Create a pool with `max_workers` workers and default options.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] if `max_workers` is zero.
    pub fn new(max_workers: usize) -> Result<Self, PoolError> {
        PoolBuilder::new(max_workers).build()
    }

    /// Start configuring a pool with the given roster bound.
    #[must_use]
    pub fn builder(max_workers: usize) -> PoolBuilder<T> {
        PoolBuilder::new(max_workers)
    }

    /// Start configuring a pool sized to the number of logical CPUs.
    #[must_use]
    pub fn for_cpus() -> PoolBuilder<T> {
        PoolBuilder::new(num_cpus::get())
    }
}

impl<T, L> WorkerPool<T, L>
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    /// Build the pool: validate, populate the initial roster and ready-set,
    /// then start the dispatcher and autoscaler.
    pub(crate) fn from_parts(config: PoolConfig, policy: ExecPolicy<T>) -> Result<Self, PoolError> {
        config.validate().map_err(PoolError::InvalidConfig)?;

        let (queue_tx, queue_rx) = bounded::<Task<T>>(config.task_queue_size);
        let core = Arc::new(PoolCore {
            state: lock_api::Mutex::new(PoolState {
                workers: Vec::with_capacity(config.max_workers),
                idle: Vec::with_capacity(config.max_workers),
                completed: 0,
            }),
            idle_changed: Condvar::new(),
            policy,
            min_workers: config.min_workers,
            max_workers: config.max_workers,
            adjust_interval: config.adjust_interval,
            submitted: AtomicU64::new(0),
        });

        {
            let mut state = core.state.lock();
            for index in 0..config.min_workers {
                state.workers.push(worker::spawn(&core, index));
                state.idle.push(index);
            }
        }

        let dispatcher = {
            let core = Arc::clone(&core);
            let tasks = queue_rx.clone();
            thread::Builder::new()
                .name("taskpool-dispatcher".into())
                .spawn(move || dispatcher::run(&core, &tasks))
                .expect("failed to spawn dispatcher thread")
        };

        let (stop_tx, stop_rx) = bounded::<()>(1);
        let autoscaler = {
            let core = Arc::clone(&core);
            let queue = queue_rx.clone();
            thread::Builder::new()
                .name("taskpool-autoscaler".into())
                .spawn(move || autoscaler::run(&core, &queue, &stop_rx))
                .expect("failed to spawn autoscaler thread")
        };

        info!(
            max_workers = config.max_workers,
            min_workers = config.min_workers,
            queue_capacity = config.task_queue_size,
            "worker pool started"
        );

        Ok(Self {
            core,
            queue_tx: parking_lot::Mutex::new(Some(queue_tx)),
            queue_probe: queue_rx,
            config,
            released: AtomicBool::new(false),
            background: parking_lot::Mutex::new(Some(Background {
                dispatcher,
                autoscaler,
                autoscaler_stop: stop_tx,
            })),
        })
    }

    /// Submit a task for execution.
    ///
    /// Blocks while the task queue is full (bounded backpressure). The
    /// task's outcome is delivered to the configured sinks, never to the
    /// submitter.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] if the pool has been released.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: Fn() -> TaskResult<T> + Send + Sync + 'static,
    {
        self.submit_task(Arc::new(task))
    }

    fn submit_task(&self, task: Task<T>) -> Result<(), PoolError> {
        // Clone the sender and count the submission under the gate, so that
        // the count is final once release takes the sender.
        let tx = {
            let gate = self.queue_tx.lock();
            let Some(tx) = gate.as_ref() else {
                return Err(PoolError::Closed);
            };
            self.core.submitted.fetch_add(1, Ordering::Relaxed);
            tx.clone()
        };
        // The blocking send happens outside the gate.
        if tx.send(task).is_err() {
            self.core.submitted.fetch_sub(1, Ordering::Relaxed);
            return Err(PoolError::Closed);
        }
        Ok(())
    }

    /// Block until the task queue is observed empty.
    ///
    /// A soft barrier: dispatched tasks may still be executing when this
    /// returns. Pair a batch of submissions with `wait` to drain the queue,
    /// or call [`release`](Self::release) for a full drain.
    pub fn wait(&self) {
        while !self.queue_probe.is_empty() {
            thread::sleep(Duration::from_millis(10));
        }
    }

    /// Close the pool and wait for every in-flight task to finish.
    ///
    /// Closes the task queue, waits until every accepted task has completed
    /// and every worker has returned to the ready-set, then retires the
    /// roster and joins the background threads. Idempotent: later calls
    /// return immediately.
    pub fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        info!("releasing worker pool");

        // Closing the gate fixes the submission count: every submitter that
        // obtained a sender has already incremented it.
        let queue_tx = self.queue_tx.lock().take();
        let target = self.core.submitted.load(Ordering::Acquire);
        drop(queue_tx);

        // Full drain: every accepted task completed and every worker idle.
        // The completion count also covers a task the dispatcher holds
        // between queue receive and inbox handoff, which the ready-set size
        // alone cannot see.
        {
            let state = self.core.state.lock();
            let _state = self.core.idle_changed.wait_while(state, |s| {
                s.completed < target || s.idle.len() != s.workers.len()
            });
        }

        let Some(background) = self.background.lock().take() else {
            return;
        };

        // Stop the autoscaler before dismantling the roster.
        drop(background.autoscaler_stop);
        if background.autoscaler.join().is_err() {
            warn!("autoscaler thread panicked");
        }

        let workers = {
            let mut state = self.core.state.lock();
            state.idle.clear();
            std::mem::take(&mut state.workers)
        };
        let retired = workers.len();
        for handle in workers {
            handle.retire();
        }

        if background.dispatcher.join().is_err() {
            warn!("dispatcher thread panicked");
        }

        info!(workers = retired, "worker pool released");
    }

    /// Current roster size. Zero after [`release`](Self::release).
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.core.state.lock().workers.len()
    }

    /// Configured task queue capacity.
    #[must_use]
    pub fn task_queue_size(&self) -> usize {
        self.config.task_queue_size
    }

    /// Snapshot of the pool's utilization counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let (workers, idle_workers, completed_tasks) = {
            let state = self.core.state.lock();
            (state.workers.len(), state.idle.len(), state.completed)
        };
        PoolStats {
            workers,
            idle_workers,
            queued_tasks: self.queue_probe.len(),
            submitted_tasks: self.core.submitted.load(Ordering::Relaxed),
            completed_tasks,
        }
    }
}

impl<T, L> Drop for WorkerPool<T, L>
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    /// Dropping without [`release`](Self::release) abandons queued work: the
    /// queue and every inbox are closed so the background threads exit on
    /// their own, but nothing is joined and nothing waits for in-flight
    /// tasks.
    fn drop(&mut self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("worker pool dropped without release, detaching workers");
        drop(self.queue_tx.lock().take());
        let workers = {
            let mut state = self.core.state.lock();
            state.idle.clear();
            std::mem::take(&mut state.workers)
        };
        // Dropping the handles closes the inboxes; the threads are detached.
        drop(workers);
        drop(self.background.lock().take());
    }
}
