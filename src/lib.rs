//! # taskpool
//!
//! A dynamically sized worker pool for CPU-bound and blocking tasks.
//!
//! Tasks submitted to the pool are queued on a bounded channel, paired with
//! idle workers by a dedicated dispatcher, and executed under a per-task
//! policy: an optional wall-clock timeout, a configurable number of retries,
//! and result/error delivery to caller-supplied sinks. A background
//! autoscaler grows the worker roster under queue pressure and shrinks it
//! back toward the configured floor when the queue empties.
//!
//! ## Key properties
//!
//! - **Bounded everything**: worker count stays within
//!   `[min_workers, max_workers]`; submissions block (not fail) when the
//!   queue reaches `task_queue_size`.
//! - **LIFO worker reuse**: the most-recently-idle worker runs the next
//!   task, keeping warm workers busy and letting cold ones be retired.
//! - **Orderly shutdown**: `release` refuses new work, drains every accepted
//!   task, and joins every thread before returning.
//! - **Pluggable locking**: the roster and ready-set are guarded by any
//!   [`lock_api::RawMutex`]; `parking_lot`'s mutex is the default and a spin
//!   lock is bundled for very short critical sections.
//!
//! ## Quick example
//!
//! ```
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//! use taskpool::WorkerPool;
//!
//! let done = Arc::new(AtomicUsize::new(0));
//! let observed = Arc::clone(&done);
//!
//! let pool = WorkerPool::builder(8)
//!     .with_result_sink(move |n: usize| {
//!         observed.fetch_add(n, Ordering::SeqCst);
//!     })
//!     .build()
//!     .unwrap();
//!
//! for _ in 0..100 {
//!     pool.submit(|| Ok(1)).unwrap();
//! }
//!
//! pool.wait();
//! pool.release();
//! assert_eq!(done.load(Ordering::SeqCst), 100);
//! ```
//!
//! For the full surface, see [`WorkerPool`] and [`PoolBuilder`].

#![deny(warnings)]
#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders to construct pools from options.
pub mod builders;
/// Condition variable usable with any `lock_api` mutex.
pub mod condvar;
/// Configuration models for the pool.
pub mod config;
/// The dispatch and lifecycle engine.
pub mod core;
/// Spin-based mutual exclusion.
pub mod spinlock;
/// Shared utilities.
pub mod util;

pub use builders::PoolBuilder;
pub use condvar::Condvar;
pub use config::PoolConfig;
pub use crate::core::{
    ErrorSink, PoolError, PoolStats, ResultSink, Task, TaskError, TaskResult, WorkerPool,
};
pub use spinlock::{RawSpinLock, SpinMutex};
