//! Configuration models for the pool.

pub mod pool;

pub use pool::{PoolConfig, DEFAULT_ADJUST_INTERVAL, DEFAULT_TASK_QUEUE_SIZE};
