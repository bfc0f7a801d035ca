//! Pool configuration structure and validation.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default capacity of the task queue.
pub const DEFAULT_TASK_QUEUE_SIZE: usize = 1_000_000;

/// Default autoscaler tick interval.
pub const DEFAULT_ADJUST_INTERVAL: Duration = Duration::from_secs(1);

/// Pool configuration. All values are immutable once the pool is built.
///
/// Sinks and the lock type are not part of this struct; they are supplied on
/// [`PoolBuilder`](crate::builders::PoolBuilder) because they are not plain
/// serializable values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Upper bound on the worker roster size.
    pub max_workers: usize,
    /// Lower bound on the roster size; also the initial size.
    pub min_workers: usize,
    /// Capacity of the bounded task queue.
    pub task_queue_size: usize,
    /// Number of additional attempts after a first failed attempt.
    pub retry_count: usize,
    /// Per-attempt wall-clock limit. `None` disables the timeout.
    #[serde(default)]
    pub timeout: Option<Duration>,
    /// Autoscaler tick interval.
    pub adjust_interval: Duration,
}

impl PoolConfig {
    /// Create a configuration with the given roster bound and the defaults
    /// for everything else (`min_workers` defaults to `max_workers`).
    #[must_use]
    pub const fn new(max_workers: usize) -> Self {
        Self {
            max_workers,
            min_workers: max_workers,
            task_queue_size: DEFAULT_TASK_QUEUE_SIZE,
            retry_count: 0,
            timeout: None,
            adjust_interval: DEFAULT_ADJUST_INTERVAL,
        }
    }

    /// Set the minimum (and initial) roster size.
    #[must_use]
    pub const fn with_min_workers(mut self, min_workers: usize) -> Self {
        self.min_workers = min_workers;
        self
    }

    /// Set the task queue capacity.
    #[must_use]
    pub const fn with_task_queue_size(mut self, size: usize) -> Self {
        self.task_queue_size = size;
        self
    }

    /// Set the number of additional attempts after a failure.
    #[must_use]
    pub const fn with_retry_count(mut self, retry_count: usize) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the per-attempt wall-clock limit.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the autoscaler tick interval.
    #[must_use]
    pub const fn with_adjust_interval(mut self, interval: Duration) -> Self {
        self.adjust_interval = interval;
        self
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns a message describing the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be at least 1".into());
        }
        if self.min_workers > self.max_workers {
            return Err(format!(
                "min_workers ({}) must not exceed max_workers ({})",
                self.min_workers, self.max_workers
            ));
        }
        if self.task_queue_size == 0 {
            return Err("task_queue_size must be greater than 0".into());
        }
        if self.adjust_interval.is_zero() {
            return Err("adjust_interval must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse a configuration from a JSON string and validate it.
    ///
    /// # Errors
    ///
    /// Returns a message for parse failures or violated constraints.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PoolConfig::new(100);
        assert_eq!(cfg.max_workers, 100);
        assert_eq!(cfg.min_workers, 100);
        assert_eq!(cfg.task_queue_size, DEFAULT_TASK_QUEUE_SIZE);
        assert_eq!(cfg.retry_count, 0);
        assert!(cfg.timeout.is_none());
        assert_eq!(cfg.adjust_interval, Duration::from_secs(1));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_zero_max_workers_rejected() {
        let cfg = PoolConfig::new(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_min_above_max_rejected() {
        let cfg = PoolConfig::new(4).with_min_workers(8);
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("min_workers"));
    }

    #[test]
    fn test_zero_queue_rejected() {
        let cfg = PoolConfig::new(4).with_task_queue_size(0);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let cfg = PoolConfig::new(4).with_adjust_interval(Duration::ZERO);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let cfg = PoolConfig::new(16)
            .with_min_workers(2)
            .with_task_queue_size(512)
            .with_retry_count(3)
            .with_timeout(Duration::from_millis(250));
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed = PoolConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed.max_workers, 16);
        assert_eq!(parsed.min_workers, 2);
        assert_eq!(parsed.task_queue_size, 512);
        assert_eq!(parsed.retry_count, 3);
        assert_eq!(parsed.timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_json_timeout_optional() {
        let cfg = PoolConfig::from_json_str(
            r#"{
                "max_workers": 4,
                "min_workers": 1,
                "task_queue_size": 100,
                "retry_count": 0,
                "adjust_interval": {"secs": 1, "nanos": 0}
            }"#,
        )
        .unwrap();
        assert!(cfg.timeout.is_none());
        assert_eq!(cfg.min_workers, 1);
    }

    #[test]
    fn test_json_invalid_config_rejected() {
        let err = PoolConfig::from_json_str(
            r#"{
                "max_workers": 0,
                "min_workers": 0,
                "task_queue_size": 100,
                "retry_count": 0,
                "adjust_interval": {"secs": 1, "nanos": 0}
            }"#,
        )
        .unwrap_err();
        assert!(err.contains("max_workers"));
    }
}
