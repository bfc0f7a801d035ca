//! Spin-based mutual exclusion.
//!
//! [`RawSpinLock`] is the pluggable-lock alternative for very short critical
//! sections: a test-and-test-and-set loop instead of a blocking acquire. The
//! pool's critical sections are single push/pop operations on the ready-set,
//! which is exactly the regime where spinning beats parking.
//!
//! # Examples
//!
//! ```
//! use taskpool::SpinMutex;
//!
//! let value = SpinMutex::new(0);
//! *value.lock() = 10;
//! assert_eq!(*value.lock(), 10);
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use lock_api::{GuardSend, RawMutex};

/// A test-and-test-and-set spin lock satisfying [`lock_api::RawMutex`].
///
/// Waiters spin on a relaxed read until the lock looks free, then race with a
/// compare-exchange. There is no fairness guarantee and no parking; do not
/// hold this lock across anything that blocks.
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
}

#[allow(unsafe_code)] // implementing lock_api's raw-mutex contract requires it
unsafe impl RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)] // required shape for RawMutex::INIT
    const INIT: Self = Self {
        locked: AtomicBool::new(false),
    };

    type GuardMarker = GuardSend;

    fn lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                std::hint::spin_loop();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }
}

/// A mutex guarded by [`RawSpinLock`].
pub type SpinMutex<T> = lock_api::Mutex<RawSpinLock, T>;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    #[test]
    fn test_lock_unlock() {
        let mutex = SpinMutex::new(0);
        {
            let mut guard = mutex.lock();
            *guard = 10;
        }
        assert_eq!(*mutex.lock(), 10);
    }

    #[test]
    fn test_try_lock() {
        let mutex = SpinMutex::new(5);
        {
            let held = mutex.lock();
            assert!(mutex.try_lock().is_none());
            drop(held);
        }
        assert!(mutex.try_lock().is_some());
    }

    #[test]
    fn test_concurrent_increments() {
        let mutex = Arc::new(SpinMutex::new(0));
        let mut handles = vec![];

        for _ in 0..8 {
            let mutex = Arc::clone(&mutex);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    *mutex.lock() += 1;
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(*mutex.lock(), 8000);
    }
}
