//! Condition variable usable with any `lock_api` mutex.
//!
//! `parking_lot::Condvar` only pairs with `parking_lot::Mutex`, but the pool
//! lets callers pick the mutual-exclusion primitive (see
//! [`RawSpinLock`](crate::spinlock::RawSpinLock)). This condvar works with
//! whatever `lock_api::RawMutex` guards the shared state.
//!
//! Internally it is generation-counted: `wait` records the current generation
//! before releasing the caller's lock, then sleeps until a notification
//! advances it. Notifications are broadcast; every waiter re-checks its own
//! predicate, so the usual wait-in-a-loop discipline applies. A notifier must
//! hold the caller's mutex while mutating the awaited predicate; `wait`
//! registers the waiter before releasing that mutex, which closes the
//! missed-wakeup window.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use taskpool::{Condvar, SpinMutex};
//!
//! let pair = Arc::new((SpinMutex::new(false), Condvar::new()));
//! let pair2 = Arc::clone(&pair);
//!
//! thread::spawn(move || {
//!     let (lock, cvar) = &*pair2;
//!     *lock.lock() = true;
//!     cvar.notify_all();
//! });
//!
//! let (lock, cvar) = &*pair;
//! let mut ready = lock.lock();
//! while !*ready {
//!     ready = cvar.wait(ready);
//! }
//! ```

use lock_api::{MutexGuard, RawMutex};

/// A condition variable for `lock_api` mutexes.
///
/// Unlike `std::sync::Condvar` there is no poisoning, and unlike
/// `parking_lot::Condvar` the guard type is not fixed to one mutex
/// implementation. `wait` consumes and returns the guard because the generic
/// mutex must be fully released and re-acquired around the sleep.
#[derive(Debug, Default)]
pub struct Condvar {
    generation: parking_lot::Mutex<u64>,
    sleepers: parking_lot::Condvar,
}

impl Condvar {
    /// Creates a new condition variable.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            generation: parking_lot::Mutex::new(0),
            sleepers: parking_lot::Condvar::new(),
        }
    }

    /// Blocks the current thread until this condition variable is notified.
    ///
    /// Atomically releases the mutex behind `guard` and sleeps; re-acquires
    /// the mutex before returning the new guard. Callers must re-check their
    /// predicate after waking: wakeups are broadcast and, as with any
    /// condvar, may be spurious.
    pub fn wait<'a, L, T>(&self, guard: MutexGuard<'a, L, T>) -> MutexGuard<'a, L, T>
    where
        L: RawMutex,
        T: ?Sized,
    {
        let mutex = MutexGuard::mutex(&guard);
        // Register under the internal lock before releasing the caller's
        // mutex; a notification between the two is then observed here.
        let mut generation = self.generation.lock();
        let observed = *generation;
        drop(guard);
        while *generation == observed {
            self.sleepers.wait(&mut generation);
        }
        drop(generation);
        mutex.lock()
    }

    /// Blocks until `condition` returns `false`.
    ///
    /// The condition is checked with the mutex held, once before each sleep
    /// and once after each wakeup.
    pub fn wait_while<'a, L, T, F>(
        &self,
        mut guard: MutexGuard<'a, L, T>,
        mut condition: F,
    ) -> MutexGuard<'a, L, T>
    where
        L: RawMutex,
        T: ?Sized,
        F: FnMut(&T) -> bool,
    {
        while condition(&guard) {
            guard = self.wait(guard);
        }
        guard
    }

    /// Wakes every thread blocked on this condition variable.
    ///
    /// Generation counting makes every notification a broadcast: each waiter
    /// wakes and re-checks its own predicate. There is deliberately no
    /// `notify_one`; with distinct predicates sharing one condvar, waking a
    /// single arbitrary waiter can strand the notification on a thread whose
    /// predicate is still false.
    pub fn notify_all(&self) {
        let mut generation = self.generation.lock();
        *generation = generation.wrapping_add(1);
        self.sleepers.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use super::*;
    use crate::spinlock::SpinMutex;

    type PlMutex<T> = lock_api::Mutex<parking_lot::RawMutex, T>;

    #[test]
    fn test_basic_wait_notify() {
        let pair = Arc::new((PlMutex::new(false), Condvar::new()));
        let pair2 = Arc::clone(&pair);

        thread::spawn(move || {
            let (lock, cvar) = &*pair2;
            thread::sleep(Duration::from_millis(10));
            let mut started = lock.lock();
            *started = true;
            cvar.notify_all();
        });

        let (lock, cvar) = &*pair;
        let mut started = lock.lock();
        while !*started {
            started = cvar.wait(started);
        }
        assert!(*started);
    }

    #[test]
    fn test_wait_with_spin_lock() {
        let pair = Arc::new((SpinMutex::new(0), Condvar::new()));
        let pair2 = Arc::clone(&pair);

        thread::spawn(move || {
            let (lock, cvar) = &*pair2;
            for i in 1..=10 {
                thread::sleep(Duration::from_millis(2));
                let mut count = lock.lock();
                *count = i;
                cvar.notify_all();
            }
        });

        let (lock, cvar) = &*pair;
        let count = cvar.wait_while(lock.lock(), |c| *c < 10);
        assert_eq!(*count, 10);
    }

    #[test]
    fn test_notify_wakes_all_waiters() {
        let pair = Arc::new((PlMutex::new(false), Condvar::new()));
        let mut handles = vec![];

        for _ in 0..5 {
            let pair = Arc::clone(&pair);
            handles.push(thread::spawn(move || {
                let (lock, cvar) = &*pair;
                let mut started = lock.lock();
                while !*started {
                    started = cvar.wait(started);
                }
            }));
        }

        thread::sleep(Duration::from_millis(10));

        {
            let (lock, cvar) = &*pair;
            let mut started = lock.lock();
            *started = true;
            cvar.notify_all();
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn test_notify_before_wait_is_not_buffered() {
        let pair = (PlMutex::new(true), Condvar::new());
        let (lock, cvar) = &pair;

        // Nobody is waiting; the notification must not change behavior.
        cvar.notify_all();

        let ready = cvar.wait_while(lock.lock(), |r| !*r);
        assert!(*ready);
    }

    #[test]
    fn test_two_predicates_one_condvar() {
        // The pool shares one condvar between "ready-set non-empty" and
        // "fully drained"; both waiters must make progress.
        let state = Arc::new((PlMutex::new((0usize, 0usize)), Condvar::new()));
        let consumer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                let (lock, cvar) = &*state;
                let mut guard = cvar.wait_while(lock.lock(), |(produced, _)| *produced < 3);
                guard.1 = guard.0;
                cvar.notify_all();
            })
        };
        let drainer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                let (lock, cvar) = &*state;
                let guard = cvar.wait_while(lock.lock(), |(produced, consumed)| {
                    *produced < 3 || *consumed != *produced
                });
                assert_eq!(guard.0, guard.1);
            })
        };

        let (lock, cvar) = &*state;
        for _ in 0..3 {
            thread::sleep(Duration::from_millis(5));
            let mut guard = lock.lock();
            guard.0 += 1;
            cvar.notify_all();
        }

        consumer.join().unwrap();
        drainer.join().unwrap();
    }
}
