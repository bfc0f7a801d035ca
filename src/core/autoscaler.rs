//! The autoscaler: periodic growth and shrinkage of the worker roster.

use std::sync::Arc;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use lock_api::RawMutex;
use tracing::debug;

use crate::core::policy::Task;
use crate::core::pool::PoolCore;
use crate::core::worker::{self, WorkerHandle};

/// Autoscaler loop. Ticks every `adjust_interval`; the shutdown channel's
/// `recv_timeout` doubles as the timer. Exits on shutdown signal or
/// disconnect.
pub(crate) fn run<T, L>(core: &Arc<PoolCore<T, L>>, queue: &Receiver<Task<T>>, shutdown: &Receiver<()>)
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    debug!("autoscaler started");
    loop {
        match shutdown.recv_timeout(core.adjust_interval) {
            Err(RecvTimeoutError::Timeout) => adjust(core, queue),
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("autoscaler exiting");
}

/// One adjustment pass.
///
/// Grow when the backlog exceeds three quarters of the idle capacity: double
/// the roster (capped at `max_workers`), biasing growth to land slightly
/// before full saturation. Shrink only when the queue is empty: halve the
/// idle surplus toward `min_workers`, retiring from the roster tail so the
/// least-recently-used workers go first.
fn adjust<T, L>(core: &Arc<PoolCore<T, L>>, queue: &Receiver<Task<T>>)
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    let pending = queue.len();
    let mut retired: Vec<WorkerHandle<T>> = Vec::new();

    {
        let mut state = core.state.lock();
        let roster = state.workers.len();
        let idle = state.idle.len();

        if pending > idle * 3 / 4 && roster < core.max_workers {
            let target = (roster.max(1) * 2).min(core.max_workers);
            debug!(roster, target, pending, "scaling up");
            while state.workers.len() < target {
                let index = state.workers.len();
                state.workers.push(worker::spawn(core, index));
                state.idle.push(index);
            }
            core.idle_changed.notify_all();
        } else if pending == 0 && roster > core.min_workers {
            let surplus = idle.saturating_sub(core.min_workers);
            if surplus > 0 {
                let retire = (surplus / 2).max(core.min_workers).clamp(1, surplus);
                debug!(roster, idle, retire, "scaling down");
                for _ in 0..retire {
                    let tail = state.workers.len() - 1;
                    // Only a worker currently in the ready-set may be
                    // retired; a busy tail worker ends the pass.
                    let Some(pos) = state.idle.iter().position(|&i| i == tail) else {
                        break;
                    };
                    state.idle.remove(pos);
                    if let Some(handle) = state.workers.pop() {
                        retired.push(handle);
                    }
                }
            }
        }
    }

    // Inboxes close and threads join outside the lock.
    for handle in retired {
        handle.retire();
    }
}
