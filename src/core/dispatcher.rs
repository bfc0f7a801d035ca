//! The dispatcher: pairs queued tasks with idle workers.

use lock_api::RawMutex;
use tracing::{debug, warn};

use crossbeam_channel::Receiver;

use crate::core::policy::Task;
use crate::core::pool::PoolCore;

/// Dispatcher loop. The sole consumer of the task queue and the sole popper
/// of the ready-set; exits once the queue is closed and drained.
///
/// Tasks leave the queue in submission order; which worker a task lands on
/// is unspecified (most-recently-idle first).
pub(crate) fn run<T, L>(core: &PoolCore<T, L>, tasks: &Receiver<Task<T>>)
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    debug!("dispatcher started");
    while let Ok(task) = tasks.recv() {
        let inbox = {
            let mut state = core.state.lock();
            loop {
                if let Some(index) = state.idle.pop() {
                    break state.workers[index].inbox();
                }
                state = core.idle_changed.wait(state);
            }
        };
        // Sent outside the lock. An idle worker's inbox stays open until
        // retirement, and retirement removes it from the ready-set first.
        if inbox.send(task).is_err() {
            warn!("worker inbox closed during dispatch, task dropped");
        }
    }
    debug!("dispatcher exiting, task queue closed and drained");
}
