//! Worker threads: one execution context per roster slot.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use lock_api::RawMutex;
use tracing::{debug, warn};

use crate::core::policy::Task;
use crate::core::pool::PoolCore;

/// A live roster entry: the worker's single-slot inbox plus its thread.
pub(crate) struct WorkerHandle<T> {
    inbox: Sender<Task<T>>,
    thread: JoinHandle<()>,
}

impl<T> WorkerHandle<T> {
    /// Clone of the inbox sender, for handing a task to this worker.
    pub fn inbox(&self) -> Sender<Task<T>> {
        self.inbox.clone()
    }

    /// Close the inbox and wait for the worker thread to exit.
    pub fn retire(self) {
        let Self { inbox, thread } = self;
        drop(inbox);
        if thread.join().is_err() {
            warn!("worker thread panicked");
        }
    }
}

/// Spawn the worker occupying roster slot `index`.
///
/// The inbox holds at most one task; the dispatcher only hands a task to a
/// worker it popped from the ready-set, whose inbox is therefore empty.
pub(crate) fn spawn<T, L>(core: &Arc<PoolCore<T, L>>, index: usize) -> WorkerHandle<T>
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    let (inbox_tx, inbox_rx) = bounded::<Task<T>>(1);
    let core = Arc::clone(core);
    let thread = thread::Builder::new()
        .name(format!("taskpool-worker-{index}"))
        .spawn(move || run(&core, index, &inbox_rx))
        .expect("failed to spawn worker thread");
    WorkerHandle {
        inbox: inbox_tx,
        thread,
    }
}

/// Worker loop: execute each received task under the policy, then re-enter
/// the ready-set. Exits when the inbox disconnects (retirement or release).
fn run<T, L>(core: &PoolCore<T, L>, index: usize, inbox: &Receiver<Task<T>>)
where
    T: Send + 'static,
    L: RawMutex + Send + Sync + 'static,
{
    debug!(worker_id = index, "worker started");
    while let Ok(task) = inbox.recv() {
        core.policy.run(&task);
        core.task_finished(index);
    }
    debug!(worker_id = index, "worker inbox closed, exiting");
}
