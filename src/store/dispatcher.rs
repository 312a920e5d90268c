use chrono::Utc;
use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::reaper::ReaperHandle;
use super::{executor, WorkerStore};
use crate::types::task::Task;

/// Moves jobs from the queue into execution, one admission slot per job, in
/// submission order. Runs until `cancel` fires.
pub(super) async fn run(
    store: WorkerStore,
    reaper: ReaperHandle,
    cancel: CancellationToken,
) {
    info!(max_parallel = store.max_parallel(), "dispatcher started");

    loop {
        // Hold a slot before touching the queue, so a dequeued job always
        // has one.
        let slot = match select! {
            slot = store.shared.gate.acquire() => slot,
            _ = cancel.cancelled() => break,
        } {
            Ok(slot) => slot,
            Err(error) => {
                error!(%error, "admission gate closed");
                break;
            },
        };

        let (id, task) = select! {
            job = store.next_job() => job,
            _ = cancel.cancelled() => break,
        };

        debug!(id, "dispatching job");
        tokio::spawn(executor::run(
            store.clone(),
            id,
            task,
            slot,
            reaper.clone(),
        ));
    }

    info!("dispatcher stopped");
}

impl WorkerStore {
    /// Waits until the queue is non-empty, then dispatches its head.
    ///
    /// Cancel-safe: the only suspension points are the wait for work and the
    /// wait for the lock, and a job is only removed from the queue once the
    /// lock is held.
    async fn next_job(&self) -> (u64, Task) {
        loop {
            if let Some(job) = self.try_dispatch().await {
                return job;
            }

            // An enqueue racing with the check above leaves a stored permit,
            // so this returns immediately rather than missing the wakeup.
            self.shared.work_ready.notified().await;
        }
    }

    /// Takes the head of the queue, gives it the next identity and moves it
    /// into the job map as Working, all in one critical section so the job
    /// is always visible to snapshots in exactly one place.
    pub(super) async fn try_dispatch(&self) -> Option<(u64, Task)> {
        let mut state = self.shared.state.write().await;
        let mut job = state.queue.drain_head()?;

        let id = state.next_id;
        state.next_id += 1;

        job.start(id, Utc::now());
        let task = job.task;
        state.jobs.insert(id, job);

        Some((id, task))
    }
}
