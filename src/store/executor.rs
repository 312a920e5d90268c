use chrono::Utc;
use tokio::task::yield_now;
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

use super::gate::Slot;
use super::reaper::ReaperHandle;
use super::WorkerStore;
use crate::types::job::JobRecord;
use crate::types::task::Task;

/// Runs job `id` to completion. The job is already Working; `task` is its
/// immutable copy, so only progress updates need the lock.
///
/// `slot` is held for the whole run and released only after the job has
/// been marked Done and handed to the reaper.
#[instrument(name = "job", skip(store, task, slot, reaper))]
pub(super) async fn run(
    store: WorkerStore,
    id: u64,
    task: Task,
    slot: Slot,
    reaper: ReaperHandle,
) {
    let interval = task.interval();
    debug!(count = task.count, ?interval, "job started");

    for _ in 0..task.count {
        if !store.update(id, JobRecord::begin_iteration).await {
            warn!("job disappeared while working");
            return;
        }

        // Zero-interval jobs still yield so they can't starve other tasks.
        if interval.is_zero() {
            yield_now().await;
        } else {
            sleep(interval).await;
        }

        store.update(id, JobRecord::advance).await;
    }

    store.update(id, |job| job.finish(Utc::now())).await;
    info!("job finished");

    reaper.hand_off(id);
    drop(slot);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::store::StoreConfig;
    use crate::types::states::JobStatus;

    #[tokio::test]
    async fn runs_sequence_and_hands_off() {
        let store = WorkerStore::new(StoreConfig::new(1).unwrap());
        let task = Task {
            count: 3,
            delta: 2.0,
            initial_value: 0.0,
            interval_secs: 0.005,
            ttl_secs: 60.0,
        };
        store.enqueue(task).await;

        let slot = store.shared.gate.acquire().await.unwrap();
        let (id, task) = store.try_dispatch().await.unwrap();
        let (reaper, mut finished) = ReaperHandle::channel();

        run(store.clone(), id, task, slot, reaper).await;

        assert_eq!(finished.recv().await, Some(id));
        assert_eq!(store.shared.gate.available(), 1);

        let job = store.list_all().await.remove(0);
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.running_value, 6.0);
        assert_eq!(job.current_iteration, 0);
        let elapsed = job.finished_at.unwrap() - job.started_at.unwrap();
        assert!(elapsed >= chrono::Duration::milliseconds(10));
    }

    #[tokio::test]
    async fn zero_count_finishes_immediately() {
        let store = WorkerStore::new(StoreConfig::new(1).unwrap());
        store
            .enqueue(Task {
                count: 0,
                interval_secs: 10.0,
                initial_value: 4.0,
                ..Default::default()
            })
            .await;

        let slot = store.shared.gate.acquire().await.unwrap();
        let (id, task) = store.try_dispatch().await.unwrap();
        let (reaper, _finished) = ReaperHandle::channel();

        tokio::time::timeout(
            Duration::from_secs(1),
            run(store.clone(), id, task, slot, reaper),
        )
        .await
        .unwrap();

        let job = store.list_all().await.remove(0);
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.running_value, 4.0);
        assert_eq!(job.current_iteration, 0);
    }

    #[tokio::test]
    async fn releases_slot_when_job_vanishes() {
        let store = WorkerStore::new(StoreConfig::new(1).unwrap());
        let slot = store.shared.gate.acquire().await.unwrap();
        let (reaper, mut finished) = ReaperHandle::channel();

        let task = Task {
            count: 1,
            ..Default::default()
        };
        run(store.clone(), 9, task, slot, reaper).await;

        assert_eq!(store.shared.gate.available(), 1);
        assert!(finished.recv().await.is_none());
    }
}
