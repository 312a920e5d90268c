use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use super::WorkerStore;

/// Where executors send the identities of jobs that have just finished.
#[derive(Clone, Debug)]
pub(super) struct ReaperHandle {
    finished: mpsc::UnboundedSender<u64>,
}

impl ReaperHandle {
    pub(super) fn channel() -> (Self, mpsc::UnboundedReceiver<u64>) {
        let (finished, rx) = mpsc::unbounded_channel();
        (Self { finished }, rx)
    }

    pub(super) fn hand_off(&self, id: u64) {
        if self.finished.send(id).is_err() {
            warn!(id, "reaper stopped, finished job will not expire");
        }
    }
}

/// Starts the reaper: each finished job gets its own wait so that a long TTL
/// never delays a short one.
pub(super) fn spawn(store: WorkerStore) -> ReaperHandle {
    let (handle, mut finished) = ReaperHandle::channel();

    tokio::spawn(async move {
        while let Some(id) = finished.recv().await {
            tokio::spawn(expire(store.clone(), id));
        }
    });

    handle
}

#[instrument(skip(store))]
async fn expire(store: WorkerStore, id: u64) {
    let Some(remaining) = store.retention_left(id).await else {
        warn!("finished job missing before expiry");
        return;
    };

    sleep(remaining).await;

    if store.remove(id).await {
        debug!("expired finished job");
    }
}

impl WorkerStore {
    /// How much longer finished job `id` should be kept, read under the lock.
    /// `None` if the job doesn't exist or hasn't finished.
    async fn retention_left(&self, id: u64) -> Option<Duration> {
        let (ttl, finished_at) = {
            let state = self.shared.state.read().await;
            let job = state.jobs.get(&id)?;
            (job.task.ttl(), job.finished_at?)
        };

        // A clock step backwards counts as no time elapsed.
        let elapsed = (Utc::now() - finished_at).to_std().unwrap_or_default();

        Some(ttl.saturating_sub(elapsed))
    }

    async fn remove(&self, id: u64) -> bool {
        self.shared.state.write().await.jobs.remove(&id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::store::StoreConfig;
    use crate::types::task::Task;

    async fn finished_job(store: &WorkerStore, ttl_secs: f64) -> u64 {
        store
            .enqueue(Task {
                ttl_secs,
                ..Default::default()
            })
            .await;
        let (id, _) = store.try_dispatch().await.unwrap();
        store.update(id, |job| job.finish(Utc::now())).await;
        id
    }

    #[tokio::test]
    async fn retention_counts_from_finish() {
        let store = WorkerStore::new(StoreConfig::new(1).unwrap());
        let id = finished_job(&store, 10.0).await;

        let left = store.retention_left(id).await.unwrap();
        assert!(left <= Duration::from_secs(10));
        assert!(left > Duration::from_secs(9));
        assert!(store.retention_left(id + 1).await.is_none());
    }

    #[tokio::test]
    async fn working_job_has_no_retention() {
        let store = WorkerStore::new(StoreConfig::new(1).unwrap());
        store.enqueue(Task::default()).await;
        let (id, _) = store.try_dispatch().await.unwrap();

        assert!(store.retention_left(id).await.is_none());
    }

    #[tokio::test]
    async fn expires_each_job_independently() {
        let store = WorkerStore::new(StoreConfig::new(2).unwrap());
        let long = finished_job(&store, 60.0).await;
        let short = finished_job(&store, 0.05).await;

        let reaper = spawn(store.clone());
        reaper.hand_off(long);
        reaper.hand_off(short);

        timeout(Duration::from_secs(2), async {
            while store.list_all().await.len() != 1 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let jobs = store.list_all().await;
        assert_eq!(jobs[0].id, Some(long));
    }
}
