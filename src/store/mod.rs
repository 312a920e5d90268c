//! The in-memory job store and the tasks that drive it.
//!
//! All shared job state (the queue of waiting jobs and the map of running and
//! finished ones) lives behind one reader/writer lock. Background tasks:
//!
//! * one dispatcher, moving jobs from the queue to execution whenever the
//!   admission gate has a free slot;
//! * one executor per running job, bounded by the admission gate;
//! * one reaper wait per finished job, removing it once its TTL has passed.
//!
//! None of them hold the lock across a suspension point.
mod dispatcher;
mod executor;
mod gate;
mod queue;
mod reaper;

use std::collections::BTreeMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use self::gate::AdmissionGate;
use self::queue::JobQueue;
use crate::error::ConfigError;
use crate::types::job::JobRecord;
use crate::types::states::JobStatus;
use crate::types::task::Task;

/// Validated store settings.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StoreConfig {
    max_parallel: NonZeroUsize,
}

impl StoreConfig {
    pub fn new(max_parallel: usize) -> Result<Self, ConfigError> {
        let max_parallel = NonZeroUsize::new(max_parallel)
            .ok_or(ConfigError::ZeroParallelism)?;

        Ok(Self { max_parallel })
    }

    /// The maximum number of jobs allowed to be working at once.
    pub fn max_parallel(&self) -> usize {
        self.max_parallel.get()
    }
}

#[derive(Debug, Default)]
struct StoreState {
    /// Jobs waiting to run, owned by the queue until dispatched.
    queue: JobQueue,
    /// Working and finished jobs by identity. Keyed in a BTreeMap so
    /// snapshots come out in identity order.
    jobs: BTreeMap<u64, JobRecord>,
    next_id: u64,
}

#[derive(Debug)]
struct Shared {
    state: RwLock<StoreState>,
    /// Signalled on every enqueue; the dispatcher waits on this while the
    /// queue is empty.
    work_ready: Notify,
    gate: AdmissionGate,
}

/// A cheaply cloneable handle to the job store.
#[derive(Clone, Debug)]
pub struct WorkerStore {
    shared: Arc<Shared>,
}

impl WorkerStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: RwLock::new(StoreState::default()),
                work_ready: Notify::new(),
                gate: AdmissionGate::new(config.max_parallel),
            }),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.shared.gate.capacity()
    }

    /// Starts the dispatcher and reaper. Jobs are accepted before this is
    /// called but stay queued until it is. Call once per store.
    ///
    /// The dispatcher stops launching jobs once `cancel` fires; the returned
    /// handle resolves when it has.
    pub fn start(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let reaper = reaper::spawn(self.clone());

        tokio::spawn(dispatcher::run(self.clone(), reaper, cancel))
    }

    /// Appends a new job to the tail of the queue, returning a copy of the
    /// record as created.
    pub async fn enqueue(&self, task: Task) -> JobRecord {
        let job = {
            let mut state = self.shared.state.write().await;
            state.queue.enqueue(task, Utc::now())
        };

        debug!(position = ?job.queue_position, "job queued");
        self.shared.work_ready.notify_one();

        job
    }

    /// Returns copies of every job the store knows of: queued jobs in queue
    /// order, then working jobs, then finished jobs, each of the latter two
    /// groups ordered by identity.
    pub async fn list_all(&self) -> Vec<JobRecord> {
        let state = self.shared.state.read().await;
        let jobs = &state.jobs;
        let with_status = move |status: JobStatus| {
            jobs.values().filter(move |job| job.status == status)
        };

        state
            .queue
            .iter()
            .chain(with_status(JobStatus::Working))
            .chain(with_status(JobStatus::Done))
            .cloned()
            .collect()
    }

    /// Applies `f` to the dispatched job `id` under the write lock. Returns
    /// false if no such job exists.
    async fn update<F>(&self, id: u64, f: F) -> bool
    where
        F: FnOnce(&mut JobRecord),
    {
        match self.shared.state.write().await.jobs.get_mut(&id) {
            Some(job) => {
                f(job);
                true
            },
            None => false,
        }
    }
}
