use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::types::job::JobRecord;
use crate::types::task::Task;

/// FIFO of jobs waiting for an admission slot. Every record's
/// `queue_position` is kept equal to its index.
#[derive(Debug, Default)]
pub(super) struct JobQueue {
    jobs: VecDeque<JobRecord>,
}

impl JobQueue {
    /// Appends a new scheduled job at the tail and returns a copy of it.
    pub(super) fn enqueue(
        &mut self,
        task: Task,
        now: DateTime<Utc>,
    ) -> JobRecord {
        let job = JobRecord::new(task, self.jobs.len(), now);
        self.jobs.push_back(job.clone());
        job
    }

    /// Removes the head of the queue, shifting everything behind it forward
    /// by one position.
    pub(super) fn drain_head(&mut self) -> Option<JobRecord> {
        let head = self.jobs.pop_front()?;

        for (position, job) in self.jobs.iter_mut().enumerate() {
            job.queue_position = Some(position);
        }

        Some(head)
    }

    pub(super) fn iter(&self) -> impl Iterator<Item = &JobRecord> {
        self.jobs.iter()
    }

    #[cfg(test)]
    pub(super) fn len(&self) -> usize {
        self.jobs.len()
    }
}
