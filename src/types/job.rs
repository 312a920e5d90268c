use chrono::{DateTime, Utc};
use serde::Serialize;

use super::states::JobStatus;
use super::task::Task;

/// A submitted task together with its scheduling and progress state.
///
/// Records are only ever mutated inside the store's write lock, and readers
/// always receive clones, so a record is never observed half-updated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct JobRecord {
    /// Assigned when the job leaves the queue; never reused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub task: Task,
    /// 0-based offset from the head of the queue, only set while queued.
    #[serde(rename = "numInQueue", skip_serializing_if = "Option::is_none")]
    pub queue_position: Option<usize>,
    #[serde(rename = "currIteration")]
    pub current_iteration: u64,
    #[serde(rename = "value")]
    pub running_value: f64,
    #[serde(rename = "scheduledTime")]
    pub scheduled_at: DateTime<Utc>,
    #[serde(rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(rename = "endTime", skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub status: JobStatus,
}

impl JobRecord {
    pub(crate) fn new(
        task: Task,
        queue_position: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            task,
            queue_position: Some(queue_position),
            current_iteration: 0,
            running_value: task.initial_value,
            scheduled_at: now,
            started_at: None,
            finished_at: None,
            status: JobStatus::Scheduled,
        }
    }

    /// Scheduled -> Working. Called as the job is handed from the queue to
    /// its executor.
    pub(crate) fn start(&mut self, id: u64, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, JobStatus::Scheduled);

        self.id = Some(id);
        self.queue_position = None;
        self.started_at = Some(now);
        self.status = JobStatus::Working;
    }

    pub(crate) fn begin_iteration(&mut self) {
        debug_assert_eq!(self.status, JobStatus::Working);

        self.current_iteration += 1;
    }

    pub(crate) fn advance(&mut self) {
        debug_assert_eq!(self.status, JobStatus::Working);

        self.running_value += self.task.delta;
    }

    /// Working -> Done. Progress is reset as it means nothing once finished.
    pub(crate) fn finish(&mut self, now: DateTime<Utc>) {
        debug_assert_eq!(self.status, JobStatus::Working);

        self.finished_at = Some(now);
        self.status = JobStatus::Done;
        self.current_iteration = 0;
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn task() -> Task {
        Task {
            count: 2,
            delta: 1.5,
            initial_value: 10.0,
            interval_secs: 0.0,
            ttl_secs: 5.0,
        }
    }

    #[test]
    fn lifecycle() {
        let now = Utc::now();
        let mut job = JobRecord::new(task(), 3, now);
        assert_eq!(job.status, JobStatus::Scheduled);
        assert_eq!(job.queue_position, Some(3));
        assert_eq!(job.running_value, 10.0);

        job.start(7, now);
        assert_eq!(job.status, JobStatus::Working);
        assert_eq!(job.id, Some(7));
        assert_eq!(job.queue_position, None);
        assert_eq!(job.started_at, Some(now));

        for _ in 0..2 {
            job.begin_iteration();
            job.advance();
        }
        assert_eq!(job.current_iteration, 2);
        assert_eq!(job.running_value, 13.0);

        job.finish(now);
        assert_eq!(job.status, JobStatus::Done);
        assert_eq!(job.current_iteration, 0);
        assert_eq!(job.finished_at, Some(now));
        // The submitted task is left untouched.
        assert_eq!(job.task, task());
    }

    #[test]
    fn serialises_queued_record() {
        let job = JobRecord::new(task(), 0, Utc::now());
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["n"], json!(2));
        assert_eq!(value["d"], json!(1.5));
        assert_eq!(value["n1"], json!(10.0));
        assert_eq!(value["I"], json!(0.0));
        assert_eq!(value["TTL"], json!(5.0));
        assert_eq!(value["numInQueue"], json!(0));
        assert_eq!(value["currIteration"], json!(0));
        assert_eq!(value["value"], json!(10.0));
        assert_eq!(value["status"], json!("scheduled"));
        assert!(value["scheduledTime"].is_string());
        for absent in ["id", "startTime", "endTime"] {
            assert!(value.get(absent).is_none(), "{absent} present");
        }
    }

    #[test]
    fn serialises_finished_record() {
        let now = Utc::now();
        let mut job = JobRecord::new(task(), 4, now);
        job.start(0, now);
        job.finish(now);
        let value = serde_json::to_value(&job).unwrap();

        assert_eq!(value["id"], json!(0));
        assert_eq!(value["status"], json!("done"));
        assert!(value.get("numInQueue").is_none());
        assert!(value["startTime"].is_string());
        assert!(value["endTime"].is_string());
    }
}
