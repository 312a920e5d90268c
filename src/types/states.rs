use std::fmt;

use serde::Serialize;

/// Lifecycle of a job. The only reachable transitions are
/// `Scheduled -> Working -> Done`; a `Done` job is later removed entirely
/// rather than moving to another state.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobStatus {
    Scheduled,
    Working,
    Done,
}

impl JobStatus {
    fn as_str(&self) -> &'static str {
        use JobStatus::*;

        match self {
            Scheduled => "scheduled",
            Working => "working",
            Done => "done",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Serialised as the bare lower-case name, as clients poll on these strings.
impl Serialize for JobStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}
