use std::time::Duration;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::util::secs_to_duration;

/// The user-supplied description of an arithmetic sequence job. Immutable
/// once submitted.
///
/// Fields missing from the request body default to zero, and unknown fields
/// are ignored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    /// Number of iterations to run.
    #[serde(rename = "n")]
    pub count: u64,
    /// Added to the running value on every iteration.
    #[serde(rename = "d")]
    pub delta: f64,
    /// Starting value of the sequence.
    #[serde(rename = "n1")]
    pub initial_value: f64,
    /// Pause between iterations, in seconds.
    #[serde(rename = "I")]
    pub interval_secs: f64,
    /// How long the finished result is kept around, in seconds.
    #[serde(rename = "TTL")]
    pub ttl_secs: f64,
}

impl Task {
    /// Checks the constraints a deserialised task can still violate: the
    /// interval and TTL must be finite and non-negative. A negative `count`
    /// never gets this far as it fails to deserialise.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let fields = [("I", self.interval_secs), ("TTL", self.ttl_secs)]
            .into_iter()
            .filter(|(_, secs)| !(secs.is_finite() && *secs >= 0.0))
            .map(|(name, _)| name)
            .collect_vec();

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { fields })
        }
    }

    pub fn interval(&self) -> Duration {
        secs_to_duration(self.interval_secs)
    }

    pub fn ttl(&self) -> Duration {
        secs_to_duration(self.ttl_secs)
    }
}
