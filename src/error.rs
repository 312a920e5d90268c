use itertools::Itertools;
use thiserror::Error;

/// Rejected store configuration. Fatal at startup.
#[derive(Error, Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConfigError {
    #[error("max parallelism must be at least 1")]
    ZeroParallelism,
}

/// A task whose fields are out of range. Lists the offending wire names.
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("invalid task fields: {}", .fields.iter().join(", "))]
pub struct ValidationError {
    pub fields: Vec<&'static str>,
}
