//! An in-memory job server that runs arithmetic sequence jobs with bounded
//! parallelism and keeps finished results around for a while.
pub mod error;
pub mod http;
pub mod store;
pub mod types;
pub(crate) mod util;
