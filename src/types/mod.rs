pub mod job;
pub mod states;
pub mod task;
