//! Recorded tests: settings, persistence and capture.

pub mod recorder;
pub mod store;
pub mod types;

pub use recorder::Recorder;
pub use store::{read_recorded_run, write_recorded_run};
pub use types::{Mode, RunError, RunResult, Settings, Test};
