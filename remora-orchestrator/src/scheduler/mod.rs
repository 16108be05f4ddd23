//! Scheduler layer
//!
//! Drives submitted jobs to a terminal state by polling the execution
//! service on a fixed cadence.

pub mod poller;

pub use poller::{PollResultExt, PollingOrchestrator};
