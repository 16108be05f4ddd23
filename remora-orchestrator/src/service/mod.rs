//! Service layer
//!
//! Services surround the polling loop: progress reporting for whoever is
//! watching, and artifact retrieval once a job succeeded.
//!
//! Reporters are trait objects so the CLI, a daemon and tests can each
//! render progress their own way.

mod progress;
mod retriever;

// Re-export traits
pub use progress::ProgressReporter;

// Re-export implementations
pub use progress::{InMemoryReporter, NoopReporter, ProgressEvent, TracingReporter};
pub use retriever::ArtifactRetriever;
