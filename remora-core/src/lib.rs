//! Remora Core
//!
//! Core types for the Remora remote job orchestrator.
//!
//! This crate contains:
//! - Domain types: job specifications, handles, statuses and outcomes
//! - DTOs: wire shapes exchanged with the execution service and object store

pub mod domain;
pub mod dto;

pub use domain::job::{JobHandle, JobSpec, SpecError};
pub use domain::outcome::{CancelReason, FetchResult, PollOutcome, PollResult, WaitMode};
pub use domain::status::JobStatus;
