//! Core domain types
//!
//! This module contains the structures shared by every Remora crate. The
//! client crate serializes them onto the wire, the orchestrator drives them
//! through the job lifecycle and the CLI renders them.

pub mod job;
pub mod outcome;
pub mod status;
