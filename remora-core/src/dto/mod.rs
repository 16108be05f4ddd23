//! Data Transfer Objects for service communication
//!
//! This module contains the request and response bodies exchanged with the
//! remote execution service and the remote object store. Domain types stay
//! free of wire concerns; the client crate converts between the two.

pub mod job;
pub mod storage;
