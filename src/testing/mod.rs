//! Testing utilities for kafka_federation
//!
//! In-memory stand-ins for the metadata service and per-cluster consumers,
//! so the federation layer can be tested without brokers. Only compiled in
//! test builds.
//!
//! # Organization
//! - `mocks.rs` - Mock metadata service client and cluster consumer builder
//! - `helpers.rs` - Shorthand constructors for partitions, clusters and records

#![cfg(test)]

pub mod helpers;
pub mod mocks;
