// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Redis-resident IP lease pool mutation and query protocol.
//!
//! This crate owns the pieces of the admin tool described as C4-C8 in the design: the key
//! schema, the per-action command sequences (including the two atomic server-side scripts), the
//! cluster-redirect-aware pipeline driver, and the reply processors that turn wire replies back
//! into aggregate counts or lease records.
//!
//! Parsing and iterating address ranges (C1-C3) lives in [`net`]; this crate consumes its
//! [`net::range::ParsedRange`]/[`net::range::Address`] types and never reimplements them.

pub mod cluster;
pub mod error;
pub mod keys;
pub mod lease;
pub mod operation;
pub mod pipeline;
pub mod processors;
pub mod report;
pub mod scripts;

#[cfg(test)]
mod testing;

pub use cluster::{BatchOutcome, ClusterExecutor};
pub use error::PoolError;
pub use lease::Lease;
pub use operation::{Action, Operation};
pub use pipeline::{MAX_PIPELINED, drive};
pub use processors::ActionProcessor;
pub use report::OperationReport;
