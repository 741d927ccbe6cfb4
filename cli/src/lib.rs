// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![forbid(unsafe_code)]
#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Argument parsing and output formatting for the pool admin tool's CLI binary.
//!
//! The core (range parsing/iteration in [`net`], pipeline/reply protocol in [`pool`]) doesn't
//! live here; this crate is exactly the "ambient stack" §4.9/§4.10/§4.11 describe: a thin `clap`
//! layer that resolves `ArgMatches` into a connection target plus an ordered [`pool::Operation`]
//! list, a narrow config-file reader, and the exit-code/usage-error conventions of §6/§7.

pub mod args;
pub mod config;
pub mod error;

pub use args::{ParsedArgs, Reserved};
pub use error::UsageError;
