// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Error taxonomy for the cluster-facing half of the pool protocol (§7: `TransientRedis` is
//! absorbed internally by [`crate::pipeline::drive`]; everything that escapes it is `FatalRedis`).

use crate::operation::Action;

/// Errors raised while driving an [`crate::operation::Operation`] against the cluster.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The underlying Redis client reported an error that is not a redirect and not a transient
    /// connection failure — a fatal condition per §7.
    #[error("redis error while running {action:?} against pool {pool}: {source}")]
    Redis {
        /// the action being performed when the error occurred
        action: Action,
        /// the pool-id the operation targeted
        pool: String,
        /// the underlying client error
        #[source]
        source: redis::RedisError,
    },
}
