// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The injected cluster-connection capability (§1, §4.6, §5).
//!
//! [`ClusterExecutor`] is the seam between this crate's pipeline driver and an actual Redis
//! cluster connection/slot map, which the distilled spec explicitly places out of scope ("assumed
//! available as an injected capability"). [`RedisClusterExecutor`] is the concrete implementation
//! backing it, built on `redis::cluster::ClusterConnection`; [`crate::testing`] provides an
//! in-memory fake for driver/processor unit tests that don't want a real Redis cluster.

use redis::cluster::{ClusterClient, ClusterClientBuilder, ClusterConnection};
use redis::{Cmd, ConnectionLike, ErrorKind, Pipeline, Value};

use crate::operation::Action;

/// What came back from submitting one batch of commands.
#[derive(Debug)]
pub enum BatchOutcome {
    /// One [`Value`] per submitted command, in submission order.
    Replies(Vec<Value>),
    /// The server redirected the batch (MOVED/ASK) or the connection dropped mid-batch. Per §4.6
    /// step 5, the driver discards anything already sent and rewinds to the last acknowledged
    /// address without touching `processor`.
    Redirect,
}

/// The cluster-connection capability the pipeline driver (§4.6) is built against.
///
/// A pool key is passed to both methods (rather than being bound once at construction) because
/// §4.6 step 2 re-acquires "a connection and a cluster-state handle keyed by `op.pool`" at the top
/// of every batch, not just on redirect.
pub trait ClusterExecutor {
    /// (Re-)acquire cluster-slot state for `pool_key` before a new batch starts.
    ///
    /// # Errors
    ///
    /// Returns an error if a fresh connection/slot map could not be obtained at all (§7
    /// `FatalRedis`); a plain redirect is reported by [`Self::submit`], not here.
    fn reset(&mut self, pool_key: &[u8]) -> Result<(), redis::RedisError>;

    /// Submit `commands` as one pipeline against the node currently addressed by `pool_key`.
    ///
    /// # Errors
    ///
    /// Returns an error for anything that isn't a redirect or a retryable connection failure —
    /// those two cases are folded into `Ok(BatchOutcome::Redirect)` so the driver can rewind and
    /// retry uniformly (§7: `TransientRedis` is handled internally).
    fn submit(
        &mut self,
        pool_key: &[u8],
        commands: &[Cmd],
    ) -> Result<BatchOutcome, redis::RedisError>;
}

/// A [`ClusterExecutor`] backed by a real `redis::cluster::ClusterConnection`.
///
/// Built with `retries(0)`: the `redis` crate's own cluster client can transparently follow
/// MOVED/ASK redirects, but this tool's whole point (§1, §4.6) is to own that rewind itself, so
/// auto-follow is disabled and a redirect is surfaced to [`ClusterExecutor::submit`] as an error
/// instead, which this type turns into [`BatchOutcome::Redirect`].
pub struct RedisClusterExecutor {
    client: ClusterClient,
    conn: ClusterConnection,
}

impl RedisClusterExecutor {
    /// Connect to the cluster reachable via `nodes` (`host:port` strings, per §6's
    /// `<server[:port]>` positional — the `redis://` scheme `redis`'s own `IntoConnectionInfo`
    /// requires is added here rather than pushed onto every caller).
    ///
    /// # Errors
    ///
    /// Returns an error if no initial connection to any seed node could be established.
    pub fn connect(nodes: Vec<String>) -> Result<Self, redis::RedisError> {
        let urls = nodes.into_iter().map(|n| node_url(&n)).collect::<Vec<_>>();
        let client = ClusterClientBuilder::new(urls).retries(0).build()?;
        let conn = client.get_connection()?;
        Ok(RedisClusterExecutor { client, conn })
    }
}

/// Prefix a bare `host[:port]` with the `redis://` scheme it needs to parse as a connection URL;
/// left untouched if the caller already supplied one (or any other scheme).
fn node_url(node: &str) -> String {
    if node.contains("://") {
        node.to_string()
    } else {
        format!("redis://{node}")
    }
}

impl ClusterExecutor for RedisClusterExecutor {
    fn reset(&mut self, pool_key: &[u8]) -> Result<(), redis::RedisError> {
        tracing::trace!(
            pool_key = %String::from_utf8_lossy(pool_key),
            "reacquiring cluster connection for next batch"
        );
        self.conn = self.client.get_connection()?;
        Ok(())
    }

    fn submit(
        &mut self,
        pool_key: &[u8],
        commands: &[Cmd],
    ) -> Result<BatchOutcome, redis::RedisError> {
        let mut pipe = Pipeline::new();
        for cmd in commands {
            pipe.add_command(cmd.clone());
        }
        match pipe.query::<Vec<Value>>(&mut self.conn) {
            Ok(values) => Ok(BatchOutcome::Replies(values)),
            Err(err) if matches!(err.kind(), ErrorKind::Moved | ErrorKind::Ask) => {
                tracing::debug!(
                    pool_key = %String::from_utf8_lossy(pool_key),
                    %err,
                    "cluster redirect mid-batch, rewinding"
                );
                Ok(BatchOutcome::Redirect)
            }
            Err(err) if err.is_io_error() || err.is_connection_dropped() => {
                tracing::debug!(
                    pool_key = %String::from_utf8_lossy(pool_key),
                    %err,
                    "transient connection failure mid-batch, rewinding"
                );
                Ok(BatchOutcome::Redirect)
            }
            Err(err) => Err(err),
        }
    }
}

/// Wrap a bare [`redis::RedisError`] with the action/pool context §7's `FatalRedis` reporting
/// expects.
pub(crate) fn fatal(
    action: Action,
    pool_id: &[u8],
    source: redis::RedisError,
) -> crate::error::PoolError {
    crate::error::PoolError::Redis {
        action,
        pool: String::from_utf8_lossy(pool_id).into_owned(),
        source,
    }
}
