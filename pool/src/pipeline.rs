// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The pipeline driver (C6, §4.6) — "the heart" of this crate.

use net::range::{Address, ParsedRange, RangeIter};

use crate::cluster::{self, BatchOutcome, ClusterExecutor};
use crate::error::PoolError;
use crate::keys;
use crate::operation::Operation;
use crate::processors::ActionProcessor;

/// The maximum number of replies allowed in flight on one connection before a batch is flushed
/// (§4.6, §5, §6 glossary "pipeline depth").
pub const MAX_PIPELINED: usize = 1000;

/// Drive `op` to completion against `executor`, folding every reply into `processor`.
///
/// Implements §4.6 literally: checkpoint `acked`, pipeline up to [`MAX_PIPELINED`] replies' worth
/// of addresses, submit, and either rewind to `acked` on [`BatchOutcome::Redirect`] or advance
/// `acked` past the batch just processed. Addresses are visited in strictly ascending order
/// (§5); nothing in this function is aware of IPv4 vs IPv6 — that's entirely behind
/// [`net::range::RangeIter`].
///
/// # Errors
///
/// Returns [`PoolError::Redis`] (§7 `FatalRedis`) if the executor reports anything other than a
/// redirect/transient failure, which [`crate::cluster::ClusterExecutor`] already folds into
/// [`BatchOutcome::Redirect`].
pub fn drive<E, P>(
    executor: &mut E,
    op: &Operation,
    processor: &mut P,
) -> Result<(), PoolError>
where
    E: ClusterExecutor,
    P: ActionProcessor,
{
    let pool_key = keys::pool_key(&op.pool_id);
    let per_address = processor.reply_count();
    let mut acked: Address = op.range.start;

    loop {
        executor
            .reset(&pool_key)
            .map_err(|e| cluster::fatal(op.action, &op.pool_id, e))?;

        let batch_range = ParsedRange {
            family: op.range.family,
            start: acked,
            end: op.range.end,
            prefix: op.range.prefix,
        };
        let mut iter = RangeIter::new(&batch_range);

        let mut commands = Vec::new();
        let mut batch_addrs = Vec::new();
        let mut owed = 0usize;
        let mut more = true;

        while owed < MAX_PIPELINED && more {
            let addr = iter.current();
            commands.extend(processor.enqueue(
                &op.pool_id,
                op.range_id.as_deref(),
                addr,
                op.range.prefix,
            ));
            batch_addrs.push(addr);
            owed += per_address;
            more = iter.advance();
        }

        match executor
            .submit(&pool_key, &commands)
            .map_err(|e| cluster::fatal(op.action, &op.pool_id, e))?
        {
            BatchOutcome::Redirect => {
                // `acked` is untouched: the next loop iteration rebuilds the exact same batch
                // range against the (by then refreshed) cluster state.
                continue;
            }
            BatchOutcome::Replies(values) => {
                for (i, addr) in batch_addrs.iter().enumerate() {
                    let start = i * per_address;
                    processor.process(*addr, op.range.prefix, &values[start..start + per_address]);
                }
                if !more {
                    return Ok(());
                }
                acked = iter.current();
            }
        }
    }
}
