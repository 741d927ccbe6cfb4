// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Per-action command builders (C5, §4.5) and reply processors (C7, §4.7), unified behind one
//! trait per DESIGN NOTES §9 ("re-express [the callback pair] as a polymorphic action abstraction
//! with two operations").

use net::range::Address;
use redis::{Cmd, Value};

use crate::keys;
use crate::lease::Lease;

/// The two operations the pipeline driver (§4.6) needs from an action, replacing the source's
/// enqueue/process function-pointer pair with a trait so each action can own a differently-typed
/// accumulator (DESIGN NOTES §9, "opaque output pointer").
pub trait ActionProcessor {
    /// The type this processor accumulates into, recovered by [`Self::into_output`].
    type Output;

    /// The fixed number of wire replies each address produces for this action (§4.5). The driver
    /// uses this to size pipeline batches and to slice the reply stream back into one chunk per
    /// address.
    fn reply_count(&self) -> usize;

    /// Build the command sequence for one address.
    fn enqueue(
        &self,
        pool_id: &[u8],
        range_id: Option<&[u8]>,
        address: Address,
        prefix: u8,
    ) -> Vec<Cmd>;

    /// Consume this address's slice of replies (exactly [`Self::reply_count`] long, in submission
    /// order) and fold it into the accumulator.
    fn process(&mut self, address: Address, prefix: u8, replies: &[Value]);

    /// Recover the finished accumulator after every address in the operation has been processed.
    fn into_output(self) -> Self::Output;
}

/// Pull a nullable byte string out of a [`Value`], logging and treating anything else as absent.
fn opt_bytes(address: Address, field: &str, value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Nil => None,
        Value::BulkString(bytes) => Some(bytes.clone()),
        Value::SimpleString(s) => Some(s.clone().into_bytes()),
        other => {
            tracing::debug!(%address, field, ?other, "unexpected reply shape, treating as absent");
            None
        }
    }
}

/// Parse an integer-valued reply (`ZADD`/`ZREM`/`EVAL` return RESP integers).
fn as_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(n) => Some(*n),
        Value::BulkString(bytes) => std::str::from_utf8(bytes).ok()?.parse().ok(),
        _ => None,
    }
}

/// ADD: `MULTI`; `ZADD <pool-key> NX 0 <addr>`; `HSET <addr-key> range <range-id>`; `EXEC`.
#[derive(Debug, Default)]
pub struct AddProcessor {
    count: u64,
}

impl ActionProcessor for AddProcessor {
    type Output = u64;

    fn reply_count(&self) -> usize {
        4
    }

    fn enqueue(
        &self,
        pool_id: &[u8],
        range_id: Option<&[u8]>,
        address: Address,
        prefix: u8,
    ) -> Vec<Cmd> {
        let pool_key = keys::pool_key(pool_id);
        let addr_text = keys::address_text(address, prefix);
        let addr_key = keys::address_key(pool_id, addr_text.as_bytes());

        let mut zadd = redis::cmd("ZADD");
        zadd.arg(&pool_key).arg("NX").arg(0).arg(&addr_text);

        let mut hset = redis::cmd("HSET");
        hset.arg(&addr_key).arg("range").arg(range_id.unwrap_or(b""));

        vec![redis::cmd("MULTI"), zadd, hset, redis::cmd("EXEC")]
    }

    fn process(&mut self, address: Address, _prefix: u8, replies: &[Value]) {
        let Value::Array(fields) = &replies[3] else {
            tracing::debug!(%address, "ADD: EXEC reply was not an array, skipping");
            return;
        };
        let Some(added) = fields.first().and_then(as_int) else {
            tracing::debug!(%address, "ADD: ZADD reply was not an integer, skipping");
            return;
        };
        #[allow(clippy::cast_sign_loss)] // ZADD NX returns 0 or 1
        {
            self.count += added.max(0) as u64;
        }
    }

    fn into_output(self) -> u64 {
        self.count
    }
}

/// REMOVE: `EVAL <remove-script> 1 <pool-id> <addr>`.
#[derive(Debug, Default)]
pub struct RemoveProcessor {
    count: u64,
}

impl ActionProcessor for RemoveProcessor {
    type Output = u64;

    fn reply_count(&self) -> usize {
        1
    }

    fn enqueue(
        &self,
        pool_id: &[u8],
        _range_id: Option<&[u8]>,
        address: Address,
        prefix: u8,
    ) -> Vec<Cmd> {
        let addr_text = keys::address_text(address, prefix);
        let mut eval = redis::cmd("EVAL");
        eval.arg(crate::scripts::REMOVE_SCRIPT)
            .arg(1)
            .arg(pool_id)
            .arg(&addr_text);
        vec![eval]
    }

    fn process(&mut self, address: Address, _prefix: u8, replies: &[Value]) {
        let Some(removed) = as_int(&replies[0]) else {
            tracing::debug!(%address, "REMOVE: reply was not an integer, skipping");
            return;
        };
        #[allow(clippy::cast_sign_loss)]
        {
            self.count += removed.max(0) as u64;
        }
    }

    fn into_output(self) -> u64 {
        self.count
    }
}

/// RELEASE: `EVAL <release-script> 1 <pool-id> <addr>`.
#[derive(Debug, Default)]
pub struct ReleaseProcessor {
    count: u64,
}

impl ActionProcessor for ReleaseProcessor {
    type Output = u64;

    fn reply_count(&self) -> usize {
        1
    }

    fn enqueue(
        &self,
        pool_id: &[u8],
        _range_id: Option<&[u8]>,
        address: Address,
        prefix: u8,
    ) -> Vec<Cmd> {
        let addr_text = keys::address_text(address, prefix);
        let mut eval = redis::cmd("EVAL");
        eval.arg(crate::scripts::RELEASE_SCRIPT)
            .arg(1)
            .arg(pool_id)
            .arg(&addr_text);
        vec![eval]
    }

    fn process(&mut self, address: Address, _prefix: u8, replies: &[Value]) {
        let Some(released) = as_int(&replies[0]) else {
            tracing::debug!(%address, "RELEASE: reply was not an integer, skipping");
            return;
        };
        #[allow(clippy::cast_sign_loss)]
        {
            self.count += released.max(0) as u64;
        }
    }

    fn into_output(self) -> u64 {
        self.count
    }
}

/// SHOW: `MULTI`; `ZSCORE <pool-key> <addr>`; `HGET <addr-key> device`; `HGET <addr-key> gateway`;
/// `HGET <addr-key> range`; `EXEC`.
#[derive(Debug, Default)]
pub struct ShowProcessor {
    leases: Vec<Lease>,
}

impl ActionProcessor for ShowProcessor {
    type Output = Vec<Lease>;

    fn reply_count(&self) -> usize {
        6
    }

    fn enqueue(
        &self,
        pool_id: &[u8],
        _range_id: Option<&[u8]>,
        address: Address,
        prefix: u8,
    ) -> Vec<Cmd> {
        let pool_key = keys::pool_key(pool_id);
        let addr_text = keys::address_text(address, prefix);
        let addr_key = keys::address_key(pool_id, addr_text.as_bytes());

        let mut zscore = redis::cmd("ZSCORE");
        zscore.arg(&pool_key).arg(&addr_text);

        let mut hget_device = redis::cmd("HGET");
        hget_device.arg(&addr_key).arg("device");

        let mut hget_gateway = redis::cmd("HGET");
        hget_gateway.arg(&addr_key).arg("gateway");

        let mut hget_range = redis::cmd("HGET");
        hget_range.arg(&addr_key).arg("range");

        vec![
            redis::cmd("MULTI"),
            zscore,
            hget_device,
            hget_gateway,
            hget_range,
            redis::cmd("EXEC"),
        ]
    }

    fn process(&mut self, address: Address, prefix: u8, replies: &[Value]) {
        let Value::Array(fields) = &replies[5] else {
            tracing::debug!(%address, "SHOW: EXEC reply was not an array, skipping");
            return;
        };
        let [score, device, gateway, range] = fields.as_slice() else {
            tracing::debug!(%address, len = fields.len(), "SHOW: EXEC array had unexpected arity, skipping");
            return;
        };
        if matches!(score, Value::Nil) {
            // Address is not (or no longer) a pool member; nothing to report (§8 scenario 6).
            return;
        }
        let Some(next_event) = opt_bytes(address, "score", score)
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .and_then(|s| s.parse::<i64>().ok())
        else {
            tracing::debug!(%address, "SHOW: score reply was not integer-valued, skipping");
            return;
        };
        self.leases.push(Lease {
            address,
            prefix,
            next_event,
            device: opt_bytes(address, "device", device),
            gateway: opt_bytes(address, "gateway", gateway),
            range: opt_bytes(address, "range", range),
        });
    }

    fn into_output(self) -> Vec<Lease> {
        self.leases
    }
}
