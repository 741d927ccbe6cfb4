// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Redis key schema (§3, §4.4).
//!
//! Every key for a pool shares the braced `{<pool>}` hash tag so that the pool's ZSET, every
//! address hash, and every device reverse key land in the same cluster hash slot — the precondition
//! for the `MULTI`/`EXEC` and `EVAL` sequences in [`crate::scripts`] and [`crate::processors`] to be
//! atomic.

use net::range::Address;

/// The pool's ZSET key: `{<pool>}:pool`.
#[must_use]
pub fn pool_key(pool_id: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(pool_id.len() + 7);
    key.push(b'{');
    key.extend_from_slice(pool_id);
    key.extend_from_slice(b"}:pool");
    key
}

/// The address hash key: `{<pool>}:ip:<addr>`.
#[must_use]
pub fn address_key(pool_id: &[u8], address_text: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(pool_id.len() + address_text.len() + 6);
    key.push(b'{');
    key.extend_from_slice(pool_id);
    key.extend_from_slice(b"}:ip:");
    key.extend_from_slice(address_text);
    key
}

/// The device reverse key: `{<pool>}:device:<devid>`.
#[must_use]
pub fn device_key(pool_id: &[u8], device_id: &[u8]) -> Vec<u8> {
    let mut key = Vec::with_capacity(pool_id.len() + device_id.len() + 10);
    key.push(b'{');
    key.extend_from_slice(pool_id);
    key.extend_from_slice(b"}:device:");
    key.extend_from_slice(device_id);
    key
}

/// The canonical text an address is stored under as a ZSET member / address-hash suffix.
///
/// Per §4.4: the address's textual form, followed by `/P` only when `prefix` is a sub-prefix
/// allocation (`prefix != family width`). Host allocations (`prefix == family width`) never carry
/// the suffix.
#[must_use]
pub fn address_text(address: Address, prefix: u8) -> String {
    if prefix == address.family().width() {
        address.to_string()
    } else {
        format!("{address}/{prefix}")
    }
}
