// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The two atomic server-side scripts used by REMOVE and RELEASE (§4.5).
//!
//! Both scripts take `KEYS[1]` = the pool id (not a full key — the script derives the braced keys
//! itself, matching [`crate::keys`]) and `ARGV[1]` = the address text. Keeping the derivation
//! inside the script (rather than passing three pre-built keys) keeps the `EVAL ... 1 <pool-id>
//! <addr>` wire shape fixed regardless of how many keys a given action happens to touch.

/// `ZREM` the address; unconditionally delete its address hash (tolerating a hash that already
/// doesn't exist); if the hash had a `device` field, also delete the device reverse key. Returns 1
/// if the `ZREM` removed a ZSET member, 0 otherwise — independent of whether the hash/device keys
/// existed, so a half-cleaned-up pool (§4.5: "MUST tolerate partially-removed state") still
/// reports truthfully on the one thing that matters: was this address still allocated.
pub const REMOVE_SCRIPT: &str = r"
local pool = KEYS[1]
local addr = ARGV[1]
local poolkey = '{' .. pool .. '}:pool'
local ipkey = '{' .. pool .. '}:ip:' .. addr
local removed = redis.call('ZREM', poolkey, addr)
local device = redis.call('HGET', ipkey, 'device')
if device then
    redis.call('DEL', '{' .. pool .. '}:device:' .. device)
end
redis.call('DEL', ipkey)
if removed == 1 then
    return 1
end
return 0
";

/// `ZSCORE` first to test pool membership (not `ZADD ... CH`, whose change flag is 0 for an
/// address that is already scored 0 — e.g. one that was just ADDed and never allocated — which
/// would make RELEASE under-report on exactly that address). If the address isn't a pool member,
/// return 0 without touching anything else. Otherwise `ZADD XX 0 <addr>` to (re-)zero its expiry,
/// and if the address hash has a `device` field, delete the device reverse key; return 1. RELEASE
/// never deletes the ZSET entry or the address hash: the address stays allocated to the pool, only
/// unlinked from its device, ready for the live allocator to pick back up.
pub const RELEASE_SCRIPT: &str = r"
local pool = KEYS[1]
local addr = ARGV[1]
local poolkey = '{' .. pool .. '}:pool'
local ipkey = '{' .. pool .. '}:ip:' .. addr
local score = redis.call('ZSCORE', poolkey, addr)
if not score then
    return 0
end
redis.call('ZADD', poolkey, 'XX', 0, addr)
local device = redis.call('HGET', ipkey, 'device')
if device then
    redis.call('DEL', '{' .. pool .. '}:device:' .. device)
end
return 1
";
