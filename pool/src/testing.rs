// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An in-memory [`ClusterExecutor`] fake, used only by this crate's own test suite (§8: "a fake
//! in-memory `ClusterExecutor` ... to drive C6/C7 unit tests including the simulated-MOVED
//! rewind-safety property, since a real cluster is out of scope for this repo's own test suite").
//!
//! It decodes the RESP wire bytes [`redis::Cmd::get_packed_command`] produces rather than
//! inspecting `Cmd` internals, so it exercises exactly what a real connection would see on the
//! wire, and re-implements [`crate::scripts::REMOVE_SCRIPT`]/[`crate::scripts::RELEASE_SCRIPT`]'s
//! logic in Rust (there is no embedded Lua interpreter here) matched by exact script-text
//! equality.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;

use redis::{Cmd, Value};

use crate::cluster::{BatchOutcome, ClusterExecutor};
use crate::keys;

#[derive(Debug, Default)]
pub(crate) struct FakeState {
    zsets: HashMap<Vec<u8>, HashMap<Vec<u8>, i64>>,
    hashes: HashMap<Vec<u8>, HashMap<Vec<u8>, Vec<u8>>>,
    device_keys: std::collections::HashSet<Vec<u8>>,
}

impl FakeState {
    pub(crate) fn zscore(&self, pool_id: &[u8], addr: &str) -> Option<i64> {
        self.zsets
            .get(&keys::pool_key(pool_id))
            .and_then(|s| s.get(addr.as_bytes()))
            .copied()
    }

    pub(crate) fn hash_field(&self, pool_id: &[u8], addr: &str, field: &str) -> Option<Vec<u8>> {
        self.hashes
            .get(&keys::address_key(pool_id, addr.as_bytes()))
            .and_then(|h| h.get(field.as_bytes()))
            .cloned()
    }

    pub(crate) fn device_key_exists(&self, pool_id: &[u8], device: &[u8]) -> bool {
        self.device_keys.contains(&keys::device_key(pool_id, device))
    }

    pub(crate) fn seed_device_key(&mut self, pool_id: &[u8], device: &[u8]) {
        self.device_keys.insert(keys::device_key(pool_id, device));
    }
}

/// A [`ClusterExecutor`] that runs entirely in memory, with an optional one-shot forced redirect.
#[derive(Debug, Default)]
pub(crate) struct FakeExecutor {
    pub(crate) state: FakeState,
    pub(crate) redirect_once: bool,
}

impl ClusterExecutor for FakeExecutor {
    fn reset(&mut self, _pool_key: &[u8]) -> Result<(), redis::RedisError> {
        Ok(())
    }

    fn submit(
        &mut self,
        _pool_key: &[u8],
        commands: &[Cmd],
    ) -> Result<BatchOutcome, redis::RedisError> {
        if self.redirect_once {
            self.redirect_once = false;
            return Ok(BatchOutcome::Redirect);
        }

        let mut in_txn = false;
        let mut queued: Vec<Vec<Vec<u8>>> = Vec::new();
        let mut replies = Vec::new();

        for cmd in commands {
            let parts = decode_packed_command(&cmd.get_packed_command());
            let name = String::from_utf8_lossy(&parts[0]).to_ascii_uppercase();
            match name.as_str() {
                "MULTI" => {
                    in_txn = true;
                    queued.clear();
                    replies.push(Value::Okay);
                }
                "EXEC" => {
                    let mut array = Vec::with_capacity(queued.len());
                    for queued_parts in queued.drain(..) {
                        array.push(exec_one(&mut self.state, &queued_parts));
                    }
                    in_txn = false;
                    replies.push(Value::Array(array));
                }
                _ if in_txn => {
                    queued.push(parts);
                    replies.push(Value::SimpleString("QUEUED".to_string()));
                }
                _ => replies.push(exec_one(&mut self.state, &parts)),
            }
        }

        Ok(BatchOutcome::Replies(replies))
    }
}

fn exec_one(state: &mut FakeState, parts: &[Vec<u8>]) -> Value {
    let name = String::from_utf8_lossy(&parts[0]).to_ascii_uppercase();
    match name.as_str() {
        "ZADD" => zadd(state, parts),
        "ZREM" => {
            let key = &parts[1];
            let member = &parts[2];
            let removed = state
                .zsets
                .get_mut(key)
                .is_some_and(|s| s.remove(member).is_some());
            Value::Int(i64::from(removed))
        }
        "ZSCORE" => {
            let key = &parts[1];
            let member = &parts[2];
            match state.zsets.get(key).and_then(|s| s.get(member)) {
                Some(score) => Value::BulkString(score.to_string().into_bytes()),
                None => Value::Nil,
            }
        }
        "HSET" => {
            let key = parts[1].clone();
            let field = parts[2].clone();
            let value = parts[3].clone();
            state.hashes.entry(key).or_default().insert(field, value);
            Value::Int(1)
        }
        "HGET" => {
            let key = &parts[1];
            let field = &parts[2];
            match state.hashes.get(key).and_then(|h| h.get(field)) {
                Some(value) => Value::BulkString(value.clone()),
                None => Value::Nil,
            }
        }
        "DEL" => {
            let key = &parts[1];
            let removed = state.hashes.remove(key).is_some()
                | state.zsets.remove(key).is_some()
                | state.device_keys.remove(key);
            Value::Int(i64::from(removed))
        }
        "EVAL" => {
            let script = String::from_utf8_lossy(&parts[1]).into_owned();
            // parts[2] is numkeys ("1"); parts[3] = KEYS[1] (pool id); parts[4] = ARGV[1] (addr).
            run_script(state, &script, &parts[3], &parts[4])
        }
        other => panic!("fake executor: unsupported command {other}"),
    }
}

fn zadd(state: &mut FakeState, parts: &[Vec<u8>]) -> Value {
    let key = parts[1].clone();
    let mut idx = 2;
    let mut nx = false;
    let mut xx = false;
    let mut ch = false;
    while idx < parts.len() {
        match String::from_utf8_lossy(&parts[idx]).to_ascii_uppercase().as_str() {
            "NX" => {
                nx = true;
                idx += 1;
            }
            "XX" => {
                xx = true;
                idx += 1;
            }
            "CH" => {
                ch = true;
                idx += 1;
            }
            _ => break,
        }
    }
    let score: i64 = String::from_utf8_lossy(&parts[idx]).parse().unwrap_or(0);
    let member = parts[idx + 1].clone();
    let set = state.zsets.entry(key).or_default();
    let existed = set.get(&member).copied();

    let result = match (nx, xx, existed) {
        (true, _, Some(_)) => 0,
        (true, _, None) => {
            set.insert(member, score);
            1
        }
        (_, true, None) => 0,
        (_, true, Some(old)) => {
            set.insert(member, score);
            i64::from(ch && old != score)
        }
        (false, false, old) => {
            let changed = old != Some(score);
            set.insert(member, score);
            if ch { i64::from(changed) } else { i64::from(old.is_none()) }
        }
    };
    Value::Int(result)
}

fn run_script(state: &mut FakeState, script: &str, pool_id: &[u8], addr: &[u8]) -> Value {
    let pool_key = keys::pool_key(pool_id);
    let addr_key = keys::address_key(pool_id, addr);
    let member = addr.to_vec();

    if script == crate::scripts::REMOVE_SCRIPT {
        let removed = state
            .zsets
            .get_mut(&pool_key)
            .is_some_and(|s| s.remove(&member).is_some());
        let device = state
            .hashes
            .get(&addr_key)
            .and_then(|h| h.get(b"device".as_slice()))
            .cloned();
        if let Some(device) = device {
            state.device_keys.remove(&keys::device_key(pool_id, &device));
        }
        state.hashes.remove(&addr_key);
        return Value::Int(i64::from(removed));
    }

    if script == crate::scripts::RELEASE_SCRIPT {
        let is_member = state.zsets.get(&pool_key).is_some_and(|s| s.contains_key(&member));
        if !is_member {
            return Value::Int(0);
        }
        state.zsets.get_mut(&pool_key).expect("checked above").insert(member, 0);
        let device = state
            .hashes
            .get(&addr_key)
            .and_then(|h| h.get(b"device".as_slice()))
            .cloned();
        if let Some(device) = device {
            state.device_keys.remove(&keys::device_key(pool_id, &device));
        }
        return Value::Int(1);
    }

    panic!("fake executor: unrecognized EVAL script");
}

/// Decode one RESP array-of-bulk-strings command as produced by `Cmd::get_packed_command`.
fn decode_packed_command(bytes: &[u8]) -> Vec<Vec<u8>> {
    assert_eq!(bytes.first(), Some(&b'*'), "expected a RESP array");
    let (count, mut idx) = read_resp_int(bytes, 1);
    let mut parts = Vec::with_capacity(count as usize);
    for _ in 0..count {
        assert_eq!(bytes.get(idx), Some(&b'$'), "expected a RESP bulk string");
        let (len, next) = read_resp_int(bytes, idx + 1);
        idx = next;
        #[allow(clippy::cast_sign_loss)]
        let len = len as usize;
        parts.push(bytes[idx..idx + len].to_vec());
        idx += len + 2; // skip the trailing CRLF
    }
    parts
}

fn read_resp_int(bytes: &[u8], start: usize) -> (i64, usize) {
    let mut end = start;
    while bytes[end] != b'\r' {
        end += 1;
    }
    #[allow(clippy::unwrap_used)] // test-only helper decoding our own well-formed commands
    let n: i64 = std::str::from_utf8(&bytes[start..end]).unwrap().parse().unwrap();
    (n, end + 2) // skip CRLF
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operation::{Action, Operation};
    use crate::pipeline::drive;
    use crate::processors::{AddProcessor, ReleaseProcessor, RemoveProcessor, ShowProcessor};
    use net::range::ParsedRange;

    fn op(action: Action, text: &str) -> Operation {
        let range = ParsedRange::parse(text, 0).expect("valid range");
        Operation::new(action, text, b"pool1".to_vec(), Some(text.as_bytes().to_vec()), range)
    }

    #[test]
    fn add_then_add_again_is_idempotent() {
        let mut exec = FakeExecutor::default();
        let mut first = AddProcessor::default();
        drive(&mut exec, &op(Action::Add, "10.0.0.0/30"), &mut first).unwrap();
        assert_eq!(first.into_output(), 3);

        let mut second = AddProcessor::default();
        drive(&mut exec, &op(Action::Add, "10.0.0.0/30"), &mut second).unwrap();
        assert_eq!(second.into_output(), 0);
    }

    #[test]
    fn release_then_remove_then_show_is_empty() {
        let mut exec = FakeExecutor::default();
        let mut add = AddProcessor::default();
        drive(&mut exec, &op(Action::Add, "10.0.0.1"), &mut add).unwrap();
        exec.state.seed_device_key(b"pool1", b"dev1");
        exec.state
            .hashes
            .entry(keys::address_key(b"pool1", b"10.0.0.1"))
            .or_default()
            .insert(b"device".to_vec(), b"dev1".to_vec());

        let mut release = ReleaseProcessor::default();
        drive(&mut exec, &op(Action::Release, "10.0.0.1"), &mut release).unwrap();
        assert_eq!(release.into_output(), 1);
        assert!(!exec.state.device_key_exists(b"pool1", b"dev1"));
        assert_eq!(exec.state.zscore(b"pool1", "10.0.0.1"), Some(0));

        let mut remove = RemoveProcessor::default();
        drive(&mut exec, &op(Action::Remove, "10.0.0.1"), &mut remove).unwrap();
        assert_eq!(remove.into_output(), 1);
        assert_eq!(exec.state.zscore(b"pool1", "10.0.0.1"), None);
        assert_eq!(exec.state.hash_field(b"pool1", "10.0.0.1", "device"), None);

        let mut show = ShowProcessor::default();
        drive(&mut exec, &op(Action::Show, "10.0.0.1"), &mut show).unwrap();
        assert!(show.into_output().is_empty());
    }

    #[test]
    fn redirect_mid_batch_yields_same_state_as_no_redirect() {
        let mut without_redirect = FakeExecutor::default();
        let mut p1 = AddProcessor::default();
        drive(&mut without_redirect, &op(Action::Add, "10.0.0.0/29"), &mut p1).unwrap();

        let mut with_redirect = FakeExecutor {
            redirect_once: true,
            ..FakeExecutor::default()
        };
        let mut p2 = AddProcessor::default();
        drive(&mut with_redirect, &op(Action::Add, "10.0.0.0/29"), &mut p2).unwrap();

        assert_eq!(p1.into_output(), p2.into_output());
        for host in 0..7u8 {
            let addr = format!("10.0.0.{host}");
            assert_eq!(
                without_redirect.state.zscore(b"pool1", &addr),
                with_redirect.state.zscore(b"pool1", &addr),
            );
        }
    }
}
