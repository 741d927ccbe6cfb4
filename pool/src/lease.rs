// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The SHOW-only output record (§3).

use net::range::Address;

/// A single lease record, as read back from the pool by a SHOW operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lease {
    /// the address this lease describes
    pub address: Address,
    /// the allocation prefix the address was read back at
    pub prefix: u8,
    /// UNIX timestamp (seconds) of the next lease event; 0 means free/released
    pub next_event: i64,
    /// the range id this address was added under, if any
    pub range: Option<Vec<u8>>,
    /// the device currently holding this address, if any
    pub device: Option<Vec<u8>>,
    /// the gateway associated with this lease, if any
    pub gateway: Option<Vec<u8>>,
}

impl Lease {
    /// Whether this lease is currently active, i.e. `now <= next_event`.
    ///
    /// A `next_event` of 0 (free/released) is never active for any `now >= 0`.
    #[must_use]
    pub const fn is_active(&self, now: i64) -> bool {
        now <= self.next_event && self.next_event != 0
    }
}
