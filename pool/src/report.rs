// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Operation Driver (C8, §4.8): turning the accumulator each action produced into the lines an
//! operator sees.

use chrono::{Local, TimeZone};

use crate::lease::Lease;
use crate::operation::Action;

/// What one completed [`crate::operation::Operation`] is reported as.
#[derive(Debug)]
pub enum OperationReport {
    /// ADD/REMOVE/RELEASE: a single aggregate count.
    Count {
        /// the action that produced this count
        action: Action,
        /// how many addresses were actually mutated (replays of already-mutated addresses don't
        /// count, by construction of the idempotent scripts — §4.6)
        count: u64,
    },
    /// SHOW: one record per address that is (or was) a pool member, in iteration order.
    Leases(Vec<Lease>),
}

impl OperationReport {
    /// Render this report as the lines §4.8 describes, given the current time (seconds since
    /// epoch) used to decide each lease's active/expired label.
    #[must_use]
    pub fn render(&self, now: i64) -> Vec<String> {
        match self {
            OperationReport::Count { action, count } => {
                vec![format!("{} {count}", action.verb())]
            }
            OperationReport::Leases(leases) => leases.iter().flat_map(|l| render_lease(l, now)).collect(),
        }
    }
}

fn render_lease(lease: &Lease, now: i64) -> Vec<String> {
    let mut lines = Vec::new();
    let heading = if lease.prefix == lease.address.family().width() {
        lease.address.to_string()
    } else {
        format!("{}/{}", lease.address, lease.prefix)
    };
    lines.push(heading);

    if let Some(range) = &lease.range {
        if !range.is_empty() {
            lines.push(format!("  range: {}", String::from_utf8_lossy(range)));
        }
    }

    let active = lease.is_active(now);
    lines.push(format!("  active: {}", if active { "yes" } else { "no" }));

    let expiry = format_timestamp(lease.next_event);
    if active {
        lines.push(format!("  lease expires: {expiry}"));
        if let Some(device) = &lease.device {
            lines.push(format!("  device id: {}", String::from_utf8_lossy(device)));
        }
        if let Some(gateway) = &lease.gateway {
            lines.push(format!("  gateway id: {}", String::from_utf8_lossy(gateway)));
        }
    } else if lease.next_event != 0 {
        lines.push(format!("  lease expired: {expiry}"));
        if let Some(device) = &lease.device {
            lines.push(format!("  last device id: {}", String::from_utf8_lossy(device)));
        }
        if let Some(gateway) = &lease.gateway {
            lines.push(format!("  last gateway id: {}", String::from_utf8_lossy(gateway)));
        }
    }

    lines
}

/// Human-formatted, local-TZ rendering of a UNIX timestamp (§4.8). `0` (free/released) renders as
/// a literal dash rather than the 1970 epoch, which would be misleading.
fn format_timestamp(unix_seconds: i64) -> String {
    if unix_seconds == 0 {
        return "-".to_string();
    }
    match Local.timestamp_opt(unix_seconds, 0) {
        chrono::LocalResult::Single(dt) => dt.format("%Y-%m-%d %H:%M:%S %Z").to_string(),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use net::range::Address;
    use std::net::Ipv4Addr;

    #[test]
    fn count_renders_single_line() {
        let report = OperationReport::Count {
            action: Action::Add,
            count: 3,
        };
        assert_eq!(report.render(0), vec!["Added 3"]);
    }

    #[test]
    fn just_added_lease_has_no_device_or_gateway() {
        let lease = Lease {
            address: Address::from_v4(Ipv4Addr::new(10, 0, 0, 1)),
            prefix: 32,
            next_event: 0,
            range: None,
            device: None,
            gateway: None,
        };
        let lines = render_lease(&lease, 0);
        assert!(lines.iter().any(|l| l == "  active: no"));
        assert!(!lines.iter().any(|l| l.contains("device")));
    }

    #[test]
    fn active_lease_uses_active_labels() {
        let lease = Lease {
            address: Address::from_v4(Ipv4Addr::new(10, 0, 0, 1)),
            prefix: 32,
            next_event: 2_000_000_000,
            range: None,
            device: Some(b"dev1".to_vec()),
            gateway: None,
        };
        let lines = render_lease(&lease, 0);
        assert!(lines.iter().any(|l| l.starts_with("  lease expires:")));
        assert!(lines.iter().any(|l| l == "  device id: dev1"));
    }

    #[test]
    fn expired_lease_uses_expired_labels() {
        let lease = Lease {
            address: Address::from_v4(Ipv4Addr::new(10, 0, 0, 1)),
            prefix: 32,
            next_event: 1,
            range: None,
            device: Some(b"dev1".to_vec()),
            gateway: None,
        };
        let lines = render_lease(&lease, 2_000_000_000);
        assert!(lines.iter().any(|l| l.starts_with("  lease expired:")));
        assert!(lines.iter().any(|l| l == "  last device id: dev1"));
    }
}
