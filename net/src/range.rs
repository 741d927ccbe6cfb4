// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Family-generic address ranges: parsing, normalization, and iteration.
//!
//! A range is always expressed, after parsing, as a `(start, end, prefix)` triple where `start`
//! and `end` are masked to `prefix` bits and `prefix` is the bit-length of the allocation unit
//! the caller steps through. [`RangeIter`] walks that triple one unit at a time.

use crate::wideint::Uint128;
use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// The address family of a range or address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    /// IPv4
    V4,
    /// IPv6
    V6,
}

impl Family {
    /// The number of address bits in this family (32 for IPv4, 128 for IPv6).
    #[must_use]
    pub const fn width(self) -> u8 {
        match self {
            Family::V4 => 32,
            Family::V6 => 128,
        }
    }
}

impl Display for Family {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Family::V4 => write!(f, "ipv4"),
            Family::V6 => write!(f, "ipv6"),
        }
    }
}

/// An address of either family, stored as a 128-bit value zero-extended into the low bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address {
    family: Family,
    bits: Uint128,
}

impl Address {
    /// The address family.
    #[must_use]
    pub const fn family(self) -> Family {
        self.family
    }

    /// The raw 128-bit value (host byte order), zero-extended for IPv4.
    #[must_use]
    pub const fn bits(self) -> Uint128 {
        self.bits
    }

    /// Wrap an [`Ipv4Addr`] as an [`Address`].
    #[must_use]
    pub fn from_v4(addr: Ipv4Addr) -> Self {
        Address {
            family: Family::V4,
            bits: Uint128::from_hi_lo(0, u64::from(addr.to_bits())),
        }
    }

    /// Wrap an [`Ipv6Addr`] as an [`Address`].
    #[must_use]
    pub fn from_v6(addr: Ipv6Addr) -> Self {
        Address {
            family: Family::V6,
            bits: Uint128::from_u128(addr.to_bits()),
        }
    }

    /// Wrap an [`IpAddr`] as an [`Address`].
    #[must_use]
    pub fn from_ip(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(addr) => Address::from_v4(addr),
            IpAddr::V6(addr) => Address::from_v6(addr),
        }
    }

    /// Convert back to an [`IpAddr`].
    #[must_use]
    pub fn to_ip(self) -> IpAddr {
        match self.family {
            Family::V4 => {
                #[allow(clippy::cast_possible_truncation)] // always fits: low 32 bits of a v4 address
                let bits = self.bits.lo() as u32;
                IpAddr::V4(Ipv4Addr::from_bits(bits))
            }
            Family::V6 => IpAddr::V6(Ipv6Addr::from_bits(self.bits.to_u128())),
        }
    }

    /// Mask `self` to the top `prefix` bits of its family width, zeroing the rest.
    #[must_use]
    pub fn masked(self, prefix: u8) -> Self {
        Address {
            family: self.family,
            bits: self.bits.band(network_mask(self.family.width(), prefix)),
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_ip())
    }
}

/// Errors which may occur while parsing or normalizing a range.
#[derive(Debug, thiserror::Error)]
pub enum RangeParseError {
    /// The input text could not be interpreted as an address, CIDR, or `A-B` range.
    #[error("'{0}' is not a valid address, network, or range")]
    RangeMalformed(String),
    /// The two endpoints of an `A-B` range are of different address families.
    #[error("range endpoints are of different address families")]
    FamilyMismatch,
    /// The first endpoint of an `A-B` range is numerically after the second.
    #[error("range start is after range end")]
    StartAfterEnd,
    /// The allocation prefix is out of bounds for the range (`P < start.prefix` or `P` exceeds
    /// the family width).
    #[error("allocation prefix {prefix} is out of bounds for a {family} range whose network is /{network_prefix}")]
    PrefixOutOfBounds {
        /// requested allocation prefix
        prefix: u8,
        /// the family of the range
        family: Family,
        /// the range's own network prefix length
        network_prefix: u8,
    },
    /// `P - start.prefix` exceeds 64, which would make the iteration count exceed `2^64`.
    #[error("prefix span {0} exceeds the maximum of 64")]
    PrefixSpanTooLarge(u32),
}

/// A normalized address range: `start` and `end` masked to `prefix` bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRange {
    /// the address family of this range
    pub family: Family,
    /// the first address/sub-prefix to allocate
    pub start: Address,
    /// the last address/sub-prefix to allocate
    pub end: Address,
    /// the allocation unit's prefix length
    pub prefix: u8,
}

impl ParsedRange {
    /// Parse range text `s` with allocation prefix `requested_prefix` (0 meaning "use the family
    /// width").
    ///
    /// # Errors
    ///
    /// See [`RangeParseError`].
    #[tracing::instrument(level = "trace")]
    pub fn parse(s: &str, requested_prefix: u8) -> Result<ParsedRange, RangeParseError> {
        if let Some((a, b)) = split_once_range(s) {
            return Self::parse_explicit_range(a, b, requested_prefix);
        }
        if let Some((addr, len)) = s.split_once('/') {
            return Self::parse_cidr(addr, len, requested_prefix);
        }
        let addr = parse_addr(s)?;
        let width = addr.family().width();
        Self::parse_cidr_parts(addr, width, width, requested_prefix)
    }

    fn parse_explicit_range(
        a: &str,
        b: &str,
        requested_prefix: u8,
    ) -> Result<ParsedRange, RangeParseError> {
        let a = parse_addr(a)?;
        let b = parse_addr(b)?;
        if a.family() != b.family() {
            return Err(RangeParseError::FamilyMismatch);
        }
        if a.bits() > b.bits() {
            return Err(RangeParseError::StartAfterEnd);
        }
        let width = a.family().width();
        let prefix = effective_prefix(requested_prefix, width);
        // An `A-B` range carries no CIDR notation and so no network prefix to bound `P` from
        // below; the only checks that apply are `P <= width` and the `A <= B` ordering already
        // checked above.
        if prefix > width {
            return Err(RangeParseError::PrefixOutOfBounds {
                prefix,
                family: a.family(),
                network_prefix: 0,
            });
        }
        Ok(ParsedRange {
            family: a.family(),
            start: a.masked(prefix),
            end: b.masked(prefix),
            prefix,
        })
    }

    fn parse_cidr(
        addr: &str,
        len: &str,
        requested_prefix: u8,
    ) -> Result<ParsedRange, RangeParseError> {
        let addr = parse_addr(addr)?;
        let width = addr.family().width();
        let network_prefix = len
            .parse::<u8>()
            .ok()
            .filter(|n| *n <= width)
            .ok_or_else(|| RangeParseError::RangeMalformed(format!("{addr}/{len}")))?;
        Self::parse_cidr_parts(addr, network_prefix, width, requested_prefix)
    }

    fn parse_cidr_parts(
        addr: Address,
        network_prefix: u8,
        width: u8,
        requested_prefix: u8,
    ) -> Result<ParsedRange, RangeParseError> {
        let prefix = effective_prefix(requested_prefix, width);
        check_prefix_bounds(prefix, network_prefix, addr.family(), width)?;
        let start = addr.masked(network_prefix);
        let end = range_end(start, network_prefix, prefix, width);
        Ok(ParsedRange {
            family: addr.family(),
            start,
            end,
            prefix,
        })
    }
}

/// The effective allocation prefix: `requested` if nonzero, else the family width.
const fn effective_prefix(requested: u8, width: u8) -> u8 {
    if requested == 0 { width } else { requested }
}

fn check_prefix_bounds(
    prefix: u8,
    network_prefix: u8,
    family: Family,
    width: u8,
) -> Result<(), RangeParseError> {
    if prefix < network_prefix || prefix > width {
        return Err(RangeParseError::PrefixOutOfBounds {
            prefix,
            family,
            network_prefix,
        });
    }
    let span = u32::from(prefix) - u32::from(network_prefix);
    if span > 64 {
        return Err(RangeParseError::PrefixSpanTooLarge(span));
    }
    Ok(())
}

/// Compute the final address of a range per §4.2 rule 3: the start of the last `prefix`-sized
/// allocation unit within the `network_prefix`-sized network, with the broadcast address
/// excluded when `prefix` equals the family width.
fn range_end(start: Address, network_prefix: u8, prefix: u8, width: u8) -> Address {
    let host_bits = network_mask(width, prefix).wrapping_sub(network_mask(width, network_prefix));
    let candidate = Address {
        family: start.family,
        bits: start.bits.bor(host_bits),
    };
    if prefix != width {
        return candidate;
    }
    if network_prefix >= width.saturating_sub(1) {
        return start;
    }
    Address {
        family: start.family,
        bits: candidate.bits.wrapping_sub(Uint128::ONE),
    }
}

/// A mask with the top `prefix` bits of a `width`-bit field set, the rest zero.
fn network_mask(width: u8, prefix: u8) -> Uint128 {
    if prefix == 0 {
        return Uint128::ZERO;
    }
    if prefix >= width {
        return full_width_mask(width);
    }
    let host_mask = Uint128::ONE
        .shl(u32::from(width - prefix))
        .wrapping_sub(Uint128::ONE);
    full_width_mask(width).wrapping_sub(host_mask)
}

/// A mask with all `width` low bits set, the rest zero.
fn full_width_mask(width: u8) -> Uint128 {
    if width >= 128 {
        Uint128::MAX
    } else {
        Uint128::ONE.shl(u32::from(width)).wrapping_sub(Uint128::ONE)
    }
}

/// Split `s` on the first `-` that separates two addresses (not occurring inside either one;
/// IPv4/IPv6 literals never contain `-`, so the first `-` is always the separator).
fn split_once_range(s: &str) -> Option<(&str, &str)> {
    s.split_once('-')
}

fn parse_addr(s: &str) -> Result<Address, RangeParseError> {
    if let Ok(addr) = Ipv4Addr::from_str(s) {
        return Ok(Address::from_v4(addr));
    }
    if let Ok(addr) = Ipv6Addr::from_str(s) {
        return Ok(Address::from_v6(addr));
    }
    Err(RangeParseError::RangeMalformed(s.to_string()))
}

/// Steps through a [`ParsedRange`] one allocation unit at a time.
///
/// Mirrors the source's in-place cursor stepping as a pure, non-aliased "next" operation:
/// [`RangeIter::advance`] returns `false` (no more units) iff the cursor, before advancing,
/// already equals the range's end.
#[derive(Debug, Clone)]
pub struct RangeIter {
    family: Family,
    current: Uint128,
    end: Uint128,
    step: Uint128,
    done: bool,
}

impl RangeIter {
    /// Build an iterator over `range`.
    #[must_use]
    pub fn new(range: &ParsedRange) -> Self {
        let width = range.family.width();
        let step = Uint128::ONE.shl(u32::from(width - range.prefix));
        RangeIter {
            family: range.family,
            current: range.start.bits,
            end: range.end.bits,
            step,
            done: false,
        }
    }

    /// The address the cursor currently points to.
    #[must_use]
    pub const fn current(&self) -> Address {
        Address {
            family: self.family,
            bits: self.current,
        }
    }

    /// Advance the cursor by one allocation unit.
    ///
    /// Returns `true` if the (now current) address should be processed, `false` if the range is
    /// exhausted (the cursor was already at `end` before this call).
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        if self.current == self.end {
            self.done = true;
            return false;
        }
        self.current = self.current.wrapping_add(self.step);
        true
    }

    /// The total number of allocation units this range covers.
    #[must_use]
    pub fn unit_count(range: &ParsedRange) -> Uint128 {
        let width = range.family.width();
        let span = range.end.bits.wrapping_sub(range.start.bits);
        // span / step, where step = 2^(width - prefix); step is always a power of two so this is
        // a plain right shift rather than a division.
        let shift = u32::from(width - range.prefix);
        Uint128::from_u128(span.to_u128() >> shift).wrapping_add(Uint128::ONE)
    }
}
