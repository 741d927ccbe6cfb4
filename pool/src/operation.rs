// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The `Operation` the CLI layer builds and [`crate::pipeline::drive`] executes (§3, §6).

use net::range::ParsedRange;

/// The action an [`Operation`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// `ZADD NX` every address in range; owned by [`crate::processors::AddProcessor`].
    Add,
    /// `EVAL` the remove script for every address; owned by
    /// [`crate::processors::RemoveProcessor`].
    Remove,
    /// `EVAL` the release script for every address; owned by
    /// [`crate::processors::ReleaseProcessor`].
    Release,
    /// Read-only `MULTI`/`ZSCORE`/`HGET`×3/`EXEC` for every address; owned by
    /// [`crate::processors::ShowProcessor`].
    Show,
}

impl Action {
    /// The verb used in an aggregate count line (§4.8): "Added 3", "Removed 1", "Released 1".
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Action::Add => "Added",
            Action::Remove => "Removed",
            Action::Release => "Released",
            Action::Show => "Shown",
        }
    }
}

/// One `-a`/`-d`/`-r`/`-s` flag, resolved to a concrete address range and ready to drive.
///
/// Invariants (checked at construction time by [`net::range::ParsedRange::parse`], not
/// re-checked here): `range.start.family == range.end.family`; `range.start <= range.end`; both
/// endpoints are masked to `range.prefix`; `range.prefix` is within bounds for the family.
#[derive(Debug, Clone)]
pub struct Operation {
    /// the action to perform
    pub action: Action,
    /// the range text as typed on the command line, kept for error messages
    pub original_text: String,
    /// the pool id (used, braced, as the hash tag for every key this operation touches)
    pub pool_id: Vec<u8>,
    /// an optional range id recorded against every address this operation touches (ADD only)
    pub range_id: Option<Vec<u8>>,
    /// the normalized, masked address range to iterate
    pub range: ParsedRange,
}

impl Operation {
    /// Construct an operation from its already-parsed range.
    #[must_use]
    pub fn new(
        action: Action,
        original_text: impl Into<String>,
        pool_id: impl Into<Vec<u8>>,
        range_id: Option<Vec<u8>>,
        range: ParsedRange,
    ) -> Self {
        Operation {
            action,
            original_text: original_text.into(),
            pool_id: pool_id.into(),
            range_id,
            range,
        }
    }
}
