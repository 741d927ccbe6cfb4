// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! CLI-layer errors (§7 `UsageError`, exit code 64).

/// An error in how the tool was invoked, as opposed to a failure while it ran.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    /// `clap` itself rejected the argument list (unknown flag, missing value, ...).
    #[error(transparent)]
    Clap(#[from] clap::Error),
    /// `-p` was given before any `-a`/`-d`/`-r`/`-s` operation had been appended.
    #[error("-p given before any of -a/-d/-r/-s")]
    PrefixBeforeOperation,
    /// The range text attached to an operation flag could not be parsed.
    #[error("invalid range '{text}': {source}")]
    InvalidRange {
        /// the offending range text
        text: String,
        /// why it didn't parse
        #[source]
        source: net::range::RangeParseError,
    },
    /// `-p`'s argument was not a valid non-negative integer.
    #[error("'{0}' is not a valid prefix length")]
    InvalidPrefixLength(String),
    /// The `-f` configuration file could not be read or contained a malformed line.
    #[error("reading config file '{path}': {detail}")]
    ConfigFile {
        /// the path that was given to `-f`
        path: String,
        /// what went wrong
        detail: String,
    },
    /// A required positional argument (`server` or `pool`) was missing after CLI and config-file
    /// resolution.
    #[error("missing required argument: {0}")]
    MissingPositional(&'static str),
}

impl UsageError {
    /// The process exit code §7 assigns to this error: 64 for a true usage error, 1 for a range
    /// that failed to parse (§7 categorizes that as `ParseError`, which shares exit code 1 with
    /// runtime/Redis failures rather than `UsageError`'s 64).
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            UsageError::InvalidRange { .. } => 1,
            UsageError::Clap(_)
            | UsageError::PrefixBeforeOperation
            | UsageError::InvalidPrefixLength(_)
            | UsageError::ConfigFile { .. }
            | UsageError::MissingPositional(_) => 64,
        }
    }
}
