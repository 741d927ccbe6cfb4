// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The CLI argument layer (§4.9, §6).
//!
//! Built against `clap`'s builder API rather than the `#[derive(Parser)]` macro specifically
//! because of the ordering rule in §6: a `-p <N>` attaches to "the most recently appended
//! operation", which requires recovering the left-to-right interleaving of four independent
//! repeatable flags (`-a`/`-d`/`-r`/`-s`) — something `ArgMatches::indices_of` exposes but the
//! derive macro does not.

use clap::{Arg, ArgAction, Command};
use net::range::ParsedRange;
use pool::{Action as PoolAction, Operation};

use crate::config::ConfigFile;
use crate::error::UsageError;

/// One of the four reserved, not-yet-implemented flags (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reserved {
    /// `-i`: ISC lease-file import
    Import,
    /// `-I`: ISC lease-file import (alternate form)
    ImportAlt,
    /// `-S`: statistics
    Stats,
    /// `-o`: ISC lease-file export
    Export,
}

/// The fully resolved result of parsing argv (and, if `-f` was given, a config file).
#[derive(Debug)]
pub struct ParsedArgs {
    /// `server[:port]`
    pub server: String,
    /// the pool id
    pub pool: String,
    /// the operations to run, in command-line order
    pub operations: Vec<Operation>,
    /// number of times `-x` was repeated
    pub verbosity: u8,
    /// set if one of the reserved flags was given; the caller prints `NOT YET IMPLEMENTED` and
    /// exits 1 without running anything
    pub reserved: Option<Reserved>,
    /// set if `-h` was given; the caller prints usage and exits 0 without running anything
    pub help: bool,
}

/// Build the `clap::Command` describing every flag in §6.
#[must_use]
pub fn command() -> Command {
    Command::new("ippool")
        .about("Administer a Redis-backed IP address lease pool")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(Arg::new("server").index(1).value_name("server[:port]"))
        .arg(Arg::new("pool").index(2).value_name("pool"))
        .arg(Arg::new("range").index(3).value_name("range"))
        .arg(
            Arg::new("a")
                .short('a')
                .value_name("prefix")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("d")
                .short('d')
                .value_name("prefix")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("r")
                .short('r')
                .value_name("prefix")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("s")
                .short('s')
                .value_name("prefix")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("p")
                .short('p')
                .value_name("N")
                .action(ArgAction::Append),
        )
        .arg(Arg::new("f").short('f').value_name("file"))
        .arg(Arg::new("h").short('h').action(ArgAction::SetTrue))
        .arg(Arg::new("x").short('x').action(ArgAction::Count))
        .arg(Arg::new("i").short('i').action(ArgAction::SetTrue))
        .arg(Arg::new("I").short('I').action(ArgAction::SetTrue))
        .arg(Arg::new("S").short('S').action(ArgAction::SetTrue))
        .arg(Arg::new("o").short('o').action(ArgAction::SetTrue))
}

/// Parse `argv` (not including the program name) into a [`ParsedArgs`].
///
/// # Errors
///
/// Returns [`UsageError`] for anything `clap` itself rejects, a `-p` with no preceding operation
/// flag, an unparsable range or prefix, or a missing `server`/`pool` after config-file defaults
/// are applied.
pub fn parse<I, T>(argv: I) -> Result<ParsedArgs, UsageError>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = command().try_get_matches_from(argv)?;

    let help = matches.get_flag("h");
    let reserved = [
        (matches.get_flag("i"), Reserved::Import),
        (matches.get_flag("I"), Reserved::ImportAlt),
        (matches.get_flag("S"), Reserved::Stats),
        (matches.get_flag("o"), Reserved::Export),
    ]
    .into_iter()
    .find_map(|(set, r)| set.then_some(r));
    let verbosity = matches.get_count("x");

    let config = match matches.get_one::<String>("f") {
        Some(path) => ConfigFile::load(std::path::Path::new(path))?,
        None => ConfigFile::default(),
    };

    let server = matches
        .get_one::<String>("server")
        .cloned()
        .or(config.server)
        .ok_or(UsageError::MissingPositional("server"))?;
    let pool = matches
        .get_one::<String>("pool")
        .cloned()
        .or(config.pool)
        .ok_or(UsageError::MissingPositional("pool"))?;
    let default_prefix = config.prefix.unwrap_or(0);

    let mut drafts = collect_operation_flags(&matches);
    drafts.sort_by_key(|(index, ..)| *index);
    let mut prefixes = vec![default_prefix; drafts.len()];
    apply_prefix_flags(&matches, &drafts, &mut prefixes)?;

    let mut operations = Vec::with_capacity(drafts.len());
    for ((_, action, text), prefix) in drafts.into_iter().zip(prefixes) {
        operations.push(build_operation(action, text, &pool, prefix)?);
    }

    if operations.is_empty() {
        if let Some(range) = matches.get_one::<String>("range") {
            operations.push(build_operation(
                PoolAction::Show,
                range.clone(),
                &pool,
                default_prefix,
            )?);
        }
    }

    Ok(ParsedArgs {
        server,
        pool,
        operations,
        verbosity,
        reserved,
        help,
    })
}

type OperationDraft = (usize, PoolAction, String);

fn collect_operation_flags(matches: &clap::ArgMatches) -> Vec<OperationDraft> {
    let mut drafts = Vec::new();
    for (id, action) in [
        ("a", PoolAction::Add),
        ("d", PoolAction::Remove),
        ("r", PoolAction::Release),
        ("s", PoolAction::Show),
    ] {
        let (Some(indices), Some(values)) = (matches.indices_of(id), matches.get_many::<String>(id))
        else {
            continue;
        };
        for (index, value) in indices.zip(values) {
            drafts.push((index, action, value.clone()));
        }
    }
    drafts
}

fn apply_prefix_flags(
    matches: &clap::ArgMatches,
    drafts: &[OperationDraft],
    prefixes: &mut [u8],
) -> Result<(), UsageError> {
    let (Some(indices), Some(values)) = (matches.indices_of("p"), matches.get_many::<String>("p"))
    else {
        return Ok(());
    };
    for (p_index, value) in indices.zip(values) {
        let prefix: u8 = value
            .parse()
            .map_err(|_| UsageError::InvalidPrefixLength(value.clone()))?;
        let target = drafts.iter().rposition(|(index, ..)| *index < p_index);
        match target {
            Some(pos) => prefixes[pos] = prefix,
            None => return Err(UsageError::PrefixBeforeOperation),
        }
    }
    Ok(())
}

fn build_operation(
    action: PoolAction,
    text: String,
    pool_id: &str,
    prefix: u8,
) -> Result<Operation, UsageError> {
    let range = ParsedRange::parse(&text, prefix).map_err(|source| UsageError::InvalidRange {
        text: text.clone(),
        source,
    })?;
    Ok(Operation::new(
        action,
        text.clone(),
        pool_id.as_bytes().to_vec(),
        Some(text.into_bytes()),
        range,
    ))
}
