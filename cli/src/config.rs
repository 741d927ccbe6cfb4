// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The `-f <file>` configuration-file reader (§4.10).
//!
//! Deliberately the smallest possible stand-in for "a configuration-file reader": a `key = value`
//! text format, `#` comments, blank lines ignored. It exists only to default `server`/`pool`
//! (and optionally the allocation `prefix`) when `-f` is given — values given directly on the
//! command line always win (see [`crate::args::resolve`]).

use std::fs;
use std::path::Path;

use crate::error::UsageError;

/// The subset of fields this tool's config file understands.
#[derive(Debug, Default, Clone)]
pub struct ConfigFile {
    /// default `server[:port]`
    pub server: Option<String>,
    /// default pool id
    pub pool: Option<String>,
    /// default allocation prefix length, applied to every operation that doesn't set its own
    pub prefix: Option<u8>,
}

impl ConfigFile {
    /// Load and parse `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::ConfigFile`] if the file can't be read, or a line isn't
    /// `key = value`, or `prefix` isn't a valid integer.
    pub fn load(path: &Path) -> Result<ConfigFile, UsageError> {
        let text = fs::read_to_string(path).map_err(|e| UsageError::ConfigFile {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::parse(&text).map_err(|detail| UsageError::ConfigFile {
            path: path.display().to_string(),
            detail,
        })
    }

    fn parse(text: &str) -> Result<ConfigFile, String> {
        let mut config = ConfigFile::default();
        for (lineno, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                return Err(format!("line {}: expected 'key = value'", lineno + 1));
            };
            let key = key.trim();
            let value = value.trim();
            match key {
                "server" => config.server = Some(value.to_string()),
                "pool" => config.pool = Some(value.to_string()),
                "prefix" => {
                    let prefix: u8 = value
                        .parse()
                        .map_err(|_| format!("line {}: '{value}' is not a valid prefix", lineno + 1))?;
                    config.prefix = Some(prefix);
                }
                other => return Err(format!("line {}: unknown key '{other}'", lineno + 1)),
            }
        }
        Ok(config)
    }
}
