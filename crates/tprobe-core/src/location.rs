//! Probe locations.

#![allow(missing_docs)]

use std::fmt;
use std::str::FromStr;

use smol_str::SmolStr;

use crate::error::ProbeError;

/// A program point where the host can suspend execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Location {
    /// Source position, written `file:line`.
    Source { file: SmolStr, line: u32 },
    /// Symbol plus byte offset, written `symbol+offset` (decimal or `0x` hex).
    Symbol { name: SmolStr, offset: u64 },
}

impl Location {
    /// Create a source location.
    #[must_use]
    pub fn source(file: impl Into<SmolStr>, line: u32) -> Self {
        Self::Source {
            file: file.into(),
            line,
        }
    }

    /// Create a symbol location.
    #[must_use]
    pub fn symbol(name: impl Into<SmolStr>, offset: u64) -> Self {
        Self::Symbol {
            name: name.into(),
            offset,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Source { file, line } => write!(f, "{file}:{line}"),
            Location::Symbol { name, offset: 0 } => write!(f, "{name}"),
            Location::Symbol { name, offset } => write!(f, "{name}+{offset:#x}"),
        }
    }
}

impl FromStr for Location {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let invalid = || ProbeError::InvalidLocation(SmolStr::new(s));
        if text.is_empty() || text.chars().any(char::is_whitespace) || text.contains(['[', ']']) {
            return Err(invalid());
        }
        if let Some((file, line)) = text.rsplit_once(':') {
            // `ns::fn` is a symbol, not a file.
            if file.is_empty() || file.ends_with(':') {
                return parse_symbol(text).ok_or_else(invalid);
            }
            let line = line.parse::<u32>().map_err(|_| invalid())?;
            if line == 0 {
                return Err(invalid());
            }
            return Ok(Location::source(file, line));
        }
        parse_symbol(text).ok_or_else(invalid)
    }
}

fn parse_symbol(text: &str) -> Option<Location> {
    let (name, offset) = match text.rsplit_once('+') {
        Some((name, offset)) => (name, parse_offset(offset)?),
        None => (text, 0),
    };
    if name.is_empty() || name.contains('+') {
        return None;
    }
    Some(Location::symbol(name, offset))
}

fn parse_offset(text: &str) -> Option<u64> {
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}
