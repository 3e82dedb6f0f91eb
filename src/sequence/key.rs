//! Sequence key grammar
//!
//! Keys become part of SQL identifiers, so only `[A-Za-z0-9_]{1,64}` is
//! accepted. A `SequenceKey` can only be obtained through [`SequenceKey::parse`].

use std::fmt;

use crate::error::{AtlasError, Result};

/// Longest accepted key, in bytes
pub const MAX_KEY_LEN: usize = 64;

/// Prefix of every per-key counter table
pub const COUNTER_TABLE_PREFIX: &str = "seq_";

/// A validated sequence name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceKey(String);

impl SequenceKey {
    /// Validate raw bytes from the wire
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.is_empty() {
            return Err(AtlasError::NoKey);
        }
        let invalid = |reason| AtlasError::InvalidKey {
            key: String::from_utf8_lossy(raw).into_owned(),
            reason,
        };
        if raw.len() > MAX_KEY_LEN {
            return Err(invalid("longer than 64 bytes"));
        }
        if !raw.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'_') {
            return Err(invalid("only letters, digits and '_' are allowed"));
        }
        // ascii checked above
        let key = String::from_utf8_lossy(raw).into_owned();
        Ok(Self(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the table holding this key's counter row
    pub fn counter_table(&self) -> String {
        format!("{}{}", COUNTER_TABLE_PREFIX, self.0)
    }
}

impl fmt::Display for SequenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for SequenceKey {
    type Error = AtlasError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s.as_bytes())
    }
}
