//! Reply definitions
//!
//! Represents replies to clients.

use bytes::Bytes;

/// A typed reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `-ERROR <message>`
    Error(String),

    /// `+<status>`
    Status(String),

    /// `:<n>`
    Integer(i64),

    /// `$<len>` + data, or nil. Empty data is sent as nil.
    Bulk(Option<Bytes>),

    /// `*<count>` + bulk elements
    MultiBulk(Vec<Option<Bytes>>),
}

impl Reply {
    /// `+OK`
    pub fn ok() -> Self {
        Reply::Status("OK".to_string())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Reply::Error(message.into())
    }

    pub fn integer(n: i64) -> Self {
        Reply::Integer(n)
    }

    pub fn bulk(value: impl Into<Bytes>) -> Self {
        Reply::Bulk(Some(value.into()))
    }

    /// Nil bulk (`$-1`)
    pub fn nil() -> Self {
        Reply::Bulk(None)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }
}
