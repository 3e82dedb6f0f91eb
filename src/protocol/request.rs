//! Request definitions
//!
//! Represents commands from clients.

use bytes::Bytes;

use crate::error::{AtlasError, Result};

/// A parsed request: command name plus raw arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Upper-cased command name
    pub command: String,

    /// Arguments in wire order, uninterpreted
    pub arguments: Vec<Bytes>,
}

impl Request {
    /// Build a request, upper-casing the command name
    pub fn new<I, A>(command: &str, arguments: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        Self {
            command: command.to_ascii_uppercase(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_argument(&self, index: usize) -> bool {
        index < self.arguments.len()
    }

    /// Argument at `index`, or `NotEnoughArguments`
    pub fn argument(&self, index: usize) -> Result<&Bytes> {
        self.arguments
            .get(index)
            .ok_or(AtlasError::NotEnoughArguments)
    }

    /// Argument at `index` parsed as a decimal `i64`
    pub fn get_int(&self, index: usize) -> Result<i64> {
        let raw = self.argument(index)?;
        std::str::from_utf8(raw)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(AtlasError::ExpectedInteger)
    }
}
