//! Blocking client
//!
//! Speaks the request/reply protocol over one persistent connection.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::Bytes;

use crate::error::{AtlasError, Result};
use crate::protocol::{read_reply, write_request, Reply, Request};

/// A connection to an AtlasID server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect to a server
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Send one request and wait for its reply
    pub fn call(&mut self, request: &Request) -> Result<Reply> {
        write_request(&mut self.writer, request)?;
        read_reply(&mut self.reader)
    }

    /// Send a command built from string arguments
    pub fn command(&mut self, name: &str, arguments: &[&str]) -> Result<Reply> {
        let arguments = arguments
            .iter()
            .map(|a| Bytes::copy_from_slice(a.as_bytes()));
        self.call(&Request::new(name, arguments))
    }

    /// Next id for `key`, or `None` if the server does not know it
    pub fn get(&mut self, key: &str) -> Result<Option<i64>> {
        match self.command("GET", &[key])? {
            Reply::Bulk(None) => Ok(None),
            Reply::Bulk(Some(data)) => std::str::from_utf8(&data)
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Some)
                .ok_or_else(|| unexpected("GET", &Reply::Bulk(Some(data.clone())))),
            other => Err(into_error("GET", other)),
        }
    }

    /// Create `key` at `value`, or rejoin it if it already exists
    pub fn set(&mut self, key: &str, value: i64) -> Result<()> {
        match self.command("SET", &[key, &value.to_string()])? {
            Reply::Status(_) => Ok(()),
            other => Err(into_error("SET", other)),
        }
    }

    /// Whether `key` is live on the server
    pub fn exists(&mut self, key: &str) -> Result<bool> {
        match self.command("EXISTS", &[key])? {
            Reply::Integer(n) => Ok(n == 1),
            other => Err(into_error("EXISTS", other)),
        }
    }

    /// Delete `key`; returns whether it existed
    pub fn del(&mut self, key: &str) -> Result<bool> {
        match self.command("DEL", &[key])? {
            Reply::Integer(n) => Ok(n == 1),
            other => Err(into_error("DEL", other)),
        }
    }

    /// Select a database index (accepted and ignored by the server)
    pub fn select(&mut self, index: &str) -> Result<()> {
        match self.command("SELECT", &[index])? {
            Reply::Status(_) => Ok(()),
            other => Err(into_error("SELECT", other)),
        }
    }
}

fn into_error(command: &str, reply: Reply) -> AtlasError {
    match reply {
        Reply::Error(message) => AtlasError::Remote(message),
        other => unexpected(command, &other),
    }
}

fn unexpected(command: &str, reply: &Reply) -> AtlasError {
    AtlasError::Protocol(format!("unexpected reply to {}: {:?}", command, reply))
}
