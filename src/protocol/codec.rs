//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request Format
//! ```text
//! *<N>\r\n                      element count (command + arguments)
//! $<len>\r\n<bytes>\r\n         repeated N times, first is the command
//! ```
//!
//! ### Reply Format
//! ```text
//! +OK\r\n                       status
//! -ERROR <message>\r\n          error
//! :<n>\r\n                      integer
//! $<len>\r\n<bytes>\r\n         bulk ($-1\r\n for nil)
//! *<count>\r\n<bulk>...         multi bulk
//! ```

use std::io::{self, BufRead, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use super::{Reply, Request};
use crate::error::{AtlasError, Result};

/// Maximum number of elements in one request
pub const MAX_ARGUMENTS: usize = 1024;

/// Maximum size of one request element (16 MB)
pub const MAX_ARGUMENT_SIZE: usize = 16 * 1024 * 1024;

/// Longest `*<N>` / `$<len>` header line
const MAX_HEADER_LEN: u64 = 32;

/// Longest status or error line accepted when reading replies
const MAX_REPLY_LINE_LEN: u64 = 64 * 1024;

const CRLF: &[u8] = b"\r\n";

// =============================================================================
// Line helpers
// =============================================================================

fn read_line<R: BufRead>(reader: &mut R, limit: u64) -> Result<Vec<u8>> {
    let mut line = Vec::new();
    reader.by_ref().take(limit).read_until(b'\n', &mut line)?;
    Ok(line)
}

fn malformed(expected: &str, got: &[u8]) -> AtlasError {
    AtlasError::Protocol(format!(
        "{:?} does not match {}",
        String::from_utf8_lossy(got),
        expected
    ))
}

fn closed() -> AtlasError {
    AtlasError::Io(io::Error::new(
        io::ErrorKind::UnexpectedEof,
        "connection closed",
    ))
}

/// Parse `<prefix><decimal>\r\n`
fn parse_header(line: &[u8], prefix: u8, expected: &str) -> Result<i64> {
    let body = line
        .strip_prefix(&[prefix])
        .and_then(|rest| rest.strip_suffix(CRLF))
        .ok_or_else(|| malformed(expected, line))?;
    std::str::from_utf8(body)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| malformed(expected, line))
}

/// Read exactly `len` bytes followed by CRLF
fn read_bulk_body<R: BufRead>(reader: &mut R, len: usize) -> Result<Bytes> {
    let mut data = Vec::with_capacity(len);
    reader.by_ref().take(len as u64).read_to_end(&mut data)?;
    if data.len() != len {
        return Err(AtlasError::Protocol(format!(
            "argument length {} does not match {}",
            data.len(),
            len
        )));
    }

    let mut terminator = [0u8; 2];
    match reader.read_exact(&mut terminator) {
        Ok(()) if terminator == *CRLF => Ok(Bytes::from(data)),
        Ok(()) => Err(AtlasError::Protocol("line should end with CRLF".to_string())),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(AtlasError::Protocol("line should end with CRLF".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Read a complete request from a stream
///
/// A stream that ends before the first byte of a frame yields
/// `AtlasError::Io` with `UnexpectedEof`; a frame cut short anywhere else is
/// a protocol error.
pub fn read_request<R: BufRead>(reader: &mut R) -> Result<Request> {
    let line = read_line(reader, MAX_HEADER_LEN)?;
    if line.is_empty() {
        return Err(closed());
    }

    let count = parse_header(&line, b'*', "*<#Arguments>")?;
    if count < 1 || count as usize > MAX_ARGUMENTS {
        return Err(AtlasError::Protocol(format!(
            "argument count {} out of range 1..={}",
            count, MAX_ARGUMENTS
        )));
    }

    let command = read_argument(reader)?;
    let mut arguments = Vec::with_capacity(count as usize - 1);
    for _ in 1..count {
        arguments.push(read_argument(reader)?);
    }

    Ok(Request {
        command: String::from_utf8_lossy(&command).to_ascii_uppercase(),
        arguments,
    })
}

fn read_argument<R: BufRead>(reader: &mut R) -> Result<Bytes> {
    let line = read_line(reader, MAX_HEADER_LEN)?;
    let len = parse_header(&line, b'$', "$<ArgumentLength>")?;
    if len < 0 || len as usize > MAX_ARGUMENT_SIZE {
        return Err(AtlasError::Protocol(format!(
            "argument length {} out of range 0..={}",
            len, MAX_ARGUMENT_SIZE
        )));
    }
    read_bulk_body(reader, len as usize)
}

fn put_header(buf: &mut BytesMut, prefix: u8, n: i64) {
    buf.put_u8(prefix);
    buf.put_slice(n.to_string().as_bytes());
    buf.put_slice(CRLF);
}

fn put_element(buf: &mut BytesMut, data: &[u8]) {
    put_header(buf, b'$', data.len() as i64);
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Bytes {
    let mut buf = BytesMut::new();
    put_header(&mut buf, b'*', 1 + request.arguments.len() as i64);
    put_element(&mut buf, request.command.as_bytes());
    for argument in &request.arguments {
        put_element(&mut buf, argument);
    }
    buf.freeze()
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    writer.write_all(&encode_request(request))?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Reply Encoding/Decoding
// =============================================================================

/// Single-line payloads must not break framing
fn put_line(buf: &mut BytesMut, text: &str) {
    for b in text.bytes() {
        buf.put_u8(if b == b'\r' || b == b'\n' { b' ' } else { b });
    }
    buf.put_slice(CRLF);
}

fn put_bulk(buf: &mut BytesMut, value: Option<&Bytes>) {
    match value {
        Some(data) if !data.is_empty() => put_element(buf, data),
        _ => buf.put_slice(b"$-1\r\n"),
    }
}

/// Append the wire encoding of `reply` to `buf`
pub fn encode_reply(reply: &Reply, buf: &mut BytesMut) {
    match reply {
        Reply::Error(message) => {
            buf.put_slice(b"-ERROR ");
            put_line(buf, message);
        }
        Reply::Status(status) => {
            buf.put_u8(b'+');
            put_line(buf, status);
        }
        Reply::Integer(n) => put_header(buf, b':', *n),
        Reply::Bulk(value) => put_bulk(buf, value.as_ref()),
        Reply::MultiBulk(values) => {
            put_header(buf, b'*', values.len() as i64);
            for value in values {
                put_bulk(buf, value.as_ref());
            }
        }
    }
}

/// Write a reply to a stream
pub fn write_reply<W: Write>(writer: &mut W, reply: &Reply) -> Result<()> {
    let mut buf = BytesMut::with_capacity(64);
    encode_reply(reply, &mut buf);
    writer.write_all(&buf)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete reply from a stream
pub fn read_reply<R: BufRead>(reader: &mut R) -> Result<Reply> {
    let line = read_line(reader, MAX_REPLY_LINE_LEN)?;
    if line.is_empty() {
        return Err(closed());
    }
    let text = || -> Result<String> {
        line.get(1..)
            .and_then(|rest| rest.strip_suffix(CRLF))
            .map(|body| String::from_utf8_lossy(body).into_owned())
            .ok_or_else(|| malformed("<type><payload>\\r\\n", &line))
    };

    match line[0] {
        b'+' => Ok(Reply::Status(text()?)),
        b'-' => {
            let message = text()?;
            let message = message
                .strip_prefix("ERROR ")
                .map(str::to_string)
                .unwrap_or(message);
            Ok(Reply::Error(message))
        }
        b':' => Ok(Reply::Integer(parse_header(&line, b':', ":<Integer>")?)),
        b'$' => Ok(Reply::Bulk(read_bulk_value(reader, &line)?)),
        b'*' => {
            let count = parse_header(&line, b'*', "*<Count>")?;
            if count < 0 || count as usize > MAX_ARGUMENTS {
                return Err(malformed("*<Count>", &line));
            }
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                let element = read_line(reader, MAX_HEADER_LEN)?;
                values.push(read_bulk_value(reader, &element)?);
            }
            Ok(Reply::MultiBulk(values))
        }
        _ => Err(malformed("reply type byte", &line)),
    }
}

fn read_bulk_value<R: BufRead>(reader: &mut R, line: &[u8]) -> Result<Option<Bytes>> {
    let len = parse_header(line, b'$', "$<ArgumentLength>")?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 || len as usize > MAX_ARGUMENT_SIZE {
        return Err(malformed("$<ArgumentLength>", line));
    }
    Ok(Some(read_bulk_body(reader, len as usize)?))
}
