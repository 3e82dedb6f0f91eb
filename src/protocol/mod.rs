//! Protocol Module
//!
//! Defines the wire protocol for client-server communication: Redis-style
//! length-prefixed framing over a persistent TCP connection.
//!
//! ### Request Format
//! ```text
//! *2\r\n$3\r\nGET\r\n$6\r\norders\r\n
//! ```
//!
//! ### Commands
//! - GET    key         → bulk id, or nil for an unknown key
//! - SET    key value   → +OK
//! - EXISTS key         → :1 / :0
//! - DEL    key         → :1 / :0
//! - SELECT index       → +OK
//!
//! ### Reply Types
//! - `+` status, `-ERROR` error, `:` integer, `$` bulk, `*` multi bulk

mod codec;
mod reply;
mod request;

pub use codec::{
    encode_reply, encode_request, read_reply, read_request, write_reply, write_request,
    MAX_ARGUMENTS, MAX_ARGUMENT_SIZE,
};
pub use reply::Reply;
pub use request::Request;
