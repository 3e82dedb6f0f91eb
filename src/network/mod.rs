//! Network Module
//!
//! TCP server, per-connection handling and a blocking client.
//!
//! ## Architecture
//! - Single acceptor thread polling a non-blocking listener
//! - One thread per connection
//! - Requests routed through the Dispatcher

mod client;
mod connection;
mod server;

pub use client::Client;
pub use connection::Connection;
pub use server::{Server, ShutdownHandle, ACCEPT_POLL_INTERVAL};
