//! # AtlasID
//!
//! A unique-ID service with:
//! - Independently named, monotonically increasing sequences
//! - Segment-based allocation: one store transaction per `batch` ids
//! - A durable key catalog for rehydration after restart
//! - A Redis-style TCP protocol (GET / SET / EXISTS / DEL / SELECT)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │               (one thread per connection)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  Request / Reply
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Dispatcher                               │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    KeyRegistry                               │
//! │        key → SegmentAllocator (per-key lock)                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  refill / reset / catalog
//!                       ▼
//!               ┌───────────────┐
//!               │     Store     │
//!               │   (SQLite)    │
//!               └───────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod dispatcher;
pub mod network;
pub mod protocol;
pub mod sequence;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::{AtlasError, Result};
pub use sequence::{KeyRegistry, SegmentAllocator, SequenceKey};
pub use store::{SqliteStore, Store};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of AtlasID
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
