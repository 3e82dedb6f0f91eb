//! Sequence Module
//!
//! Segment-based id allocation and the per-process key registry.
//!
//! ## Responsibilities
//! - Reserve blocks of `batch` ids from the store in one transaction
//! - Serve ids from memory until the block is exhausted
//! - Track live allocators per key and the durable key catalog
//! - Rehydrate allocators for catalogued keys on startup
//!
//! ## Locking
//! ```text
//!   KeyRegistry  ── Mutex<HashMap<key, Arc<SegmentAllocator>>>   (membership only)
//!        │
//!        └── SegmentAllocator ── Mutex<Segment>                  (per key, held across refill)
//! ```
//! The registry lock is never held across a store call, so a slow refill on
//! one key never blocks lookups for another.

mod allocator;
mod key;
mod registry;

pub use allocator::SegmentAllocator;
pub use key::{SequenceKey, COUNTER_TABLE_PREFIX, MAX_KEY_LEN};
pub use registry::{KeyRegistry, RehydrateReport, CATALOG_TABLE};

/// Ids reserved per store round trip unless configured otherwise
pub const DEFAULT_BATCH_SIZE: i64 = 2000;
