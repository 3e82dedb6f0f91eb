//! Segment allocator
//!
//! One allocator per sequence key. Each refill reserves `batch` ids with a
//! single transaction (locking read + increment) and the following `batch`
//! calls to [`SegmentAllocator::next`] are served from memory.

use std::sync::Arc;

use parking_lot::Mutex;

use super::SequenceKey;
use crate::error::{AtlasError, Result};
use crate::store::{SqlValue, Store};

/// The reserved block currently being served
///
/// Invariant at rest: `cur <= batch_max`.
#[derive(Debug, Default, Clone, Copy)]
struct Segment {
    /// Last id handed out
    cur: i64,

    /// Upper bound of the reserved block
    batch_max: i64,
}

impl Segment {
    fn at(value: i64) -> Self {
        Self {
            cur: value,
            batch_max: value,
        }
    }

    /// `batch_max < cur + 1`, without overflowing at `i64::MAX`
    fn exhausted(&self) -> bool {
        self.batch_max <= self.cur
    }
}

/// Batched id allocator for one sequence key
pub struct SegmentAllocator {
    key: SequenceKey,

    /// Counter table name, derived once from the key
    table: String,

    /// Ids reserved per refill
    batch: i64,

    store: Arc<dyn Store>,

    /// Serializes every operation on this key
    segment: Mutex<Segment>,
}

impl SegmentAllocator {
    /// Bind an allocator to `key` without touching the store
    ///
    /// The allocator holds no block yet; the first [`next`](Self::next)
    /// refills from the store.
    pub fn new(store: Arc<dyn Store>, key: SequenceKey, batch: i64) -> Result<Self> {
        if batch <= 0 {
            return Err(AtlasError::Config(format!(
                "batch size must be positive, got {}",
                batch
            )));
        }
        let table = key.counter_table();
        Ok(Self {
            key,
            table,
            batch,
            store,
            segment: Mutex::new(Segment::default()),
        })
    }

    /// Issue the next id
    ///
    /// Returns a value strictly greater than every id this allocator has
    /// returned before. Fails with [`AtlasError::KeyNotFound`] if the counter
    /// row is missing at refill time.
    pub fn next(&self) -> Result<i64> {
        let mut segment = self.segment.lock();

        if segment.exhausted() {
            let low = self.reserve()?;
            let high = low
                .checked_add(self.batch)
                .ok_or_else(|| AtlasError::SequenceExhausted(self.key.to_string()))?;
            *segment = Segment {
                cur: low,
                batch_max: high,
            };
            tracing::debug!("Refilled {}: reserved ({}, {}]", self.key, low, high);
        }

        segment.cur += 1;
        Ok(segment.cur)
    }

    /// Reserve the next block: locking read, then advance the stored counter
    /// by `batch` in the same transaction. Returns the value read.
    fn reserve(&self) -> Result<i64> {
        let select = format!(
            "SELECT id FROM {}{}",
            self.table,
            self.store.locking_read_suffix()
        );
        let update = format!("UPDATE {} SET id = id + ?1", self.table);

        let mut tx = self.store.begin()?;
        let rows = tx.query(&select, &[])?;
        let low = match rows.last().and_then(|row| row.first()) {
            Some(value) => value.as_i64()?,
            None => return Err(AtlasError::KeyNotFound(self.key.to_string())),
        };
        if low.checked_add(self.batch).is_none() {
            return Err(AtlasError::SequenceExhausted(self.key.to_string()));
        }
        tx.execute(&update, &[SqlValue::from(self.batch)])?;
        tx.commit()?;
        Ok(low)
    }

    /// Last id handed out, without allocating
    pub fn current(&self) -> i64 {
        self.segment.lock().cur
    }

    /// Initialize the counter at `offset`
    ///
    /// With `force`, the counter table is recreated and seeded with `offset`.
    /// Without it, an existing counter row wins: its stored value is adopted
    /// and `offset` is ignored, which is how a process rejoins a sequence
    /// without resetting it.
    pub fn reset(&self, offset: i64, force: bool) -> Result<()> {
        let mut segment = self.segment.lock();

        if force {
            self.store
                .execute(&format!("DROP TABLE IF EXISTS {}", self.table), &[])?;
            self.store.execute(&self.create_table_sql(false), &[])?;
        } else {
            self.store.execute(&self.create_table_sql(true), &[])?;
            if let Some(stored) = self.read_stored()? {
                tracing::debug!(
                    "Sequence {} already at {}, ignoring offset {}",
                    self.key,
                    stored,
                    offset
                );
                *segment = Segment::at(stored);
                return Ok(());
            }
        }

        let insert = format!("INSERT INTO {} (id) VALUES (?1)", self.table);
        if let Err(e) = self.store.execute(&insert, &[SqlValue::from(offset)]) {
            let drop = format!("DROP TABLE IF EXISTS {}", self.table);
            if let Err(cleanup) = self.store.execute(&drop, &[]) {
                tracing::warn!("Failed to drop half-initialized {}: {}", self.table, cleanup);
            }
            return Err(e);
        }

        *segment = Segment::at(offset);
        tracing::debug!("Seeded sequence {} at {}", self.key, offset);
        Ok(())
    }

    /// Adopt the stored counter value without reserving a block
    ///
    /// The next call to [`next`](Self::next) refills from the store.
    pub fn load(&self) -> Result<i64> {
        let mut segment = self.segment.lock();
        let stored = self
            .read_stored()?
            .ok_or_else(|| AtlasError::KeyNotFound(self.key.to_string()))?;
        *segment = Segment::at(stored);
        Ok(stored)
    }

    /// Drop the counter table
    ///
    /// The in-memory block is discarded too, so this handle cannot keep
    /// serving ids for a sequence that no longer exists.
    pub fn drop_table(&self) -> Result<()> {
        let mut segment = self.segment.lock();
        self.store
            .execute(&format!("DROP TABLE IF EXISTS {}", self.table), &[])?;
        *segment = Segment::default();
        tracing::debug!("Dropped counter table {}", self.table);
        Ok(())
    }

    fn read_stored(&self) -> Result<Option<i64>> {
        let rows = self
            .store
            .query(&format!("SELECT id FROM {}", self.table), &[])?;
        rows.last()
            .and_then(|row| row.first())
            .map(SqlValue::as_i64)
            .transpose()
    }

    fn create_table_sql(&self, if_not_exists: bool) -> String {
        format!(
            "CREATE TABLE {}{} (id BIGINT NOT NULL PRIMARY KEY)",
            if if_not_exists { "IF NOT EXISTS " } else { "" },
            self.table
        )
    }

    pub fn key(&self) -> &SequenceKey {
        &self.key
    }

    pub fn batch(&self) -> i64 {
        self.batch
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

impl std::fmt::Debug for SegmentAllocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let segment = *self.segment.lock();
        f.debug_struct("SegmentAllocator")
            .field("key", &self.key)
            .field("batch", &self.batch)
            .field("cur", &segment.cur)
            .field("batch_max", &segment.batch_max)
            .finish()
    }
}
