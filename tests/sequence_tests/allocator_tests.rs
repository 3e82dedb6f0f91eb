//! Tests for SegmentAllocator
//!
//! These tests verify:
//! - Strictly increasing ids, including under concurrent callers
//! - One store transaction per `batch` ids
//! - Seeding and adoption on reset
//! - Missing counter rows and exhausted sequences

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use atlasid::error::{AtlasError, Result};
use atlasid::sequence::{SegmentAllocator, SequenceKey};
use atlasid::store::{Row, SqlValue, SqliteStore, Store, StoreTransaction};

// =============================================================================
// Helper Functions
// =============================================================================

/// Store wrapper counting how many transactions were opened
struct CountingStore {
    inner: SqliteStore,
    transactions: AtomicUsize,
}

impl CountingStore {
    fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            transactions: AtomicUsize::new(0),
        }
    }

    fn transactions(&self) -> usize {
        self.transactions.load(Ordering::SeqCst)
    }
}

impl Store for CountingStore {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        self.inner.execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.inner.query(sql, params)
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        self.transactions.fetch_add(1, Ordering::SeqCst);
        self.inner.begin()
    }

    fn locking_read_suffix(&self) -> &'static str {
        self.inner.locking_read_suffix()
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        self.inner.table_exists(table)
    }
}

/// Store wrapper whose counter seeding always fails
struct SeedFailingStore {
    inner: SqliteStore,
}

impl Store for SeedFailingStore {
    fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize> {
        if sql.starts_with("INSERT INTO seq_") {
            return Err(AtlasError::Store("disk I/O error".to_string()));
        }
        self.inner.execute(sql, params)
    }

    fn query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.inner.query(sql, params)
    }

    fn begin(&self) -> Result<Box<dyn StoreTransaction + '_>> {
        self.inner.begin()
    }

    fn locking_read_suffix(&self) -> &'static str {
        self.inner.locking_read_suffix()
    }

    fn table_exists(&self, table: &str) -> Result<bool> {
        self.inner.table_exists(table)
    }
}

fn key(name: &str) -> SequenceKey {
    SequenceKey::try_from(name).unwrap()
}

fn memory_store() -> Arc<dyn Store> {
    Arc::new(SqliteStore::open_in_memory().unwrap())
}

fn stored_value(store: &dyn Store, table: &str) -> i64 {
    let rows = store.query(&format!("SELECT id FROM {}", table), &[]).unwrap();
    rows[0][0].as_i64().unwrap()
}

// =============================================================================
// Construction Tests
// =============================================================================

#[test]
fn test_new_does_not_touch_store() {
    let store = memory_store();
    let allocator = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();

    assert_eq!(allocator.current(), 0);
    assert_eq!(allocator.table(), "seq_orders");
    assert!(!store.table_exists("seq_orders").unwrap());
}

#[test]
fn test_rejects_non_positive_batch() {
    let store = memory_store();
    assert!(matches!(
        SegmentAllocator::new(Arc::clone(&store), key("orders"), 0),
        Err(AtlasError::Config(_))
    ));
    assert!(SegmentAllocator::new(store, key("orders"), -5).is_err());
}

// =============================================================================
// Reset Tests
// =============================================================================

#[test]
fn test_reset_seeds_fresh_key() {
    let store = memory_store();
    let allocator = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();

    allocator.reset(100, false).unwrap();

    assert_eq!(stored_value(store.as_ref(), "seq_orders"), 100);
    assert_eq!(allocator.current(), 100);
    assert_eq!(allocator.next().unwrap(), 101);
}

#[test]
fn test_reset_adopts_existing_row() {
    let store = memory_store();
    let first = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    first.reset(100, false).unwrap();
    first.next().unwrap(); // stored counter is now 110

    let second = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    second.reset(5, false).unwrap();

    assert_eq!(stored_value(store.as_ref(), "seq_orders"), 110);
    assert_eq!(second.current(), 110);
    assert_eq!(second.next().unwrap(), 111);
}

#[test]
fn test_forced_reset_overwrites() {
    let store = memory_store();
    let allocator = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    allocator.reset(100, false).unwrap();
    allocator.next().unwrap();

    allocator.reset(7, true).unwrap();

    assert_eq!(stored_value(store.as_ref(), "seq_orders"), 7);
    assert_eq!(allocator.next().unwrap(), 8);
}

#[test]
fn test_failed_seed_drops_table() {
    let store: Arc<dyn Store> = Arc::new(SeedFailingStore {
        inner: SqliteStore::open_in_memory().unwrap(),
    });
    let allocator = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();

    match allocator.reset(5, false) {
        Err(AtlasError::Store(message)) => assert_eq!(message, "disk I/O error"),
        other => panic!("Expected store error, got {:?}", other),
    }

    assert!(!store.table_exists("seq_orders").unwrap());
    assert_eq!(allocator.current(), 0);

    // Forced reset cleans up the same way
    assert!(allocator.reset(5, true).is_err());
    assert!(!store.table_exists("seq_orders").unwrap());
}

// =============================================================================
// Allocation Tests
// =============================================================================

#[test]
fn test_next_is_strictly_increasing_across_refills() {
    let store = memory_store();
    let allocator = SegmentAllocator::new(store, key("orders"), 3).unwrap();
    allocator.reset(0, false).unwrap();

    let ids: Vec<i64> = (0..10).map(|_| allocator.next().unwrap()).collect();

    assert_eq!(ids, (1..=10).collect::<Vec<_>>());
    assert_eq!(allocator.current(), 10);
}

#[test]
fn test_one_transaction_per_batch() {
    let store = Arc::new(CountingStore::new());
    let allocator = SegmentAllocator::new(store.clone(), key("orders"), 10).unwrap();
    allocator.reset(0, false).unwrap();

    assert_eq!(allocator.next().unwrap(), 1);
    assert_eq!(store.transactions(), 1);
    assert_eq!(stored_value(store.as_ref(), "seq_orders"), 10);

    for expected in 2..=10 {
        assert_eq!(allocator.next().unwrap(), expected);
    }
    assert_eq!(store.transactions(), 1);

    assert_eq!(allocator.next().unwrap(), 11);
    assert_eq!(store.transactions(), 2);
    assert_eq!(stored_value(store.as_ref(), "seq_orders"), 20);
}

#[test]
fn test_concurrent_callers_never_share_an_id() {
    let store = memory_store();
    let allocator = Arc::new(SegmentAllocator::new(store, key("orders"), 7).unwrap());
    allocator.reset(1, false).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let allocator = Arc::clone(&allocator);
            thread::spawn(move || {
                let ids: Vec<i64> = (0..250).map(|_| allocator.next().unwrap()).collect();
                assert!(ids.windows(2).all(|w| w[0] < w[1]));
                ids
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(seen.insert(id), "id {} issued twice", id);
        }
    }
    assert_eq!(seen.len(), 2000);
    assert!(seen.iter().all(|id| *id > 1));
}

#[test]
fn test_two_allocators_on_one_sequence_are_disjoint() {
    // Two processes attached to the same counter row
    let store = memory_store();
    let a = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    let b = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    a.reset(0, false).unwrap();
    b.reset(0, false).unwrap();

    let mut seen = HashSet::new();
    for _ in 0..35 {
        assert!(seen.insert(a.next().unwrap()));
        assert!(seen.insert(b.next().unwrap()));
    }
}

#[test]
fn test_missing_row_is_key_not_found() {
    let store = memory_store();
    store
        .execute("CREATE TABLE seq_orders (id BIGINT NOT NULL PRIMARY KEY)", &[])
        .unwrap();
    let allocator = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();

    match allocator.next() {
        Err(AtlasError::KeyNotFound(k)) => assert_eq!(k, "orders"),
        other => panic!("Expected KeyNotFound, got {:?}", other),
    }

    // Nothing was created
    let rows = store.query("SELECT id FROM seq_orders", &[]).unwrap();
    assert!(rows.is_empty());
}

#[test]
fn test_missing_table_is_store_error() {
    let store = memory_store();
    let allocator = SegmentAllocator::new(store, key("orders"), 10).unwrap();

    assert!(matches!(allocator.next(), Err(AtlasError::Store(_))));
}

#[test]
fn test_exhausted_sequence() {
    let store = memory_store();
    let allocator = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    allocator.reset(i64::MAX - 5, false).unwrap();

    assert!(matches!(
        allocator.next(),
        Err(AtlasError::SequenceExhausted(_))
    ));
    assert_eq!(stored_value(store.as_ref(), "seq_orders"), i64::MAX - 5);
}

// =============================================================================
// Load / Drop Tests
// =============================================================================

#[test]
fn test_load_adopts_stored_value() {
    let store = memory_store();
    let writer = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    writer.reset(40, false).unwrap();
    writer.next().unwrap(); // stored counter is now 50

    let reader = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    assert_eq!(reader.load().unwrap(), 50);
    assert_eq!(reader.current(), 50);
    assert_eq!(reader.next().unwrap(), 51);
}

#[test]
fn test_load_without_row() {
    let store = memory_store();
    store
        .execute("CREATE TABLE seq_orders (id BIGINT NOT NULL PRIMARY KEY)", &[])
        .unwrap();
    let allocator = SegmentAllocator::new(store, key("orders"), 10).unwrap();

    assert!(matches!(allocator.load(), Err(AtlasError::KeyNotFound(_))));
}

#[test]
fn test_drop_table() {
    let store = memory_store();
    let allocator = SegmentAllocator::new(Arc::clone(&store), key("orders"), 10).unwrap();
    allocator.reset(0, false).unwrap();
    allocator.next().unwrap();

    allocator.drop_table().unwrap();

    assert!(!store.table_exists("seq_orders").unwrap());
    assert_eq!(allocator.current(), 0);
    assert!(allocator.next().is_err());

    // Dropping again is not an error
    allocator.drop_table().unwrap();
}
