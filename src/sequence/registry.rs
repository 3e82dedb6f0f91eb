//! Key registry
//!
//! Process-local map of live allocators plus the durable catalog of known
//! keys used to rehydrate them after a restart.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{SegmentAllocator, SequenceKey};
use crate::error::{AtlasError, Result};
use crate::store::{SqlValue, Store};

/// Table recording every known key
pub const CATALOG_TABLE: &str = "atlasid_catalog";

/// Outcome of [`KeyRegistry::rehydrate`]
#[derive(Debug, Default)]
pub struct RehydrateReport {
    /// Keys with a live allocator after rehydration
    pub restored: Vec<SequenceKey>,

    /// Catalogued keys whose counter table no longer exists
    pub missing: Vec<String>,

    /// Catalogued keys that could not be restored; they stay in the catalog
    pub failed: Vec<(String, AtlasError)>,
}

/// Owner of every live [`SegmentAllocator`] in the process
pub struct KeyRegistry {
    store: Arc<dyn Store>,

    /// Batch size for allocators created without an explicit one
    default_batch: i64,

    /// Guards membership only; never held across store I/O
    allocators: Mutex<HashMap<SequenceKey, Arc<SegmentAllocator>>>,
}

impl KeyRegistry {
    /// Create an empty registry
    ///
    /// The catalog table is not created here. Call [`rehydrate`](Self::rehydrate)
    /// or [`ensure_catalog`](Self::ensure_catalog) before serving SET, which
    /// fails while the catalog is missing.
    pub fn new(store: Arc<dyn Store>, default_batch: i64) -> Self {
        Self {
            store,
            default_batch,
            allocators: Mutex::new(HashMap::new()),
        }
    }

    /// Live allocator for `key`, if any
    pub fn lookup(&self, key: &SequenceKey) -> Option<Arc<SegmentAllocator>> {
        self.allocators.lock().get(key).cloned()
    }

    /// Live allocator for `key`, creating an unseeded one if absent
    pub fn get_or_create(&self, key: &SequenceKey, batch: i64) -> Result<Arc<SegmentAllocator>> {
        self.register(key, batch).map(|(allocator, _)| allocator)
    }

    /// Like [`get_or_create`](Self::get_or_create), also reporting whether
    /// this call inserted the allocator
    pub fn register(
        &self,
        key: &SequenceKey,
        batch: i64,
    ) -> Result<(Arc<SegmentAllocator>, bool)> {
        let mut allocators = self.allocators.lock();
        if let Some(existing) = allocators.get(key) {
            return Ok((Arc::clone(existing), false));
        }
        let allocator = Arc::new(SegmentAllocator::new(
            Arc::clone(&self.store),
            key.clone(),
            batch,
        )?);
        allocators.insert(key.clone(), Arc::clone(&allocator));
        tracing::debug!("Registered allocator for {} (batch {})", key, batch);
        Ok((allocator, true))
    }

    /// Remove the allocator for `key` without touching the store
    pub fn forget(&self, key: &SequenceKey) -> Option<Arc<SegmentAllocator>> {
        self.allocators.lock().remove(key)
    }

    /// Remove `allocator` if it is still the one registered for its key
    pub fn forget_if_current(&self, allocator: &Arc<SegmentAllocator>) -> bool {
        let mut allocators = self.allocators.lock();
        match allocators.get(allocator.key()) {
            Some(existing) if Arc::ptr_eq(existing, allocator) => {
                allocators.remove(allocator.key());
                true
            }
            _ => false,
        }
    }

    /// Whether the counter table for `key` exists in the store
    pub fn counter_exists(&self, key: &SequenceKey) -> Result<bool> {
        self.store.table_exists(&key.counter_table())
    }

    /// Create the catalog table if it does not exist yet
    pub fn ensure_catalog(&self) -> Result<()> {
        self.store.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} (k VARCHAR(255) NOT NULL PRIMARY KEY)",
                CATALOG_TABLE
            ),
            &[],
        )?;
        Ok(())
    }

    /// Restore an allocator for every catalogued key with a counter table
    ///
    /// Failing to read the catalog is returned as an error. A key that cannot
    /// be restored is reported and skipped but left in the catalog, so a
    /// later GET can still discover its counter table.
    pub fn rehydrate(&self) -> Result<RehydrateReport> {
        self.ensure_catalog()?;
        let rows = self
            .store
            .query(&format!("SELECT k FROM {} ORDER BY k", CATALOG_TABLE), &[])?;

        let mut report = RehydrateReport::default();
        for row in rows {
            let raw = match row.first().map(SqlValue::as_str).transpose()? {
                Some(raw) if !raw.is_empty() => raw.to_string(),
                _ => continue,
            };
            match self.restore(&raw) {
                Ok(Some(key)) => report.restored.push(key),
                Ok(None) => {
                    tracing::debug!("Catalogued key {} has no counter table", raw);
                    report.missing.push(raw);
                }
                Err(e) => {
                    tracing::warn!("Failed to restore key {}: {}", raw, e);
                    report.failed.push((raw, e));
                }
            }
        }

        tracing::info!(
            "Rehydrated {} keys ({} missing, {} failed)",
            report.restored.len(),
            report.missing.len(),
            report.failed.len()
        );
        Ok(report)
    }

    fn restore(&self, raw: &str) -> Result<Option<SequenceKey>> {
        let key = SequenceKey::try_from(raw)?;
        if !self.counter_exists(&key)? {
            return Ok(None);
        }
        self.get_or_create(&key, self.default_batch)?;
        Ok(Some(key))
    }

    /// Whether `key` is recorded in the catalog
    pub fn catalog_has(&self, key: &SequenceKey) -> Result<bool> {
        let rows = self.store.query(
            &format!("SELECT k FROM {} WHERE k = ?1", CATALOG_TABLE),
            &[SqlValue::from(key.as_str())],
        )?;
        Ok(!rows.is_empty())
    }

    /// Record `key` in the catalog; a no-op if it is already there
    pub fn catalog_add(&self, key: &SequenceKey) -> Result<()> {
        let mut tx = self.store.begin()?;
        let present = tx.query(
            &format!("SELECT k FROM {} WHERE k = ?1", CATALOG_TABLE),
            &[SqlValue::from(key.as_str())],
        )?;
        if present.is_empty() {
            tx.execute(
                &format!("INSERT INTO {} (k) VALUES (?1)", CATALOG_TABLE),
                &[SqlValue::from(key.as_str())],
            )?;
        }
        tx.commit()
    }

    /// Remove `key` from the catalog; a no-op if it is absent
    pub fn catalog_remove(&self, key: &SequenceKey) -> Result<()> {
        self.store.execute(
            &format!("DELETE FROM {} WHERE k = ?1", CATALOG_TABLE),
            &[SqlValue::from(key.as_str())],
        )?;
        Ok(())
    }

    /// Keys with a live allocator, sorted
    pub fn keys(&self) -> Vec<SequenceKey> {
        let mut keys: Vec<_> = self.allocators.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.allocators.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn default_batch(&self) -> i64 {
        self.default_batch
    }
}
