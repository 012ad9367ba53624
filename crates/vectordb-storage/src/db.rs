//! RocksDB wrapper for vectordb storage.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Atomic write batches (object + log entry in one write)
//! - Per-collection log sequences that survive restarts
//! - Prefix scans over one collection's objects and log

use dashmap::DashMap;
use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

use crate::column_families::{build_cf_descriptors, ALL_CF_NAMES, CF_COLLECTIONS, CF_OBJECTS, CF_WAL};
use crate::error::StorageError;
use crate::keys::{ObjectKey, WalKey};
use vectordb_types::{ObjectRecord, WalEntry};

/// Main storage interface for vectordb
pub struct Storage {
    db: DB,
    /// Next log sequence per collection, loaded lazily from disk
    wal_sequences: DashMap<String, u64>,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        // Limit memory usage during compaction
        db_opts.set_max_background_jobs(4);

        let cf_descriptors = build_cf_descriptors();
        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        Ok(Self {
            db,
            wal_sequences: DashMap::new(),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    // ==================== Collection Methods ====================

    /// Store a collection definition
    pub fn put_collection(&self, name: &str, config_bytes: &[u8]) -> Result<(), StorageError> {
        let cf = self.cf(CF_COLLECTIONS)?;
        self.db.put_cf(cf, name.as_bytes(), config_bytes)?;
        debug!(collection = %name, "Stored collection definition");
        Ok(())
    }

    /// Get a collection definition by name
    pub fn get_collection(&self, name: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let cf = self.cf(CF_COLLECTIONS)?;
        Ok(self.db.get_cf(cf, name.as_bytes())?)
    }

    /// All collection definitions, ordered by name
    pub fn list_collections(&self) -> Result<Vec<(String, Vec<u8>)>, StorageError> {
        let cf = self.cf(CF_COLLECTIONS)?;
        let mut results = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (key, value) = item?;
            let name = String::from_utf8(key.to_vec())
                .map_err(|e| StorageError::Key(format!("Invalid collection name: {}", e)))?;
            results.push((name, value.to_vec()));
        }
        Ok(results)
    }

    /// Remove a collection's definition, objects and log in one write.
    pub fn delete_collection_data(&self, name: &str) -> Result<(), StorageError> {
        let collections_cf = self.cf(CF_COLLECTIONS)?;
        let objects_cf = self.cf(CF_OBJECTS)?;
        let wal_cf = self.cf(CF_WAL)?;

        if self.db.get_cf(collections_cf, name.as_bytes())?.is_none() {
            return Err(StorageError::NotFound(format!("collection {}", name)));
        }

        let object_prefix = ObjectKey::prefix(name);
        let object_end = prefix_end(&object_prefix);
        let wal_prefix = WalKey::prefix(name);
        let wal_end = prefix_end(&wal_prefix);

        let mut batch = WriteBatch::default();
        batch.delete_cf(collections_cf, name.as_bytes());
        batch.delete_range_cf(objects_cf, &object_prefix, &object_end);
        batch.delete_range_cf(wal_cf, &wal_prefix, &wal_end);
        self.db.write(batch)?;

        self.wal_sequences.remove(name);
        info!(collection = %name, "Deleted collection data");
        Ok(())
    }

    // ==================== Logged Object Writes ====================

    /// Highest log sequence written for `collection`, if any
    pub fn last_wal_sequence(&self, collection: &str) -> Result<Option<u64>, StorageError> {
        let cf = self.cf(CF_WAL)?;
        let prefix = WalKey::prefix(collection);
        let upper = prefix_end(&prefix);

        // Seek to the last key below the collection's range end
        let mut iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&upper, Direction::Reverse));
        if let Some(item) = iter.next() {
            let (key, _) = item?;
            if key.starts_with(&prefix) {
                return Ok(Some(WalKey::from_bytes(&key)?.sequence));
            }
        }
        Ok(None)
    }

    /// Allocate the next log sequence for `collection`
    fn next_wal_sequence(&self, collection: &str) -> Result<u64, StorageError> {
        let mut next = self
            .wal_sequences
            .entry(collection.to_string())
            .or_try_insert_with(|| {
                self.last_wal_sequence(collection)
                    .map(|last| last.map_or(0, |s| s + 1))
            })?;
        let sequence = *next;
        *next += 1;
        Ok(sequence)
    }

    /// Store an object together with the log entry describing the write.
    ///
    /// Both keys land in one atomic batch. Returns the log sequence.
    pub fn log_put_object(
        &self,
        collection: &str,
        id: &str,
        entry: &WalEntry,
        record: &ObjectRecord,
    ) -> Result<u64, StorageError> {
        let objects_cf = self.cf(CF_OBJECTS)?;
        let wal_cf = self.cf(CF_WAL)?;

        let sequence = self.next_wal_sequence(collection)?;
        let object_key = ObjectKey::new(collection, id);
        let wal_key = WalKey::new(collection, sequence);

        let mut batch = WriteBatch::default();
        batch.put_cf(wal_cf, wal_key.to_bytes(), entry.to_bytes()?);
        batch.put_cf(objects_cf, object_key.to_bytes(), record.to_bytes()?);
        self.db.write(batch)?;

        debug!(collection = %collection, id = %id, seq = sequence, op = %entry.op, "Logged object write");
        Ok(sequence)
    }

    /// Delete an object together with the log entry describing it.
    pub fn log_delete_object(
        &self,
        collection: &str,
        id: &str,
        entry: &WalEntry,
    ) -> Result<u64, StorageError> {
        let objects_cf = self.cf(CF_OBJECTS)?;
        let wal_cf = self.cf(CF_WAL)?;

        let sequence = self.next_wal_sequence(collection)?;
        let object_key = ObjectKey::new(collection, id);
        let wal_key = WalKey::new(collection, sequence);

        let mut batch = WriteBatch::default();
        batch.put_cf(wal_cf, wal_key.to_bytes(), entry.to_bytes()?);
        batch.delete_cf(objects_cf, object_key.to_bytes());
        self.db.write(batch)?;

        debug!(collection = %collection, id = %id, seq = sequence, "Logged object delete");
        Ok(sequence)
    }

    /// Undo a logged write whose index update was refused.
    ///
    /// Drops the log entry and restores `previous` (or removes the object
    /// when there was none) in one batch.
    pub fn revert_logged_write(
        &self,
        collection: &str,
        sequence: u64,
        id: &str,
        previous: Option<&ObjectRecord>,
    ) -> Result<(), StorageError> {
        let objects_cf = self.cf(CF_OBJECTS)?;
        let wal_cf = self.cf(CF_WAL)?;

        let object_key = ObjectKey::new(collection, id);
        let mut batch = WriteBatch::default();
        batch.delete_cf(wal_cf, WalKey::new(collection, sequence).to_bytes());
        match previous {
            Some(record) => batch.put_cf(objects_cf, object_key.to_bytes(), record.to_bytes()?),
            None => batch.delete_cf(objects_cf, object_key.to_bytes()),
        }
        self.db.write(batch)?;

        debug!(collection = %collection, id = %id, seq = sequence, "Reverted logged write");
        Ok(())
    }

    // ==================== Object Reads ====================

    /// Get an object by id
    pub fn get_object(
        &self,
        collection: &str,
        id: &str,
    ) -> Result<Option<ObjectRecord>, StorageError> {
        let cf = self.cf(CF_OBJECTS)?;
        match self.db.get_cf(cf, ObjectKey::new(collection, id).to_bytes())? {
            Some(bytes) => Ok(Some(ObjectRecord::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Page through a collection's objects in id order.
    pub fn scan_objects(
        &self,
        collection: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<(String, ObjectRecord)>, StorageError> {
        let mut results = Vec::new();
        let entries = self.scan_prefix(CF_OBJECTS, &ObjectKey::prefix(collection))?;
        for (key, value) in entries.into_iter().skip(offset).take(limit) {
            let object_key = ObjectKey::from_bytes(&key)?;
            results.push((object_key.id, ObjectRecord::from_bytes(&value)?));
        }
        Ok(results)
    }

    /// Number of objects stored for `collection`
    pub fn count_objects(&self, collection: &str) -> Result<u64, StorageError> {
        let cf = self.cf(CF_OBJECTS)?;
        let prefix = ObjectKey::prefix(collection);
        let mut count = 0u64;
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    // ==================== Log Reads ====================

    /// Every log entry of `collection` in sequence order.
    pub fn scan_wal(&self, collection: &str) -> Result<Vec<(u64, WalEntry)>, StorageError> {
        let mut results = Vec::new();
        for (key, value) in self.scan_prefix(CF_WAL, &WalKey::prefix(collection))? {
            let wal_key = WalKey::from_bytes(&key)?;
            let entry = WalEntry::from_bytes(&value)
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            results.push((wal_key.sequence, entry));
        }
        Ok(results)
    }

    #[allow(clippy::type_complexity)]
    fn scan_prefix(
        &self,
        cf_name: &str,
        prefix: &[u8],
    ) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StorageError> {
        let cf = self.cf(cf_name)?;

        let mut results = Vec::new();
        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));

        for item in iter {
            let (key, value) = item?;
            // Stop if we've passed the prefix
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key.to_vec(), value.to_vec()));
        }

        Ok(results)
    }

    // ===== Admin Operations =====

    /// Flush all column families to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.flush_cf(cf)?;
            }
        }
        Ok(())
    }

    /// Trigger manual compaction on all column families.
    pub fn compact(&self) -> Result<(), StorageError> {
        info!("Starting full compaction...");
        self.db.compact_range::<&[u8], &[u8]>(None, None);

        for cf_name in ALL_CF_NAMES {
            if let Some(cf) = self.db.cf_handle(cf_name) {
                self.db.compact_range_cf::<&[u8], &[u8]>(cf, None, None);
            }
        }
        info!("Compaction complete");
        Ok(())
    }

    /// Trigger compaction on a specific column family.
    pub fn compact_cf(&self, cf_name: &str) -> Result<(), StorageError> {
        let cf = self.cf(cf_name)?;
        info!(cf = %cf_name, "Starting compaction...");
        self.db.compact_range_cf::<&[u8], &[u8]>(cf, None, None);
        info!(cf = %cf_name, "Compaction complete");
        Ok(())
    }

    /// Get database statistics.
    pub fn get_stats(&self) -> Result<StorageStats, StorageError> {
        Ok(StorageStats {
            collection_count: self.count_cf_entries(self.cf(CF_COLLECTIONS)?)?,
            object_count: self.count_cf_entries(self.cf(CF_OBJECTS)?)?,
            wal_entry_count: self.count_cf_entries(self.cf(CF_WAL)?)?,
            disk_usage_bytes: self.get_disk_usage(),
        })
    }

    fn count_cf_entries(&self, cf: &rocksdb::ColumnFamily) -> Result<u64, StorageError> {
        let mut count = 0u64;
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    fn get_disk_usage(&self) -> u64 {
        std::fs::read_dir(self.db.path())
            .map(|entries| {
                entries
                    .flatten()
                    .filter_map(|entry| entry.metadata().ok())
                    .map(|metadata| metadata.len())
                    .sum()
            })
            .unwrap_or(0)
    }
}

/// Smallest key greater than every key starting with `prefix`.
///
/// Prefixes here always end in `:`, so bumping the last byte suffices.
fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    if let Some(last) = end.last_mut() {
        *last = last.saturating_add(1);
    }
    end
}

/// Statistics about the storage.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct StorageStats {
    /// Number of collection definitions
    pub collection_count: u64,
    /// Number of stored objects across all collections
    pub object_count: u64,
    /// Number of log entries across all collections
    pub wal_entry_count: u64,
    /// Total disk usage in bytes
    pub disk_usage_bytes: u64,
}
