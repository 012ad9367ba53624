//! A single durable collection.
//!
//! Every write goes to RocksDB first (object plus log entry in one batch)
//! and is then applied to the in-memory index. If the index refuses the
//! write, the batch is reverted so storage never holds an object the index
//! does not know about.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};
use ulid::Ulid;

use vectordb_index::{
    validate_vector, IndexStats, Indexer, SearchParams, VectorIndex, WorkerPool,
};
use vectordb_storage::Storage;
use vectordb_types::{ObjectInfo, ObjectRecord, SearchHit, WalEntry, WalOp};

use crate::config::CollectionConfig;
use crate::error::ServiceError;

/// Summary of a collection
#[derive(Debug, Clone, Serialize)]
pub struct CollectionInfo {
    pub name: String,
    pub config: CollectionConfig,
    pub object_count: u64,
    pub index: IndexStats,
}

/// Handle to one collection: its config, index and backing storage.
pub struct Collection {
    name: String,
    config: CollectionConfig,
    index: VectorIndex,
    storage: Arc<Storage>,
    /// Serializes single-object writes; searches never take it
    write_lock: Mutex<()>,
    pool: WorkerPool,
    default_ef: usize,
}

impl Collection {
    pub(crate) fn new(
        name: String,
        config: CollectionConfig,
        storage: Arc<Storage>,
        pool: WorkerPool,
        default_ef: usize,
    ) -> Result<Self, ServiceError> {
        let index = VectorIndex::new(&config.index, config.distance)?;
        Ok(Self {
            name,
            config,
            index,
            storage,
            write_lock: Mutex::new(()),
            pool,
            default_ef,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Insert an object under a freshly generated id.
    pub fn insert_object(&self, object: ObjectRecord) -> Result<String, ServiceError> {
        self.validate(&object)?;
        let _guard = self.write_lock.lock();
        self.insert_validated(object)
    }

    /// Insert many objects on the worker pool.
    ///
    /// Every object is attempted; the first error (in input order) is
    /// returned and objects that succeeded stay inserted.
    pub fn insert_objects(&self, objects: Vec<ObjectRecord>) -> Result<Vec<String>, ServiceError> {
        let total = objects.len();
        let results = self.pool.run(objects, |object| {
            self.validate(&object)?;
            self.insert_validated(object)
        });

        let ids = results.into_iter().collect::<Result<Vec<_>, _>>()?;
        info!(collection = %self.name, count = total, "Inserted object batch");
        Ok(ids)
    }

    fn insert_validated(&self, object: ObjectRecord) -> Result<String, ServiceError> {
        let id = Ulid::new().to_string();
        let entry = WalEntry::insert(&id, object.vector.clone());
        let sequence = self.storage.log_put_object(&self.name, &id, &entry, &object)?;

        if let Err(e) = self.index.insert(&id, object.vector) {
            self.storage
                .revert_logged_write(&self.name, sequence, &id, None)?;
            return Err(e.into());
        }

        debug!(collection = %self.name, id = %id, seq = sequence, "Inserted object");
        Ok(id)
    }

    /// Fetch one object.
    pub fn get_object(&self, id: &str) -> Result<ObjectInfo, ServiceError> {
        self.storage
            .get_object(&self.name, id)?
            .map(|record| record.into_info(id))
            .ok_or_else(|| ServiceError::ObjectNotFound(id.to_string()))
    }

    /// Page through objects in id order.
    pub fn get_objects(&self, offset: usize, limit: usize) -> Result<Vec<ObjectInfo>, ServiceError> {
        Ok(self
            .storage
            .scan_objects(&self.name, offset, limit)?
            .into_iter()
            .map(|(id, record)| record.into_info(id))
            .collect())
    }

    /// Replace an existing object's metadata and vector.
    pub fn update_object(&self, id: &str, object: ObjectRecord) -> Result<(), ServiceError> {
        self.validate(&object)?;
        let _guard = self.write_lock.lock();

        let previous = self
            .storage
            .get_object(&self.name, id)?
            .ok_or_else(|| ServiceError::ObjectNotFound(id.to_string()))?;

        let entry = WalEntry::update(id, object.vector.clone());
        let sequence = self.storage.log_put_object(&self.name, id, &entry, &object)?;

        if let Err(e) = self.index.update(id, object.vector) {
            self.storage
                .revert_logged_write(&self.name, sequence, id, Some(&previous))?;
            return Err(e.into());
        }

        debug!(collection = %self.name, id = %id, seq = sequence, "Updated object");
        Ok(())
    }

    /// Remove an object.
    pub fn delete_object(&self, id: &str) -> Result<(), ServiceError> {
        let _guard = self.write_lock.lock();

        if self.storage.get_object(&self.name, id)?.is_none() {
            return Err(ServiceError::ObjectNotFound(id.to_string()));
        }

        let sequence = self
            .storage
            .log_delete_object(&self.name, id, &WalEntry::delete(id))?;

        if let Err(e) = self.index.delete(id) {
            warn!(collection = %self.name, id = %id, error = %e, "Deleted object was not indexed");
        }

        debug!(collection = %self.name, id = %id, seq = sequence, "Deleted object");
        Ok(())
    }

    /// Nearest objects to `vector`, best first.
    ///
    /// Without an explicit `ef` the database default applies.
    pub fn search(
        &self,
        vector: &[f32],
        topk: usize,
        params: &SearchParams,
    ) -> Result<Vec<SearchHit>, ServiceError> {
        validate_vector(self.config.dimension, vector)?;

        let params = SearchParams {
            ef: Some(params.effective_ef(self.default_ef)?),
        };
        let results = self.index.search(vector, topk, &params)?;

        let mut hits = Vec::with_capacity(results.len());
        for result in results {
            match self.storage.get_object(&self.name, &result.id)? {
                Some(record) => hits.push(SearchHit::from_info(
                    record.into_info(result.id),
                    result.score,
                )),
                None => {
                    debug!(collection = %self.name, id = %result.id, "Search hit vanished before fetch")
                }
            }
        }
        Ok(hits)
    }

    /// Run several searches on the worker pool; results keep query order.
    pub fn search_many(
        &self,
        queries: Vec<Vec<f32>>,
        topk: usize,
        params: &SearchParams,
    ) -> Result<Vec<Vec<SearchHit>>, ServiceError> {
        self.pool
            .run(queries, |query| self.search(&query, topk, params))
            .into_iter()
            .collect()
    }

    pub fn info(&self) -> Result<CollectionInfo, ServiceError> {
        Ok(CollectionInfo {
            name: self.name.clone(),
            config: self.config.clone(),
            object_count: self.storage.count_objects(&self.name)?,
            index: self.index.stats(),
        })
    }

    /// Rebuild the index from the write-ahead log.
    ///
    /// Entries the index rejects are logged and skipped. Returns the number
    /// of entries applied.
    pub(crate) fn replay(&self) -> Result<usize, ServiceError> {
        let entries = self.storage.scan_wal(&self.name)?;
        let total = entries.len();
        let mut applied = 0usize;

        for (sequence, entry) in entries {
            let result = match entry.op {
                WalOp::Insert => self.index.insert(&entry.id, entry.vector),
                WalOp::Update if self.index.contains(&entry.id) => {
                    self.index.update(&entry.id, entry.vector)
                }
                WalOp::Update => self.index.insert(&entry.id, entry.vector),
                WalOp::Delete => self.index.delete(&entry.id),
            };
            match result {
                Ok(()) => applied += 1,
                Err(e) => warn!(
                    collection = %self.name,
                    seq = sequence,
                    id = %entry.id,
                    op = %entry.op,
                    error = %e,
                    "Skipping log entry during replay"
                ),
            }
        }

        info!(collection = %self.name, replayed = applied, skipped = total - applied, "Replayed write-ahead log");
        Ok(applied)
    }

    fn validate(&self, object: &ObjectRecord) -> Result<(), ServiceError> {
        validate_vector(self.config.dimension, &object.vector)?;
        self.config.check_metadata(&object.metadata)
    }
}
