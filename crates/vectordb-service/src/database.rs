//! Database: the set of collections sharing one RocksDB instance.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{info, warn};

use vectordb_index::WorkerPool;
use vectordb_storage::{Storage, StorageStats};
use vectordb_types::Settings;

use crate::collection::{Collection, CollectionInfo};
use crate::config::{validate_name, CollectionConfig};
use crate::error::ServiceError;

/// Runtime knobs for an opened database
#[derive(Debug, Clone, Copy)]
pub struct DatabaseOptions {
    /// Threads used by batch inserts and batch searches
    pub workers: usize,
    /// Beam width for searches that do not set one
    pub default_ef: usize,
}

impl Default for DatabaseOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for DatabaseOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            workers: settings.batch_workers,
            default_ef: settings.default_ef,
        }
    }
}

/// Database-wide summary
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseInfo {
    pub collections: Vec<String>,
}

pub struct Database {
    storage: Arc<Storage>,
    collections: RwLock<HashMap<String, Arc<Collection>>>,
    pool: WorkerPool,
    default_ef: usize,
}

impl Database {
    /// Open the database at `path` and rebuild every collection's index.
    ///
    /// A collection whose stored definition or log cannot be loaded is
    /// skipped with a warning; its data stays on disk.
    pub fn open(path: &Path, options: DatabaseOptions) -> Result<Self, ServiceError> {
        let storage = Arc::new(Storage::open(path)?);
        let pool = WorkerPool::new(options.workers);

        let mut collections = HashMap::new();
        for (name, bytes) in storage.list_collections()? {
            let config: CollectionConfig = match serde_json::from_slice(&bytes) {
                Ok(config) => config,
                Err(e) => {
                    warn!(collection = %name, error = %e, "Skipping unreadable collection definition");
                    continue;
                }
            };
            let collection = match Collection::new(
                name.clone(),
                config,
                Arc::clone(&storage),
                pool,
                options.default_ef,
            ) {
                Ok(collection) => collection,
                Err(e) => {
                    warn!(collection = %name, error = %e, "Skipping collection with invalid index");
                    continue;
                }
            };
            if let Err(e) = collection.replay() {
                warn!(collection = %name, error = %e, "Skipping collection whose log cannot be replayed");
                continue;
            }
            collections.insert(name, Arc::new(collection));
        }

        info!(path = ?path, collections = collections.len(), "Database opened");

        Ok(Self {
            storage,
            collections: RwLock::new(collections),
            pool,
            default_ef: options.default_ef,
        })
    }

    /// Create a new, empty collection.
    pub fn create_collection(
        &self,
        name: &str,
        config: CollectionConfig,
    ) -> Result<Arc<Collection>, ServiceError> {
        validate_name(name)?;
        config.validate()?;

        let mut collections = self.collections.write();
        if collections.contains_key(name) || self.storage.get_collection(name)?.is_some() {
            return Err(ServiceError::CollectionExists(name.to_string()));
        }

        let bytes = serde_json::to_vec(&config)?;
        let collection = Arc::new(Collection::new(
            name.to_string(),
            config,
            Arc::clone(&self.storage),
            self.pool,
            self.default_ef,
        )?);
        self.storage.put_collection(name, &bytes)?;
        collections.insert(name.to_string(), Arc::clone(&collection));

        info!(collection = %name, index = %collection.config().index.kind(), "Created collection");
        Ok(collection)
    }

    /// Drop a collection with all of its objects and log.
    ///
    /// Handles already held by callers stay usable for reads of the
    /// in-memory index but no longer see stored objects.
    pub fn delete_collection(&self, name: &str) -> Result<(), ServiceError> {
        let mut collections = self.collections.write();
        if !collections.contains_key(name) {
            return Err(ServiceError::CollectionNotFound(name.to_string()));
        }

        self.storage.delete_collection_data(name)?;
        collections.remove(name);

        info!(collection = %name, "Deleted collection");
        Ok(())
    }

    pub fn collection(&self, name: &str) -> Result<Arc<Collection>, ServiceError> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ServiceError::CollectionNotFound(name.to_string()))
    }

    /// Names of all collections, sorted.
    pub fn info(&self) -> DatabaseInfo {
        let mut collections: Vec<String> = self.collections.read().keys().cloned().collect();
        collections.sort();
        DatabaseInfo { collections }
    }

    pub fn collection_info(&self, name: &str) -> Result<CollectionInfo, ServiceError> {
        self.collection(name)?.info()
    }

    pub fn storage_stats(&self) -> Result<StorageStats, ServiceError> {
        Ok(self.storage.get_stats()?)
    }

    pub fn compact(&self) -> Result<(), ServiceError> {
        Ok(self.storage.compact()?)
    }

    /// Flush memtables to disk.
    pub fn flush(&self) -> Result<(), ServiceError> {
        Ok(self.storage.flush()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;
    use vectordb_index::{Distance, FlatParams, HnswParams, IndexError, IndexSpec, SearchParams};
    use vectordb_types::{Metadata, ObjectRecord};

    fn open(dir: &TempDir) -> Database {
        Database::open(
            dir.path(),
            DatabaseOptions {
                workers: 4,
                default_ef: 64,
            },
        )
        .unwrap()
    }

    fn hnsw_config(dimension: usize) -> CollectionConfig {
        CollectionConfig::new(
            dimension,
            Distance::Euclidean,
            IndexSpec::Hnsw(HnswParams::new(1000).with_m(8)),
        )
        .with_mapping(["title"])
    }

    fn object(title: &str, vector: Vec<f32>) -> ObjectRecord {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), json!(title));
        ObjectRecord::new(metadata, vector)
    }

    #[test]
    fn test_create_and_lookup_collection() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);

        db.create_collection("docs", hnsw_config(2)).unwrap();
        assert_eq!(db.collection("docs").unwrap().name(), "docs");
        assert_eq!(db.info().collections, vec!["docs".to_string()]);

        assert!(matches!(
            db.create_collection("docs", hnsw_config(2)),
            Err(ServiceError::CollectionExists(_))
        ));
        assert!(matches!(
            db.create_collection("bad name", hnsw_config(2)),
            Err(ServiceError::InvalidName(_))
        ));
        assert!(matches!(
            db.create_collection("zero", hnsw_config(0)),
            Err(ServiceError::InvalidConfig(_))
        ));
        assert!(matches!(
            db.collection("missing"),
            Err(ServiceError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_object_lifecycle() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let docs = db.create_collection("docs", hnsw_config(2)).unwrap();

        let a = docs.insert_object(object("a", vec![0.0, 0.0])).unwrap();
        let b = docs.insert_object(object("b", vec![10.0, 10.0])).unwrap();

        let hits = docs.search(&[1.0, 1.0], 1, &SearchParams::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a);
        assert_eq!(hits[0].metadata["title"], json!("a"));

        docs.update_object(&a, object("a2", vec![20.0, 20.0])).unwrap();
        let hits = docs.search(&[1.0, 1.0], 1, &SearchParams::default()).unwrap();
        assert_eq!(hits[0].id, b);
        assert_eq!(docs.get_object(&a).unwrap().metadata["title"], json!("a2"));

        docs.delete_object(&b).unwrap();
        assert!(matches!(docs.get_object(&b), Err(ServiceError::ObjectNotFound(_))));
        assert!(matches!(docs.delete_object(&b), Err(ServiceError::ObjectNotFound(_))));
        assert!(matches!(
            docs.update_object(&b, object("b", vec![1.0, 1.0])),
            Err(ServiceError::ObjectNotFound(_))
        ));

        let hits = docs.search(&[1.0, 1.0], 10, &SearchParams::default()).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, a);
    }

    #[test]
    fn test_object_validation() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let docs = db.create_collection("docs", hnsw_config(2)).unwrap();

        assert!(matches!(
            docs.insert_object(object("a", vec![1.0])),
            Err(ServiceError::Index(IndexError::InvalidVector { expected: 2, actual: 1 }))
        ));
        assert!(matches!(
            docs.insert_object(ObjectRecord::new(Metadata::new(), vec![1.0, 2.0])),
            Err(ServiceError::InvalidMetadata(_))
        ));
        assert!(matches!(
            docs.search(&[1.0, 2.0], 1, &SearchParams::with_ef(0)),
            Err(ServiceError::Index(IndexError::InvalidParam(_)))
        ));
        assert_eq!(docs.info().unwrap().object_count, 0);
    }

    #[test]
    fn test_rejected_insert_is_reverted() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let config = CollectionConfig::new(1, Distance::Dot, IndexSpec::Flat(FlatParams::new(1)));
        let tiny = db.create_collection("tiny", config).unwrap();

        tiny.insert_object(ObjectRecord::new(Metadata::new(), vec![1.0]))
            .unwrap();
        assert!(matches!(
            tiny.insert_object(ObjectRecord::new(Metadata::new(), vec![2.0])),
            Err(ServiceError::Index(IndexError::IndexFull { max_size: 1 }))
        ));

        let info = tiny.info().unwrap();
        assert_eq!(info.object_count, 1);
        assert_eq!(info.index.vector_count, 1);
        assert_eq!(db.storage_stats().unwrap().wal_entry_count, 1);
    }

    #[test]
    fn test_reopen_replays_log() {
        let dir = TempDir::new().unwrap();
        let (kept, deleted, updated) = {
            let db = open(&dir);
            let docs = db.create_collection("docs", hnsw_config(2)).unwrap();
            let kept = docs.insert_object(object("kept", vec![1.0, 1.0])).unwrap();
            let deleted = docs.insert_object(object("deleted", vec![2.0, 2.0])).unwrap();
            let updated = docs.insert_object(object("updated", vec![3.0, 3.0])).unwrap();
            docs.delete_object(&deleted).unwrap();
            docs.update_object(&updated, object("updated", vec![50.0, 50.0]))
                .unwrap();
            db.flush().unwrap();
            (kept, deleted, updated)
        };

        let db = open(&dir);
        let docs = db.collection("docs").unwrap();
        let info = docs.info().unwrap();
        assert_eq!(info.object_count, 2);
        assert_eq!(info.index.vector_count, 2);

        let hits = docs.search(&[2.0, 2.0], 10, &SearchParams::default()).unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, vec![kept.as_str(), updated.as_str()]);
        assert!(!ids.contains(&deleted.as_str()));
    }

    #[test]
    fn test_delete_collection() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let docs = db.create_collection("docs", hnsw_config(2)).unwrap();
        docs.insert_object(object("a", vec![0.0, 1.0])).unwrap();
        drop(docs);

        db.delete_collection("docs").unwrap();
        assert!(db.info().collections.is_empty());
        assert!(matches!(
            db.delete_collection("docs"),
            Err(ServiceError::CollectionNotFound(_))
        ));

        // the name is free again, and nothing comes back from the old data
        let docs = db.create_collection("docs", hnsw_config(2)).unwrap();
        assert_eq!(docs.info().unwrap().object_count, 0);
        // collection handles share the storage and must go before reopening
        drop(docs);
        drop(db);

        let db = open(&dir);
        assert_eq!(db.collection_info("docs").unwrap().index.vector_count, 0);
    }

    #[test]
    fn test_batch_insert_and_search() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let docs = db.create_collection("grid", hnsw_config(2)).unwrap();

        let objects: Vec<ObjectRecord> = (0..200)
            .map(|i| object(&format!("p{i}"), vec![(i % 20) as f32, (i / 20) as f32]))
            .collect();
        let ids = docs.insert_objects(objects).unwrap();
        assert_eq!(ids.len(), 200);

        let queries = vec![vec![0.0, 0.0], vec![19.0, 9.0], vec![5.0, 5.0]];
        let results = docs
            .search_many(queries, 1, &SearchParams::default())
            .unwrap();
        let titles: Vec<_> = results
            .iter()
            .map(|hits| hits[0].metadata["title"].clone())
            .collect();
        assert_eq!(titles, vec![json!("p0"), json!("p199"), json!("p105")]);

        let page = docs.get_objects(190, 50).unwrap();
        assert_eq!(page.len(), 10);
    }

    #[test]
    fn test_batch_insert_reports_first_error() {
        let dir = TempDir::new().unwrap();
        let db = open(&dir);
        let docs = db.create_collection("docs", hnsw_config(2)).unwrap();

        let objects = vec![
            object("ok", vec![1.0, 1.0]),
            object("short", vec![1.0]),
            object("ok2", vec![2.0, 2.0]),
        ];
        assert!(matches!(
            docs.insert_objects(objects),
            Err(ServiceError::Index(IndexError::InvalidVector { .. }))
        ));
        assert_eq!(docs.info().unwrap().object_count, 2);
    }

    #[test]
    fn test_default_options_follow_settings() {
        let options = DatabaseOptions::default();
        let settings = Settings::default();
        assert_eq!(options.workers, settings.batch_workers);
        assert_eq!(options.default_ef, settings.default_ef);
    }

    #[test]
    fn test_unreplayable_collection_is_skipped() {
        let dir = TempDir::new().unwrap();
        let kept = {
            let db = open(&dir);
            let good = db.create_collection("good", hnsw_config(2)).unwrap();
            let broken = db.create_collection("broken", hnsw_config(2)).unwrap();
            broken.insert_object(object("b", vec![1.0, 1.0])).unwrap();
            let id = good.insert_object(object("g", vec![2.0, 2.0])).unwrap();
            id
        };

        // a log value that no longer decodes
        {
            let opts = rocksdb::Options::default();
            let names = rocksdb::DB::list_cf(&opts, dir.path()).unwrap();
            let raw = rocksdb::DB::open_cf(&opts, dir.path(), names).unwrap();
            let wal = raw.cf_handle("wal").unwrap();
            raw.put_cf(wal, b"wal:broken:00000000000000000002", b"{not json")
                .unwrap();
        }

        let db = open(&dir);
        assert_eq!(db.info().collections, vec!["good".to_string()]);
        assert!(matches!(
            db.collection("broken"),
            Err(ServiceError::CollectionNotFound(_))
        ));

        let good = db.collection("good").unwrap();
        let hits = good.search(&[2.0, 2.0], 1, &SearchParams::default()).unwrap();
        assert_eq!(hits[0].id, kept);
    }
}
