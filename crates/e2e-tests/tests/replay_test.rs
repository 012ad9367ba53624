//! Write-ahead log replay tests.
//!
//! Every test writes through one `Database`, closes it, opens the same
//! directory again and checks the rebuilt index against what was written.

use std::collections::HashSet;

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{random_vectors, titled, TestHarness};
use vectordb_index::{Distance, FlatParams, HnswParams, IndexSpec, SearchParams};
use vectordb_service::{CollectionConfig, ServiceError};

fn hnsw_config(dim: usize) -> CollectionConfig {
    CollectionConfig::new(
        dim,
        Distance::Euclidean,
        IndexSpec::Hnsw(HnswParams::new(10_000).with_m(12)),
    )
    .with_mapping(["title"])
}

#[test]
fn test_reopen_rebuilds_index_from_log() {
    let harness = TestHarness::new();
    let data = random_vectors(500, 8, 3);

    let (ids, deleted, updated) = {
        let docs = harness.db.create_collection("docs", hnsw_config(8)).unwrap();
        let objects = data
            .iter()
            .enumerate()
            .map(|(pos, v)| titled(&pos.to_string(), v.clone()))
            .collect();
        let ids = docs.insert_objects(objects).unwrap();

        let deleted: Vec<String> = ids.iter().step_by(10).cloned().collect();
        for id in &deleted {
            docs.delete_object(id).unwrap();
        }

        // far outside the unit cube so the new position is unambiguous
        let updated: Vec<String> = ids.iter().skip(1).step_by(25).cloned().collect();
        for (n, id) in updated.iter().enumerate() {
            let offset = 10.0 + n as f32;
            docs.update_object(id, titled("moved", vec![offset; 8])).unwrap();
        }
        (ids, deleted, updated)
    };

    let harness = harness.reopen();
    let docs = harness.db.collection("docs").unwrap();

    let info = docs.info().unwrap();
    assert_eq!(info.object_count, 450);
    assert_eq!(info.index.vector_count, 450);

    let deleted: HashSet<&String> = deleted.iter().collect();
    let (mut checked, mut found) = (0, 0);
    for (pos, vector) in data.iter().enumerate().take(100) {
        let hits = docs.search(vector, 5, &SearchParams::default()).unwrap();
        assert!(hits.iter().all(|h| !deleted.contains(&h.id)));
        if !deleted.contains(&ids[pos]) && !updated.contains(&ids[pos]) {
            checked += 1;
            if hits[0].id == ids[pos] {
                found += 1;
            }
        }
    }
    assert!(found * 100 >= checked * 95, "self-search found {found}/{checked} after replay");

    for (n, id) in updated.iter().enumerate() {
        let offset = 10.0 + n as f32;
        let hits = docs.search(&[offset; 8], 1, &SearchParams::default()).unwrap();
        assert_eq!(&hits[0].id, id);
        assert_eq!(hits[0].metadata["title"], json!("moved"));
    }
}

#[test]
fn test_writes_after_reopen_continue_the_log() {
    let harness = TestHarness::new();
    let first = {
        let docs = harness
            .db
            .create_collection(
                "flat",
                CollectionConfig::new(2, Distance::Dot, IndexSpec::Flat(FlatParams::new(10))),
            )
            .unwrap();
        docs.insert_object(untitled(vec![1.0, 0.0])).unwrap()
    };

    let harness = harness.reopen();
    let docs = harness.db.collection("flat").unwrap();
    let second = docs.insert_object(untitled(vec![0.0, 1.0])).unwrap();
    docs.delete_object(&first).unwrap();
    let wal_entries = harness.db.storage_stats().unwrap().wal_entry_count;
    assert_eq!(wal_entries, 3);
    drop(docs);

    let harness = harness.reopen();
    let docs = harness.db.collection("flat").unwrap();
    let hits = docs.search(&[1.0, 1.0], 10, &SearchParams::default()).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec![second.as_str()]);
}

#[test]
fn test_deleted_collection_stays_deleted() {
    let harness = TestHarness::new();
    {
        let docs = harness.db.create_collection("gone", hnsw_config(2)).unwrap();
        docs.insert_object(titled("a", vec![1.0, 2.0])).unwrap();
        harness.db.create_collection("kept", hnsw_config(2)).unwrap();
        harness.db.delete_collection("gone").unwrap();
    }

    let harness = harness.reopen();
    assert_eq!(harness.db.info().collections, vec!["kept".to_string()]);
    assert!(matches!(
        harness.db.collection("gone"),
        Err(ServiceError::CollectionNotFound(_))
    ));
    let stats = harness.db.storage_stats().unwrap();
    assert_eq!(stats.collection_count, 1);
    assert_eq!(stats.object_count, 0);
    assert_eq!(stats.wal_entry_count, 0);
}

#[test]
fn test_collection_config_survives_reopen() {
    let harness = TestHarness::new();
    let config = hnsw_config(3);
    harness.db.create_collection("docs", config.clone()).unwrap();

    let harness = harness.reopen();
    let info = harness.db.collection_info("docs").unwrap();
    assert_eq!(info.config, config);
    assert_eq!(info.index.index_type, "hnsw");
    assert_eq!(info.index.max_size, 10_000);
}

fn untitled(vector: Vec<f32>) -> vectordb_types::ObjectRecord {
    vectordb_types::ObjectRecord::new(Default::default(), vector)
}
