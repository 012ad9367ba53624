//! Concurrent access through the collection layer.

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;

use e2e_tests::{random_vectors, titled, TestHarness};
use vectordb_index::{Distance, HnswParams, IndexSpec, SearchParams};
use vectordb_service::{CollectionConfig, DatabaseOptions};

fn config(dim: usize) -> CollectionConfig {
    CollectionConfig::new(
        dim,
        Distance::Cosine,
        IndexSpec::Hnsw(HnswParams::new(20_000).with_m(8).with_ef_construction(32)),
    )
    .with_mapping(["title"])
}

#[test]
fn test_batch_insert_completeness() {
    let harness = TestHarness::with_options(DatabaseOptions {
        workers: 8,
        default_ef: 64,
    });
    let docs = harness.db.create_collection("bulk", config(8)).unwrap();

    let objects = random_vectors(3000, 8, 21)
        .into_iter()
        .enumerate()
        .map(|(pos, v)| titled(&pos.to_string(), v))
        .collect();
    let ids = docs.insert_objects(objects).unwrap();

    let mut unique = ids.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 3000);

    let info = docs.info().unwrap();
    assert_eq!(info.object_count, 3000);
    assert_eq!(info.index.vector_count, 3000);
    assert_eq!(harness.db.storage_stats().unwrap().wal_entry_count, 3000);
}

#[test]
fn test_concurrent_writers_and_readers() {
    let harness = TestHarness::new();
    let docs = harness.db.create_collection("mixed", config(4)).unwrap();

    let seed = random_vectors(200, 4, 5);
    let seeded = docs
        .insert_objects(seed.iter().map(|v| titled("seed", v.clone())).collect())
        .unwrap();

    let inserted: Vec<Vec<String>> = thread::scope(|s| {
        let writers: Vec<_> = (0..4u64)
            .map(|t| {
                let docs = Arc::clone(&docs);
                s.spawn(move || {
                    random_vectors(250, 4, 100 + t)
                        .into_iter()
                        .map(|v| docs.insert_object(titled("new", v)).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let deleter = {
            let docs = Arc::clone(&docs);
            let victims: Vec<String> = seeded.iter().step_by(2).cloned().collect();
            s.spawn(move || {
                for id in &victims {
                    docs.delete_object(id).unwrap();
                }
            })
        };

        for _ in 0..4 {
            let docs = Arc::clone(&docs);
            let queries = seed.clone();
            s.spawn(move || {
                for query in &queries {
                    let hits = docs.search(query, 5, &SearchParams::with_ef(32)).unwrap();
                    assert!(hits.len() <= 5);
                }
            });
        }

        deleter.join().unwrap();
        writers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(inserted.iter().map(Vec::len).sum::<usize>(), 1000);
    let info = docs.info().unwrap();
    assert_eq!(info.object_count, 1100);
    assert_eq!(info.index.vector_count, 1100);

    for (pos, query) in seed.iter().enumerate().step_by(2) {
        let hits = docs.search(query, 10, &SearchParams::default()).unwrap();
        assert!(hits.iter().all(|h| h.id != seeded[pos]));
    }
}

#[test]
fn test_search_many_keeps_query_order() {
    let harness = TestHarness::new();
    let docs = harness.db.create_collection("order", config(3)).unwrap();

    let axes = vec![
        titled("x", vec![1.0, 0.0, 0.0]),
        titled("y", vec![0.0, 1.0, 0.0]),
        titled("z", vec![0.0, 0.0, 1.0]),
    ];
    docs.insert_objects(axes).unwrap();

    let queries: Vec<Vec<f32>> = (0..30)
        .map(|i| match i % 3 {
            0 => vec![0.9, 0.1, 0.0],
            1 => vec![0.0, 0.9, 0.1],
            _ => vec![0.1, 0.0, 0.9],
        })
        .collect();
    let results = docs
        .search_many(queries, 1, &SearchParams::default())
        .unwrap();

    let titles: Vec<String> = results
        .iter()
        .map(|hits| hits[0].metadata["title"].as_str().unwrap().to_string())
        .collect();
    let expected: Vec<String> = (0..30)
        .map(|i| ["x", "y", "z"][i % 3].to_string())
        .collect();
    assert_eq!(titles, expected);
}
