//! End-to-end test infrastructure for vectordb.
//!
//! Provides a shared TestHarness and helper functions for E2E tests
//! covering the full write -> log -> index -> search path.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

use vectordb_index::Distance;
use vectordb_service::{Database, DatabaseOptions};
use vectordb_types::{Metadata, ObjectRecord};

/// Shared test harness for E2E tests.
///
/// Owns a temp directory and a database opened inside it.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Database directory inside the temp dir
    pub db_path: PathBuf,
    pub options: DatabaseOptions,
    pub db: Database,
}

impl TestHarness {
    /// Create a new test harness with a fresh database.
    pub fn new() -> Self {
        Self::with_options(DatabaseOptions {
            workers: 4,
            default_ef: 64,
        })
    }

    pub fn with_options(options: DatabaseOptions) -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("db");
        let db = open(&db_path, options);
        Self {
            _temp_dir: temp_dir,
            db_path,
            options,
            db,
        }
    }

    /// Close the database and open it again from disk.
    pub fn reopen(self) -> Self {
        let TestHarness {
            _temp_dir,
            db_path,
            options,
            db,
        } = self;
        drop(db);
        let db = open(&db_path, options);
        Self {
            _temp_dir,
            db_path,
            options,
            db,
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn open(path: &Path, options: DatabaseOptions) -> Database {
    Database::open(path, options).expect("Failed to open test database")
}

/// Build an object with a single `title` metadata key.
pub fn titled(title: &str, vector: Vec<f32>) -> ObjectRecord {
    let mut metadata = Metadata::new();
    metadata.insert("title".to_string(), json!(title));
    ObjectRecord::new(metadata, vector)
}

/// `count` uniformly random vectors in `[0, 1)^dim`, reproducible per seed.
pub fn random_vectors(count: usize, dim: usize, seed: u64) -> Vec<Vec<f32>> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (0..dim).map(|_| rng.random::<f32>()).collect())
        .collect()
}

/// Exact top-k positions of `data` nearest to `query`.
pub fn brute_force_topk(distance: Distance, data: &[Vec<f32>], query: &[f32], k: usize) -> Vec<usize> {
    let mut scored: Vec<(usize, f32)> = data
        .iter()
        .enumerate()
        .map(|(pos, v)| (pos, distance.compute(query, v)))
        .collect();
    scored.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    scored.into_iter().take(k).map(|(pos, _)| pos).collect()
}

/// Fraction of `expected` present in `found`.
pub fn recall<T: PartialEq>(expected: &[T], found: &[T]) -> f64 {
    if expected.is_empty() {
        return 1.0;
    }
    let hits = expected.iter().filter(|e| found.contains(e)).count();
    hits as f64 / expected.len() as f64
}
