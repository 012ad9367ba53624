//! Indexer trait and the index variant chosen per collection.
//!
//! Defines the interface every vector index implements, plus
//! [`VectorIndex`], the tagged variant a collection holds. The variant is
//! picked once from an [`IndexSpec`] when the collection is created.

use serde::Serialize;

use crate::distance::Distance;
use crate::error::IndexError;
use crate::flat::FlatIndex;
use crate::hnsw::HnswIndex;
use crate::params::{IndexSpec, SearchParams};

/// Result of a vector search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    /// External id of the matched vector
    pub id: String,
    /// Distance to the query (lower = more similar)
    pub score: f32,
}

impl SearchResult {
    pub fn new(id: impl Into<String>, score: f32) -> Self {
        Self {
            id: id.into(),
            score,
        }
    }
}

/// Index statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IndexStats {
    /// "flat" or "hnsw"
    pub index_type: String,
    /// Number of live vectors
    pub vector_count: usize,
    /// Capacity limit
    pub max_size: usize,
    /// Highest occupied graph layer (hnsw only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_level: Option<usize>,
}

/// Trait for vector indexes.
///
/// All methods take `&self`; implementations synchronize internally and
/// must tolerate concurrent callers. `update` is not atomic with respect
/// to concurrent searches, and `delete`/`update` must not race each other
/// on the same id.
pub trait Indexer: Send + Sync {
    /// Add a vector under `id`.
    fn insert(&self, id: &str, vector: Vec<f32>) -> Result<(), IndexError>;

    /// Remove the vector stored under `id`.
    fn delete(&self, id: &str) -> Result<(), IndexError>;

    /// Replace the vector stored under `id`.
    fn update(&self, id: &str, vector: Vec<f32>) -> Result<(), IndexError>;

    /// Up to `topk` nearest vectors, best first.
    fn search(
        &self,
        query: &[f32],
        topk: usize,
        params: &SearchParams,
    ) -> Result<Vec<SearchResult>, IndexError>;

    /// Number of live vectors
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains(&self, id: &str) -> bool;

    fn stats(&self) -> IndexStats;
}

/// The index backing one collection.
pub enum VectorIndex {
    Flat(FlatIndex),
    Hnsw(HnswIndex),
}

impl VectorIndex {
    /// Build an empty index for `spec`, validating its parameters.
    pub fn new(spec: &IndexSpec, distance: Distance) -> Result<Self, IndexError> {
        match spec {
            IndexSpec::Flat(params) => Ok(VectorIndex::Flat(FlatIndex::new(distance, params)?)),
            IndexSpec::Hnsw(params) => Ok(VectorIndex::Hnsw(HnswIndex::new(distance, params)?)),
        }
    }
}

macro_rules! dispatch {
    ($self:ident, $index:ident => $call:expr) => {
        match $self {
            VectorIndex::Flat($index) => $call,
            VectorIndex::Hnsw($index) => $call,
        }
    };
}

impl Indexer for VectorIndex {
    fn insert(&self, id: &str, vector: Vec<f32>) -> Result<(), IndexError> {
        dispatch!(self, index => index.insert(id, vector))
    }

    fn delete(&self, id: &str) -> Result<(), IndexError> {
        dispatch!(self, index => index.delete(id))
    }

    fn update(&self, id: &str, vector: Vec<f32>) -> Result<(), IndexError> {
        dispatch!(self, index => index.update(id, vector))
    }

    fn search(
        &self,
        query: &[f32],
        topk: usize,
        params: &SearchParams,
    ) -> Result<Vec<SearchResult>, IndexError> {
        dispatch!(self, index => index.search(query, topk, params))
    }

    fn len(&self) -> usize {
        dispatch!(self, index => index.len())
    }

    fn contains(&self, id: &str) -> bool {
        dispatch!(self, index => index.contains(id))
    }

    fn stats(&self) -> IndexStats {
        dispatch!(self, index => index.stats())
    }
}
