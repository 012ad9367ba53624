//! Brute-force index.
//!
//! Scores every stored vector on each search. Exact, linear in the
//! collection size, and useful as a baseline for small collections.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::distance::Distance;
use crate::error::IndexError;
use crate::index::{IndexStats, Indexer, SearchResult};
use crate::params::{FlatParams, SearchParams};

pub struct FlatIndex {
    distance: Distance,
    max_size: usize,
    vectors: RwLock<HashMap<String, Vec<f32>>>,
}

impl FlatIndex {
    pub fn new(distance: Distance, params: &FlatParams) -> Result<Self, IndexError> {
        params.validate()?;
        Ok(Self {
            distance,
            max_size: params.max_size,
            vectors: RwLock::new(HashMap::new()),
        })
    }
}

impl Indexer for FlatIndex {
    fn insert(&self, id: &str, vector: Vec<f32>) -> Result<(), IndexError> {
        let mut vectors = self.vectors.write();
        if vectors.len() >= self.max_size {
            return Err(IndexError::IndexFull {
                max_size: self.max_size,
            });
        }
        if vectors.contains_key(id) {
            return Err(IndexError::DuplicateId(id.to_string()));
        }
        vectors.insert(id.to_string(), vector);
        debug!(id = %id, "Inserted vector");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<(), IndexError> {
        match self.vectors.write().remove(id) {
            Some(_) => {
                debug!(id = %id, "Deleted vector");
                Ok(())
            }
            None => Err(IndexError::NotFound(id.to_string())),
        }
    }

    fn update(&self, id: &str, vector: Vec<f32>) -> Result<(), IndexError> {
        match self.vectors.write().get_mut(id) {
            Some(slot) => {
                *slot = vector;
                Ok(())
            }
            None => Err(IndexError::NotFound(id.to_string())),
        }
    }

    fn search(
        &self,
        query: &[f32],
        topk: usize,
        _params: &SearchParams,
    ) -> Result<Vec<SearchResult>, IndexError> {
        let vectors = self.vectors.read();
        let mut scored: Vec<SearchResult> = vectors
            .iter()
            .map(|(id, v)| SearchResult::new(id.clone(), self.distance.compute(query, v)))
            .collect();
        drop(vectors);

        scored.sort_by(|a, b| a.score.total_cmp(&b.score).then_with(|| a.id.cmp(&b.id)));
        scored.truncate(topk);
        Ok(scored)
    }

    fn len(&self) -> usize {
        self.vectors.read().len()
    }

    fn contains(&self, id: &str) -> bool {
        self.vectors.read().contains_key(id)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            index_type: "flat".to_string(),
            vector_count: self.len(),
            max_size: self.max_size,
            max_level: None,
        }
    }
}
