//! Collection definitions.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vectordb_index::{Distance, IndexSpec};
use vectordb_types::Metadata;

use crate::error::ServiceError;

/// Longest accepted collection name
pub const MAX_NAME_LEN: usize = 64;

/// Persisted definition of a collection.
///
/// ```json
/// {
///   "dimension": 4,
///   "distance": "cosine",
///   "index": {"index_type": "hnsw", "index_params": {"m_max": 16}},
///   "mapping": ["title"]
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Length every vector must have
    pub dimension: usize,

    pub distance: Distance,

    pub index: IndexSpec,

    /// Metadata keys every object carries, no more and no fewer
    #[serde(default)]
    pub mapping: Vec<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl CollectionConfig {
    pub fn new(dimension: usize, distance: Distance, index: IndexSpec) -> Self {
        Self {
            dimension,
            distance,
            index,
            mapping: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_mapping<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.mapping = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.dimension == 0 {
            return Err(ServiceError::InvalidConfig(
                "dimension must be at least 1".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for key in &self.mapping {
            if key.is_empty() {
                return Err(ServiceError::InvalidConfig(
                    "mapping keys must not be empty".to_string(),
                ));
            }
            if !seen.insert(key.as_str()) {
                return Err(ServiceError::InvalidConfig(format!(
                    "duplicate mapping key: {}",
                    key
                )));
            }
        }

        self.index.validate()?;
        Ok(())
    }

    /// Check that `metadata` holds exactly the mapped keys.
    pub fn check_metadata(&self, metadata: &Metadata) -> Result<(), ServiceError> {
        if let Some(key) = self.mapping.iter().find(|k| !metadata.contains_key(*k)) {
            return Err(ServiceError::InvalidMetadata(format!(
                "missing key: {}",
                key
            )));
        }
        if let Some(key) = metadata.keys().find(|k| !self.mapping.contains(k)) {
            return Err(ServiceError::InvalidMetadata(format!(
                "unmapped key: {}",
                key
            )));
        }
        Ok(())
    }
}

/// Validate a collection name: 1-64 ASCII letters, digits, `_` or `-`.
pub fn validate_name(name: &str) -> Result<(), ServiceError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_NAME_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
    if valid {
        Ok(())
    } else {
        Err(ServiceError::InvalidName(name.to_string()))
    }
}
