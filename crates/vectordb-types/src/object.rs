//! Object records stored alongside the vector index.

use serde::{Deserialize, Serialize};

/// Free-form metadata attached to an object.
///
/// Keys must match the owning collection's mapping exactly.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// The persisted value of an object: its metadata and vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    #[serde(default)]
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

impl ObjectRecord {
    pub fn new(metadata: Metadata, vector: Vec<f32>) -> Self {
        Self { metadata, vector }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Attach an id, producing the public view of the object.
    pub fn into_info(self, id: impl Into<String>) -> ObjectInfo {
        ObjectInfo {
            id: id.into(),
            metadata: self.metadata,
            vector: self.vector,
        }
    }
}

/// An object as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
}

/// A search hit: the full object plus its distance to the query.
///
/// Lower scores are closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub metadata: Metadata,
    pub vector: Vec<f32>,
    pub score: f32,
}

impl SearchHit {
    pub fn from_info(info: ObjectInfo, score: f32) -> Self {
        Self {
            id: info.id,
            metadata: info.metadata,
            vector: info.vector,
            score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_without_metadata_defaults_empty() {
        let record = ObjectRecord::from_bytes(br#"{"vector":[1.0,2.0]}"#).unwrap();
        assert!(record.metadata.is_empty());
        assert_eq!(record.vector, vec![1.0, 2.0]);
    }

    #[test]
    fn test_into_info_keeps_payload() {
        let mut metadata = Metadata::new();
        metadata.insert("title".to_string(), json!("first"));
        let info = ObjectRecord::new(metadata.clone(), vec![0.5]).into_info("abc");

        assert_eq!(info.id, "abc");
        assert_eq!(info.metadata, metadata);

        let hit = SearchHit::from_info(info, 0.125);
        assert_eq!(hit.id, "abc");
        assert!((hit.score - 0.125).abs() < f32::EPSILON);
    }
}
