//! Write-ahead log entry type.
//!
//! Every mutation of a collection is recorded as a `WalEntry` in the same
//! write batch as the object it touches. On startup the entries are replayed
//! in sequence order to rebuild the in-memory index.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Kind of logged mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalOp {
    /// New object added to the index
    Insert,
    /// Existing object replaced with a new vector
    Update,
    /// Object removed from the index
    Delete,
}

impl std::fmt::Display for WalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WalOp::Insert => write!(f, "insert"),
            WalOp::Update => write!(f, "update"),
            WalOp::Delete => write!(f, "delete"),
        }
    }
}

/// A single logged mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalEntry {
    /// What happened
    pub op: WalOp,

    /// Object id the mutation applies to
    pub id: String,

    /// Vector payload; empty for deletes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub vector: Vec<f32>,

    /// Wall-clock time the entry was written (ms since epoch)
    pub timestamp_ms: i64,
}

impl WalEntry {
    /// Create an insert entry
    pub fn insert(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self::new(WalOp::Insert, id.into(), vector)
    }

    /// Create an update entry
    pub fn update(id: impl Into<String>, vector: Vec<f32>) -> Self {
        Self::new(WalOp::Update, id.into(), vector)
    }

    /// Create a delete entry
    pub fn delete(id: impl Into<String>) -> Self {
        Self::new(WalOp::Delete, id.into(), Vec::new())
    }

    fn new(op: WalOp, id: String, vector: Vec<f32>) -> Self {
        Self {
            op,
            id,
            vector,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }

    /// Serialize to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wal_entry_roundtrip() {
        let entry = WalEntry::update("obj-1", vec![0.25, 0.5, 1.0]);
        let bytes = entry.to_bytes().unwrap();
        let decoded = WalEntry::from_bytes(&bytes).unwrap();

        assert_eq!(entry, decoded);
        assert_eq!(decoded.op, WalOp::Update);
    }

    #[test]
    fn test_delete_entry_omits_vector() {
        let entry = WalEntry::delete("obj-2");
        let json = String::from_utf8(entry.to_bytes().unwrap()).unwrap();

        assert!(!json.contains("vector"));
        assert!(json.contains("\"op\":\"delete\""));
        assert!(WalEntry::from_bytes(json.as_bytes()).unwrap().vector.is_empty());
    }
}
