//! Key encoding and decoding for storage layer.
//!
//! Key formats:
//! - objects: `obj:{collection}:{id}`
//! - log:     `wal:{collection}:{sequence:020}`
//!
//! Collection names never contain `:`, so `{prefix}:{collection}:` is an
//! exact prefix for one collection's keys. Sequences are zero-padded so
//! lexicographic order equals numeric order.

use crate::error::StorageError;

/// Key for a stored object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKey {
    pub collection: String,
    pub id: String,
}

impl ObjectKey {
    pub fn new(collection: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            id: id.into(),
        }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("obj:{}:{}", self.collection, self.id).into_bytes()
    }

    /// Prefix shared by every object of `collection`
    pub fn prefix(collection: &str) -> Vec<u8> {
        format!("obj:{}:", collection).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("obj"), Some(collection), Some(id)) if !id.is_empty() => {
                Ok(Self::new(collection, id))
            }
            _ => Err(StorageError::Key(format!("Invalid object key format: {}", s))),
        }
    }
}

/// Key for write-ahead log entries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalKey {
    pub collection: String,
    /// Monotonic per-collection sequence number
    pub sequence: u64,
}

impl WalKey {
    pub fn new(collection: impl Into<String>, sequence: u64) -> Self {
        Self {
            collection: collection.into(),
            sequence,
        }
    }

    /// Encode key to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("wal:{}:{:020}", self.collection, self.sequence).into_bytes()
    }

    /// Prefix shared by every log entry of `collection`
    pub fn prefix(collection: &str) -> Vec<u8> {
        format!("wal:{}:", collection).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 3 || parts[0] != "wal" {
            return Err(StorageError::Key(format!("Invalid wal key format: {}", s)));
        }

        let sequence: u64 = parts[2]
            .parse()
            .map_err(|e| StorageError::Key(format!("Invalid sequence: {}", e)))?;

        Ok(Self::new(parts[1], sequence))
    }
}
