//! Storage layer for vectordb.
//!
//! Provides RocksDB-backed storage with:
//! - Column family isolation for collections, objects and the log
//! - Collection-prefixed keys for per-collection scans
//! - Atomic object + log writes via WriteBatch
//! - Per-collection log sequences recovered on open

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::{Storage, StorageStats};
pub use error::StorageError;
pub use keys::{ObjectKey, WalKey};
