//! Durable collection layer for vectordb.
//!
//! Provides:
//! - `Database`: named collections over one RocksDB instance
//! - `Collection`: object CRUD, single and batch search
//! - Write-ahead log replay to rebuild indexes on open

pub mod collection;
pub mod config;
pub mod database;
pub mod error;

pub use collection::{Collection, CollectionInfo};
pub use config::{validate_name, CollectionConfig, MAX_NAME_LEN};
pub use database::{Database, DatabaseInfo, DatabaseOptions};
pub use error::ServiceError;
