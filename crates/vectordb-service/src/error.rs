//! Service layer error types.

use thiserror::Error;
use vectordb_index::IndexError;
use vectordb_storage::StorageError;
use vectordb_types::TypesError;

/// Errors returned by [`Database`](crate::Database) and
/// [`Collection`](crate::Collection) operations
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Collection already exists: {0}")]
    CollectionExists(String),

    #[error("Invalid collection name: {0}")]
    InvalidName(String),

    #[error("Invalid collection config: {0}")]
    InvalidConfig(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Invalid metadata: {0}")]
    InvalidMetadata(String),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Types(#[from] TypesError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
