//! Index error types.

use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
    /// Insert attempted while the index holds `max_size` vectors
    #[error("Index is full: capacity {max_size}")]
    IndexFull { max_size: usize },

    /// Delete or update of an id the index does not hold
    #[error("Vector not found: {0}")]
    NotFound(String),

    /// Insert of an id the index already holds
    #[error("Duplicate vector id: {0}")]
    DuplicateId(String),

    /// Bad construction or search parameter
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// Vector length does not match the configured dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    InvalidVector { expected: usize, actual: usize },
}

/// Check a vector against the dimension its collection was created with.
///
/// The indexes assume fixed-length vectors, so callers run this before
/// handing a vector over.
pub fn validate_vector(expected: usize, vector: &[f32]) -> Result<(), IndexError> {
    if vector.len() != expected {
        return Err(IndexError::InvalidVector {
            expected,
            actual: vector.len(),
        });
    }
    Ok(())
}
