//! # vectordb-types
//!
//! Shared types for the vectordb workspace.
//!
//! - Settings: layered configuration
//! - Objects: the records stored next to each vector
//! - WAL entries: logged mutations replayed on startup

pub mod config;
pub mod error;
pub mod object;
pub mod wal;

pub use config::{Settings, DEFAULT_SEARCH_EF};
pub use error::TypesError;
pub use object::{Metadata, ObjectInfo, ObjectRecord, SearchHit};
pub use wal::{WalEntry, WalOp};
