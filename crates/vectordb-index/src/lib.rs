//! # vectordb-index
//!
//! In-memory vector indexes for vectordb.
//!
//! Collections hold one of two index kinds behind the [`Indexer`] trait:
//! an HNSW proximity graph for approximate search, or a flat index that
//! scans every vector. Neither persists itself; the durable layer rebuilds
//! them from its write-ahead log on startup.
//!
//! ## Features
//! - HNSW with diversity-heuristic neighbor selection and degree pruning
//! - Concurrent insert, delete and search with per-node adjacency locks
//! - Dot, cosine and euclidean distances (lower = more similar)
//! - Typed per-index parameters with validation
//! - Worker pool for batch inserts and searches

pub mod distance;
pub mod error;
pub mod flat;
pub mod hnsw;
pub mod index;
pub mod params;
pub mod pool;
pub mod queue;

pub use distance::Distance;
pub use error::{validate_vector, IndexError};
pub use flat::FlatIndex;
pub use hnsw::HnswIndex;
pub use index::{IndexStats, Indexer, SearchResult, VectorIndex};
pub use params::{FlatParams, HnswParams, IndexSpec, SearchParams, DEFAULT_EF, MAX_EF};
pub use pool::WorkerPool;
pub use queue::{HeapOrder, PriorityQueue, Scored};
