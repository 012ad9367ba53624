//! Hierarchical Navigable Small World graph index.
//!
//! A multi-layer proximity graph supporting approximate nearest-neighbor
//! search, incremental insert, and best-effort delete under concurrent
//! access. See [`HnswIndex`] for the locking rules and the approximations
//! the structure accepts.

mod graph;
mod node;
mod search;
mod select;

pub use graph::HnswIndex;
