//! Column family definitions for RocksDB.
//!
//! - collections: collection definitions keyed by name
//! - objects: object records (metadata + vector)
//! - wal: append-only mutation log replayed on startup

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for collection definitions
pub const CF_COLLECTIONS: &str = "collections";

/// Column family name for object records
pub const CF_OBJECTS: &str = "objects";

/// Column family name for the write-ahead log
pub const CF_WAL: &str = "wal";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_COLLECTIONS, CF_OBJECTS, CF_WAL];

/// Append-only log; compressed since entries carry full vectors
fn wal_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_COLLECTIONS, Options::default()),
        ColumnFamilyDescriptor::new(CF_OBJECTS, Options::default()),
        ColumnFamilyDescriptor::new(CF_WAL, wal_options()),
    ]
}
