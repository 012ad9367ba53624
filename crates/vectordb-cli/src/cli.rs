//! CLI argument parsing for vectordb.
//!
//! CLI flags override all other config sources.

use clap::{Parser, Subcommand};

/// vectordb
///
/// An embedded vector database with HNSW and flat indexes.
#[derive(Parser, Debug)]
#[command(name = "vectordb")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/vectordb/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Override database path
    #[arg(long, global = true)]
    pub db_path: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List collections
    Info,

    /// Manage collections
    #[command(subcommand)]
    Collection(CollectionCommands),

    /// Read and write objects
    #[command(subcommand)]
    Object(ObjectCommands),

    /// Nearest-neighbour search
    Search {
        /// Collection to search
        collection: String,

        /// Query vector as a JSON array
        #[arg(long)]
        vector: String,

        /// Number of results
        #[arg(short = 'k', long, default_value = "10")]
        topk: usize,

        /// Search params as a JSON object, e.g. '{"ef": 128}'
        #[arg(long)]
        params: Option<String>,
    },

    /// Administrative commands
    #[command(subcommand)]
    Admin(AdminCommands),
}

/// Collection subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum CollectionCommands {
    /// Create a collection
    Create {
        name: String,

        /// Vector dimension
        #[arg(short, long)]
        dimension: usize,

        /// Distance metric (dot, cosine, euclidean)
        #[arg(long, default_value = "cosine")]
        distance: String,

        /// Index type (hnsw, flat)
        #[arg(long, default_value = "hnsw")]
        index_type: String,

        /// Index params as a JSON object, e.g. '{"m_max": 16}'
        #[arg(long, default_value = "{}")]
        index_params: String,

        /// Metadata keys every object must carry
        #[arg(long, value_delimiter = ',')]
        mapping: Vec<String>,
    },

    /// Delete a collection and all of its objects
    Delete { name: String },

    /// Show collection details
    Info { name: String },

    /// List collection names
    List,
}

/// Object subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ObjectCommands {
    /// Insert one object
    Insert {
        collection: String,

        /// Vector as a JSON array
        #[arg(long)]
        vector: String,

        /// Metadata as a JSON object
        #[arg(long, default_value = "{}")]
        metadata: String,
    },

    /// Insert objects from a JSON file holding an array of
    /// `{"metadata": {...}, "vector": [...]}` records
    InsertBatch {
        collection: String,

        /// Input file, or `-` for stdin
        #[arg(short, long)]
        file: String,
    },

    /// Fetch one object
    Get { collection: String, id: String },

    /// Page through objects
    List {
        collection: String,

        #[arg(long, default_value = "0")]
        offset: usize,

        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Replace an object's metadata and vector
    Update {
        collection: String,
        id: String,

        /// Vector as a JSON array
        #[arg(long)]
        vector: String,

        /// Metadata as a JSON object
        #[arg(long, default_value = "{}")]
        metadata: String,
    },

    /// Delete one object
    Delete { collection: String, id: String },
}

/// Admin subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AdminCommands {
    /// Show database statistics
    Stats,

    /// Trigger RocksDB compaction
    Compact,
}
