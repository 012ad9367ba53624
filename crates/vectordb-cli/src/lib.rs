//! vectordb CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations over an embedded `Database`

pub mod cli;
pub mod commands;

pub use cli::{AdminCommands, Cli, CollectionCommands, Commands, ObjectCommands};
pub use commands::{execute, init_logging, load_settings, open_database};
