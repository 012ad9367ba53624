//! vectordb
//!
//! An embedded vector database driven from the command line.
//!
//! # Usage
//!
//! ```bash
//! vectordb collection create docs --dimension 4 --distance cosine --mapping title
//! vectordb object insert docs --vector '[0.1, 0.2, 0.3, 0.4]' --metadata '{"title": "a"}'
//! vectordb search docs --vector '[0.1, 0.2, 0.3, 0.4]' -k 5 --params '{"ef": 64}'
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/vectordb/config.toml)
//! 3. Environment variables (VECTORDB_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use vectordb_cli::{execute, init_logging, load_settings, open_database, Cli};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(
        cli.config.as_deref(),
        cli.db_path.as_deref(),
        cli.log_level.as_deref(),
    )?;
    init_logging(&settings.log_level)?;

    let db = open_database(&settings)?;
    let output = execute(&db, cli.command)?;
    db.flush()?;

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
