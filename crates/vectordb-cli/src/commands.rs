//! Command implementations for vectordb.
//!
//! Every command returns a JSON value; `main` prints it.

use std::fs;
use std::io::Read;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use tracing::info;

use vectordb_index::{Distance, IndexSpec, SearchParams};
use vectordb_service::{CollectionConfig, Database, DatabaseOptions};
use vectordb_types::{Metadata, ObjectRecord, Settings};

use crate::cli::{AdminCommands, CollectionCommands, Commands, ObjectCommands};

/// Load settings and apply CLI overrides (highest precedence).
pub fn load_settings(
    config_path: Option<&str>,
    db_path_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(db_path) = db_path_override {
        settings.db_path = db_path.to_string();
    }
    if let Some(log_level) = log_level_override {
        settings.log_level = log_level.to_string();
    }
    Ok(settings)
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Open the database described by `settings`, creating directories as needed.
pub fn open_database(settings: &Settings) -> Result<Database> {
    let db_path = settings.expanded_db_path();
    info!("Opening database at {:?}", db_path);

    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent).context("Failed to create database directory")?;
    }

    Database::open(&db_path, DatabaseOptions::from(settings)).context("Failed to open database")
}

/// Run one command against an open database.
pub fn execute(db: &Database, command: Commands) -> Result<Value> {
    match command {
        Commands::Info => Ok(serde_json::to_value(db.info())?),
        Commands::Collection(cmd) => handle_collection(db, cmd),
        Commands::Object(cmd) => handle_object(db, cmd),
        Commands::Search {
            collection,
            vector,
            topk,
            params,
        } => {
            let vector = parse_vector(&vector)?;
            let params = match params {
                Some(raw) => {
                    let value: Value = serde_json::from_str(&raw).context("Invalid --params JSON")?;
                    SearchParams::from_json(Some(&value))?
                }
                None => SearchParams::default(),
            };
            let hits = db.collection(&collection)?.search(&vector, topk, &params)?;
            Ok(serde_json::to_value(hits)?)
        }
        Commands::Admin(cmd) => handle_admin(db, cmd),
    }
}

fn handle_collection(db: &Database, cmd: CollectionCommands) -> Result<Value> {
    match cmd {
        CollectionCommands::Create {
            name,
            dimension,
            distance,
            index_type,
            index_params,
            mapping,
        } => {
            let distance: Distance = distance.parse()?;
            let index_params: Value =
                serde_json::from_str(&index_params).context("Invalid --index-params JSON")?;
            let index: IndexSpec = serde_json::from_value(json!({
                "index_type": index_type.to_ascii_lowercase(),
                "index_params": index_params,
            }))
            .context("Invalid index definition")?;

            let config = CollectionConfig::new(dimension, distance, index).with_mapping(mapping);
            let collection = db.create_collection(&name, config)?;
            Ok(serde_json::to_value(collection.info()?)?)
        }
        CollectionCommands::Delete { name } => {
            db.delete_collection(&name)?;
            Ok(json!({ "deleted": name }))
        }
        CollectionCommands::Info { name } => Ok(serde_json::to_value(db.collection_info(&name)?)?),
        CollectionCommands::List => Ok(serde_json::to_value(db.info().collections)?),
    }
}

fn handle_object(db: &Database, cmd: ObjectCommands) -> Result<Value> {
    match cmd {
        ObjectCommands::Insert {
            collection,
            vector,
            metadata,
        } => {
            let object = ObjectRecord::new(parse_metadata(&metadata)?, parse_vector(&vector)?);
            let id = db.collection(&collection)?.insert_object(object)?;
            Ok(json!({ "id": id }))
        }
        ObjectCommands::InsertBatch { collection, file } => {
            let raw = read_input(&file)?;
            let objects: Vec<ObjectRecord> =
                serde_json::from_str(&raw).context("Batch input must be a JSON array of objects")?;
            let ids = db.collection(&collection)?.insert_objects(objects)?;
            Ok(json!({ "ids": ids }))
        }
        ObjectCommands::Get { collection, id } => {
            Ok(serde_json::to_value(db.collection(&collection)?.get_object(&id)?)?)
        }
        ObjectCommands::List {
            collection,
            offset,
            limit,
        } => Ok(serde_json::to_value(
            db.collection(&collection)?.get_objects(offset, limit)?,
        )?),
        ObjectCommands::Update {
            collection,
            id,
            vector,
            metadata,
        } => {
            let object = ObjectRecord::new(parse_metadata(&metadata)?, parse_vector(&vector)?);
            db.collection(&collection)?.update_object(&id, object)?;
            Ok(json!({ "updated": id }))
        }
        ObjectCommands::Delete { collection, id } => {
            db.collection(&collection)?.delete_object(&id)?;
            Ok(json!({ "deleted": id }))
        }
    }
}

fn handle_admin(db: &Database, cmd: AdminCommands) -> Result<Value> {
    match cmd {
        AdminCommands::Stats => Ok(serde_json::to_value(db.storage_stats()?)?),
        AdminCommands::Compact => {
            db.compact()?;
            Ok(json!({ "compacted": true }))
        }
    }
}

fn parse_vector(raw: &str) -> Result<Vec<f32>> {
    let vector: Vec<f32> = serde_json::from_str(raw).context("Vector must be a JSON array of numbers")?;
    if vector.iter().any(|v| !v.is_finite()) {
        bail!("Vector components must be finite");
    }
    Ok(vector)
}

fn parse_metadata(raw: &str) -> Result<Metadata> {
    serde_json::from_str(raw).context("Metadata must be a JSON object")
}

fn read_input(path: &str) -> Result<String> {
    if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        Ok(buf)
    } else {
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))
    }
}
