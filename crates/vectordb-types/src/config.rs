//! Configuration loading for vectordb.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/vectordb/config.toml.

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::TypesError;

/// Beam width used by searches that do not set `ef` explicitly.
pub const DEFAULT_SEARCH_EF: usize = 64;

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to RocksDB storage directory
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Worker threads used for batch inserts and searches
    #[serde(default = "default_batch_workers")]
    pub batch_workers: usize,

    /// Beam width for searches that do not supply one
    #[serde(default = "default_ef")]
    pub default_ef: usize,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "vectordb")
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_batch_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

fn default_ef() -> usize {
    DEFAULT_SEARCH_EF
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            log_level: default_log_level(),
            batch_workers: default_batch_workers(),
            default_ef: default_ef(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/vectordb/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (VECTORDB_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, TypesError> {
        let config_dir = ProjectDirs::from("", "", "vectordb")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("log_level", default_log_level())
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("batch_workers", default_batch_workers() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .set_default("default_ef", default_ef() as i64)
            .map_err(|e| TypesError::Config(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // VECTORDB_DB_PATH, VECTORDB_LOG_LEVEL, VECTORDB_BATCH_WORKERS, ...
        builder = builder.add_source(
            Environment::with_prefix("VECTORDB")
                .prefix_separator("_")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| TypesError::Config(e.to_string()))?;

        let settings: Settings = config
            .try_deserialize()
            .map_err(|e| TypesError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values that would make the database unusable.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.batch_workers == 0 {
            return Err(TypesError::Config(
                "batch_workers must be at least 1".to_string(),
            ));
        }
        if self.default_ef == 0 {
            return Err(TypesError::Config(
                "default_ef must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand ~ in db_path to actual home directory
    pub fn expanded_db_path(&self) -> PathBuf {
        if let Some(rest) = self.db_path.strip_prefix("~/") {
            if let Some(home) = dirs_home() {
                return home.join(rest);
            }
        }
        PathBuf::from(&self.db_path)
    }
}

fn dirs_home() -> Option<PathBuf> {
    BaseDirs::new()
        .map(|b| b.home_dir().to_path_buf())
        .or_else(|| std::env::var("HOME").ok().map(PathBuf::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.default_ef, DEFAULT_SEARCH_EF);
        assert!(settings.batch_workers >= 1);
    }

    #[test]
    fn test_load_with_defaults() {
        let settings = Settings::load(None).unwrap();
        assert!(settings.batch_workers >= 1);
    }

    #[test]
    fn test_load_cli_file_overrides_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("vectordb.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "db_path = \"/tmp/vectordb-test\"").unwrap();
        writeln!(file, "batch_workers = 3").unwrap();
        drop(file);

        let settings = Settings::load(Some(path.to_str().unwrap())).unwrap();
        assert_eq!(settings.db_path, "/tmp/vectordb-test");
        assert_eq!(settings.batch_workers, 3);
    }

    #[test]
    fn test_load_rejects_zero_workers() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "batch_workers = 0\n").unwrap();

        let err = Settings::load(Some(path.to_str().unwrap())).unwrap_err();
        assert!(matches!(err, TypesError::Config(_)));
    }

    #[test]
    fn test_expanded_db_path() {
        let settings = Settings {
            db_path: "~/vectors/db".to_string(),
            ..Default::default()
        };
        let expanded = settings.expanded_db_path();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("vectors/db"));

        let absolute = Settings {
            db_path: "/var/lib/vectordb".to_string(),
            ..Default::default()
        };
        assert_eq!(absolute.expanded_db_path(), PathBuf::from("/var/lib/vectordb"));
    }
}
