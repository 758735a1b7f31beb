// src/config.rs

use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::storage::{JsonFileStore, PgSnapshotStore, SnapshotStore};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageConfig {
    JsonDir(PathBuf),
    Postgres { database_url: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub storage: StorageConfig,
    pub storage_timeout: Duration,
    pub seed_default_catalog: bool,
}

impl Config {
    /// Reads settings from the environment (call `dotenvy::dotenv()` first to
    /// pick up a `.env` file). `DATABASE_URL` selects Postgres; otherwise the
    /// JSON store lives in `DATA_DIR`.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let storage = match get("DATABASE_URL").filter(|s| !s.trim().is_empty()) {
            Some(database_url) => StorageConfig::Postgres { database_url },
            None => StorageConfig::JsonDir(
                get("DATA_DIR")
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or_else(|| "data".to_string())
                    .into(),
            ),
        };
        let storage_timeout_ms = get("STORAGE_TIMEOUT_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(2000);
        let seed_default_catalog = get("SEED_DEFAULT_CATALOG")
            .and_then(|s| parse_bool(&s))
            .unwrap_or(true);

        Ok(Self {
            storage,
            storage_timeout: Duration::from_millis(storage_timeout_ms),
            seed_default_catalog,
        })
    }

    pub async fn open_backend(&self) -> anyhow::Result<Arc<dyn SnapshotStore>> {
        Ok(match &self.storage {
            StorageConfig::JsonDir(dir) => Arc::new(JsonFileStore::new(dir.clone())),
            StorageConfig::Postgres { database_url } => {
                Arc::new(PgSnapshotStore::connect(database_url, self.storage_timeout).await?)
            }
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
