//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::market::MarketAllowList;

/// Collection used when `COLLECTION_NAME` is unset.
pub const DEFAULT_COLLECTION: &str = "dcor_competitors";

/// Maximum number of records in one listing page.
pub const PAGE_SIZE: usize = 50;

/// Paths to all RivalScope data directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// SQLite document store directory (`data/db/`).
    pub db: PathBuf,
    /// Export files queued for import (`data/imports/`).
    pub imports: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            db: root.join("db"),
            imports: root.join("imports"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.db)?;
        std::fs::create_dir_all(&self.imports)?;
        Ok(())
    }
}

/// Where a record's creation time is read from for time-window queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencySource {
    /// The timestamp embedded in the record identifier.
    ObjectId,
    /// A numeric epoch-seconds attribute, for stores whose identifiers carry no time.
    CreatedAtField(String),
}

impl Default for RecencySource {
    fn default() -> Self {
        Self::ObjectId
    }
}

/// Top-level RivalScope configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RivalScopeConfig {
    pub data_paths: DataPaths,
    /// Collection holding competitor records.
    pub collection: String,
    /// Collection holding dashboard users; authentication is disabled without it.
    pub login_collection: Option<String>,
    pub recency: RecencySource,
    pub markets: MarketAllowList,
    pub page_size: usize,
}

impl RivalScopeConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        let data_paths = DataPaths::new(data_dir)?;

        let collection = non_empty_var("COLLECTION_NAME")
            .unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
        let login_collection = non_empty_var("COLLECTION_NAME_LOGIN");
        let recency = non_empty_var("RECENCY_FIELD")
            .map(RecencySource::CreatedAtField)
            .unwrap_or_default();

        Ok(Self {
            data_paths,
            collection,
            login_collection,
            recency,
            markets: MarketAllowList::default(),
            page_size: PAGE_SIZE,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_paths_created() {
        let dir = tempfile::tempdir().unwrap();
        let paths = DataPaths::new(dir.path().join("data")).unwrap();
        assert!(paths.db.is_dir());
        assert!(paths.imports.is_dir());
    }

    #[test]
    fn test_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RivalScopeConfig::from_env(dir.path()).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.markets, MarketAllowList::default());
        assert!(!config.collection.is_empty());
    }
}
