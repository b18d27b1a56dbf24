//! Store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage profile selecting the table format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Block-based tables with compression, bloom filters, and a shared
    /// block cache. The durable default.
    #[default]
    Disk,
    /// Plain tables sized to the fixed key widths. Fastest for
    /// memory-resident working sets.
    Memory,
}

/// Complete store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database directory.
    pub db_path: PathBuf,
    /// Block cache size in megabytes (disk profile only).
    #[serde(default = "default_cache_size_mb")]
    pub cache_size_mb: usize,
    /// Storage profile.
    #[serde(default)]
    pub profile: Profile,
    /// File name of the persisted savepoint stack, relative to
    /// `db_path`.
    #[serde(default = "default_persist_filename")]
    pub persist_filename: String,
}

fn default_cache_size_mb() -> usize {
    256
}

fn default_persist_filename() -> String {
    "savepoints".to_string()
}

impl StoreConfig {
    /// Configuration rooted at `db_path` with defaults everywhere else.
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            db_path: db_path.into(),
            cache_size_mb: default_cache_size_mb(),
            profile: Profile::default(),
            persist_filename: default_persist_filename(),
        }
    }

    /// Override the storage profile.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    /// Path of the persisted savepoint stack.
    pub fn persist_path(&self) -> PathBuf {
        self.db_path.join(&self.persist_filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_partial_document() {
        let config: StoreConfig = serde_json::from_str(r#"{"db_path": "/tmp/db"}"#).unwrap();
        assert_eq!(config.cache_size_mb, 256);
        assert_eq!(config.profile, Profile::Disk);
        assert_eq!(config.persist_path(), PathBuf::from("/tmp/db/savepoints"));
    }

    #[test]
    fn test_profile_lowercase_names() {
        let config: StoreConfig =
            serde_json::from_str(r#"{"db_path": "x", "profile": "memory"}"#).unwrap();
        assert_eq!(config.profile, Profile::Memory);
    }
}
