//! Test harness for integration tests.

use ledger_state::{StoreConfig, TokenStore};
use ledger_storage::Profile;
use std::path::PathBuf;
use tempfile::TempDir;

/// Test store wrapper that cleans up its directory on drop.
pub struct TestStore {
    store: TokenStore,
    _temp_dir: TempDir,
}

impl TestStore {
    /// Create a new test store in a temporary directory.
    pub fn new() -> Self {
        Self::with_profile(Profile::Disk)
    }

    /// Create a new test store with an explicit storage profile.
    pub fn with_profile(profile: Profile) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = StoreConfig::new(temp_dir.path()).with_profile(profile);
        let store = TokenStore::open(&config).expect("Failed to open store");
        Self {
            store,
            _temp_dir: temp_dir,
        }
    }

    /// Path to the store directory.
    pub fn path(&self) -> PathBuf {
        self._temp_dir.path().to_path_buf()
    }

    /// Close the store (optionally persisting savepoints) but keep the
    /// directory, returning it for a later reopen.
    pub fn close(self, persist: bool) -> TempDir {
        self.store.close(persist);
        self._temp_dir
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestStore {
    type Target = TokenStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}
