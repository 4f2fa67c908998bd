use std::{
    fs,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use tempfile::env::temp_dir;

use crate::storage::file_storage::FileStorage;
use crate::types::error::Result;

pub fn get_unix_timestamp_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis()
}

pub fn create_temp_storage_path() -> PathBuf {
    let mut temp_path = temp_dir();
    temp_path.push(format!("slotdb_test_{}", get_unix_timestamp_millis()));
    temp_path
}

pub fn create_temp_storage_path_with_prefix(prefix: &str) -> PathBuf {
    let mut temp_path = temp_dir();
    temp_path.push(format!("{}_{}", prefix, get_unix_timestamp_millis()));
    temp_path
}

/// An open storage rooted in a throwaway directory, removed on drop.
pub struct TempStorage {
    pub path: PathBuf,
    pub storage: FileStorage,
}

impl TempStorage {
    pub fn new() -> Result<Self> {
        Self::at(create_temp_storage_path())
    }

    pub fn with_prefix(prefix: &str) -> Result<Self> {
        Self::at(create_temp_storage_path_with_prefix(prefix))
    }

    fn at(path: PathBuf) -> Result<Self> {
        let mut storage = FileStorage::new();
        storage.open(&path)?;
        Ok(Self { path, storage })
    }

    /// Close and reopen the storage at the same path, dropping every cache.
    pub fn reopen(&mut self) -> Result<()> {
        self.storage.close()?;
        self.storage = FileStorage::new();
        self.storage.open(&self.path)
    }
}

impl Drop for TempStorage {
    fn drop(&mut self) {
        let _ = self.storage.close();
        if self.path.exists() {
            let _ = fs::remove_dir_all(&self.path);
        }
    }
}
