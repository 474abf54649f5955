//! Metadata persistence
//!
//! Every mutation rewrites the whole affected record; there is no journal
//! and no locking. Last write wins.

use crate::catalog::metadata::{DatabaseMetadata, GlobalMetadata, TableMetadata};
use crate::error::StorageError;
use crate::storage::layout::Layout;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

type Result<T> = std::result::Result<T, StorageError>;

/// Loads and saves catalog records
///
/// The storage engine only talks to its catalog through this trait, so a
/// different backing format can be swapped in without touching data files.
pub trait MetadataStore {
    fn global_exists(&self) -> bool;
    fn load_global(&self) -> Result<GlobalMetadata>;
    fn save_global(&self, meta: &GlobalMetadata) -> Result<()>;

    fn load_database(&self, db_uid: &str) -> Result<DatabaseMetadata>;
    fn save_database(&self, db_uid: &str, meta: &DatabaseMetadata) -> Result<()>;

    fn load_table(&self, db_uid: &str, table_uid: &str) -> Result<TableMetadata>;
    fn save_table(&self, db_uid: &str, table_uid: &str, meta: &TableMetadata) -> Result<()>;
}

/// Pretty-printed JSON files at the paths given by [`Layout`]
#[derive(Debug, Clone)]
pub struct JsonMetadataStore {
    layout: Layout,
}

impl JsonMetadataStore {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }

    fn read<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let data = fs::read(path)?;
        Ok(serde_json::from_slice(&data)?)
    }

    fn write<T: Serialize>(path: &Path, value: &T) -> Result<()> {
        let data = serde_json::to_vec_pretty(value)?;
        fs::write(path, data)?;
        Ok(())
    }
}

impl MetadataStore for JsonMetadataStore {
    fn global_exists(&self) -> bool {
        self.layout.global_metadata().exists()
    }

    fn load_global(&self) -> Result<GlobalMetadata> {
        let path = self.layout.global_metadata();
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StorageError::MetadataNotFound(path));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_slice(&data).map_err(|source| StorageError::CorruptMetadata { path, source })
    }

    fn save_global(&self, meta: &GlobalMetadata) -> Result<()> {
        Self::write(&self.layout.global_metadata(), meta)
    }

    fn load_database(&self, db_uid: &str) -> Result<DatabaseMetadata> {
        Self::read(&self.layout.database_metadata(db_uid))
    }

    fn save_database(&self, db_uid: &str, meta: &DatabaseMetadata) -> Result<()> {
        Self::write(&self.layout.database_metadata(db_uid), meta)
    }

    fn load_table(&self, db_uid: &str, table_uid: &str) -> Result<TableMetadata> {
        Self::read(&self.layout.table_metadata(db_uid, table_uid))
    }

    fn save_table(&self, db_uid: &str, table_uid: &str, meta: &TableMetadata) -> Result<()> {
        Self::write(&self.layout.table_metadata(db_uid, table_uid), meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    #[test]
    fn test_global_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = JsonMetadataStore::new(Layout::new(dir.path()));
        assert!(!store.global_exists());

        let meta = GlobalMetadata::new();
        store.save_global(&meta).unwrap();
        assert!(store.global_exists());
        assert_eq!(store.load_global().unwrap(), meta);
    }

    #[test]
    fn test_missing_global() {
        let dir = TempDir::new().unwrap();
        let store = JsonMetadataStore::new(Layout::new(dir.path()));
        assert!(matches!(store.load_global(), Err(StorageError::MetadataNotFound(_))));
    }

    #[test]
    fn test_corrupt_global() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        fs::write(layout.global_metadata(), "{ not json").unwrap();

        let err = JsonMetadataStore::new(layout).load_global().unwrap_err();
        assert!(matches!(err, StorageError::CorruptMetadata { .. }));
        assert!(err.to_string().starts_with("Invalid global metadata format"));
    }

    #[test]
    fn test_database_record_round_trip() {
        let dir = TempDir::new().unwrap();
        let layout = Layout::new(dir.path());
        fs::create_dir_all(layout.database_dir("u1")).unwrap();
        let store = JsonMetadataStore::new(layout);

        let meta = DatabaseMetadata::new("shop", Utc::now());
        store.save_database("u1", &meta).unwrap();
        assert_eq!(store.load_database("u1").unwrap(), meta);
    }
}
