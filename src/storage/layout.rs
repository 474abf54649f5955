//! On-disk directory layout
//!
//! ```text
//! <base>/global_metadata.json
//! <base>/db_<uid>/db_metadata.json
//! <base>/db_<uid>/table_<uid>/table_metadata.json
//! <base>/db_<uid>/table_<uid>/data/data_0.csv
//! ```
//!
//! Paths are built from identifiers only, never from user-facing names.

use std::path::{Path, PathBuf};

pub const GLOBAL_METADATA_FILE: &str = "global_metadata.json";
pub const DATABASE_METADATA_FILE: &str = "db_metadata.json";
pub const TABLE_METADATA_FILE: &str = "table_metadata.json";
pub const DATA_DIR: &str = "data";

const DATA_FILE_PREFIX: &str = "data_";
const DATA_FILE_EXTENSION: &str = ".csv";

#[derive(Debug, Clone)]
pub struct Layout {
    base: PathBuf,
}

impl Layout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    pub fn global_metadata(&self) -> PathBuf {
        self.base.join(GLOBAL_METADATA_FILE)
    }

    pub fn database_dir(&self, db_uid: &str) -> PathBuf {
        self.base.join(format!("db_{}", db_uid))
    }

    pub fn database_metadata(&self, db_uid: &str) -> PathBuf {
        self.database_dir(db_uid).join(DATABASE_METADATA_FILE)
    }

    pub fn table_dir(&self, db_uid: &str, table_uid: &str) -> PathBuf {
        self.database_dir(db_uid).join(format!("table_{}", table_uid))
    }

    pub fn table_metadata(&self, db_uid: &str, table_uid: &str) -> PathBuf {
        self.table_dir(db_uid, table_uid).join(TABLE_METADATA_FILE)
    }

    pub fn data_dir(&self, db_uid: &str, table_uid: &str) -> PathBuf {
        self.table_dir(db_uid, table_uid).join(DATA_DIR)
    }

    pub fn data_file(&self, db_uid: &str, table_uid: &str, index: u64) -> PathBuf {
        self.data_dir(db_uid, table_uid).join(data_file_name(index))
    }
}

/// `data_<index>.csv`
pub fn data_file_name(index: u64) -> String {
    format!("{}{}{}", DATA_FILE_PREFIX, index, DATA_FILE_EXTENSION)
}

/// Inverse of [`data_file_name`]
pub fn parse_data_file_index(name: &str) -> Option<u64> {
    name.strip_prefix(DATA_FILE_PREFIX)?
        .strip_suffix(DATA_FILE_EXTENSION)?
        .parse()
        .ok()
}
