//! Persisted catalog records
//!
//! Three JSON documents describe the catalog: one global record listing
//! every database and table, one record per database, and one per table.
//! Field names are part of the on-disk format.

use crate::types::ColumnSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const METADATA_VERSION: &str = "1.0";

/// `global_metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalMetadata {
    pub version: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Database name -> entry
    #[serde(default)]
    pub databases: BTreeMap<String, DatabaseEntry>,
}

impl GlobalMetadata {
    pub fn new() -> Self {
        Self {
            version: METADATA_VERSION.to_string(),
            created_at: Utc::now(),
            last_modified: None,
            databases: BTreeMap::new(),
        }
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_modified = Some(at);
    }
}

impl Default for GlobalMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// A database as seen from the global record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseEntry {
    pub uid: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Table name -> entry
    #[serde(default)]
    pub tables: BTreeMap<String, TableEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableEntry {
    pub uid: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// `db_metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseMetadata {
    pub version: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub tables: BTreeMap<String, DatabaseTableEntry>,
    /// Reserved; always empty
    #[serde(default)]
    pub views: BTreeMap<String, serde_json::Value>,
}

impl DatabaseMetadata {
    pub fn new(name: &str, at: DateTime<Utc>) -> Self {
        Self {
            version: METADATA_VERSION.to_string(),
            name: name.to_string(),
            created_at: at,
            last_modified: at,
            tables: BTreeMap::new(),
            views: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseTableEntry {
    pub uid: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

/// `table_metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableMetadata {
    pub version: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub columns: Vec<ColumnSpec>,
    pub max_file_size_bytes: u64,
    pub max_rows_per_file: u64,
    /// File name (not path) of the data file currently receiving appends
    pub latest_data_file: String,
}

impl TableMetadata {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
