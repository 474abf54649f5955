//! Flat-file storage engine
//!
//! Databases and tables are directories keyed by generated identifiers;
//! table rows live in append-only CSV files that roll over once they hold
//! `max_rows_per_file` rows. The global catalog is kept in memory and
//! rewritten on every mutation.
//!
//! # Concurrency
//!
//! One engine instance is the only writer for its base directory. There is
//! no file locking and no coordination between processes or threads; share
//! an engine across threads only behind an external `Mutex`, and never open
//! two engines on the same directory.

use crate::catalog::{
    DatabaseEntry, DatabaseMetadata, DatabaseTableEntry, GlobalMetadata, JsonMetadataStore,
    MetadataStore, TableEntry, TableMetadata, METADATA_VERSION,
};
use crate::config::StorageConfig;
use crate::error::StorageError;
use crate::storage::data_file;
use crate::storage::layout::{data_file_name, parse_data_file_index, Layout};
use crate::storage::scan::TableScan;
use crate::types::{ColumnSpec, Row};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use uuid::Uuid;

type Result<T> = std::result::Result<T, StorageError>;

pub struct StorageEngine<S: MetadataStore = JsonMetadataStore> {
    layout: Layout,
    config: StorageConfig,
    store: S,
    metadata: GlobalMetadata,
}

impl StorageEngine<JsonMetadataStore> {
    /// Open (or initialize) `base` with default storage settings
    pub fn open<P: AsRef<Path>>(base: P) -> Result<Self> {
        Self::with_config(base, StorageConfig::default())
    }

    pub fn with_config<P: AsRef<Path>>(base: P, config: StorageConfig) -> Result<Self> {
        let layout = Layout::new(base.as_ref());
        let store = JsonMetadataStore::new(layout.clone());
        Self::with_store(layout, config, store)
    }
}

impl<S: MetadataStore> StorageEngine<S> {
    /// Ensure the base directory and global metadata exist, then load it
    pub fn with_store(layout: Layout, config: StorageConfig, store: S) -> Result<Self> {
        fs::create_dir_all(layout.base())?;

        if !store.global_exists() {
            store.save_global(&GlobalMetadata::new())?;
            log::info!("Initialized storage at {}", layout.base().display());
        }
        let metadata = store.load_global()?;
        log::debug!(
            "Loaded global metadata: {} database(s)",
            metadata.databases.len()
        );

        Ok(Self {
            layout,
            config,
            store,
            metadata,
        })
    }

    pub fn base_path(&self) -> &Path {
        self.layout.base()
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub fn global_metadata(&self) -> &GlobalMetadata {
        &self.metadata
    }

    fn persist_global(&self) -> Result<()> {
        self.store.save_global(&self.metadata)
    }

    fn database_entry(&self, database: &str) -> Result<&DatabaseEntry> {
        self.metadata
            .databases
            .get(database)
            .ok_or_else(|| StorageError::DatabaseNotFound(database.to_string()))
    }

    /// (database uid, table uid)
    fn resolve(&self, database: &str, table: &str) -> Result<(String, String)> {
        let entry = self.database_entry(database)?;
        let table_entry = entry.tables.get(table).ok_or_else(|| StorageError::TableNotFound {
            database: database.to_string(),
            table: table.to_string(),
        })?;
        Ok((entry.uid.clone(), table_entry.uid.clone()))
    }

    // ==================== Databases ====================

    /// Returns the new database's identifier
    pub fn create_database(&mut self, name: &str) -> Result<String> {
        if name.is_empty() {
            return Err(StorageError::InvalidArgument("Database name must not be empty".into()));
        }
        if self.metadata.databases.contains_key(name) {
            return Err(StorageError::DatabaseExists(name.to_string()));
        }

        let uid = Uuid::new_v4().to_string();
        let now = Utc::now();

        fs::create_dir_all(self.layout.database_dir(&uid))?;
        self.store.save_database(&uid, &DatabaseMetadata::new(name, now))?;

        self.metadata.databases.insert(
            name.to_string(),
            DatabaseEntry {
                uid: uid.clone(),
                created_at: now,
                last_modified: now,
                tables: BTreeMap::new(),
            },
        );
        self.metadata.touch(now);
        self.persist_global()?;

        log::info!("Created database '{}' ({})", name, uid);
        Ok(uid)
    }

    pub fn delete_database(&mut self, name: &str) -> Result<()> {
        let uid = self.database_entry(name)?.uid.clone();

        remove_tree(&self.layout.database_dir(&uid))?;

        self.metadata.databases.remove(name);
        self.metadata.touch(Utc::now());
        self.persist_global()?;

        log::info!("Deleted database '{}' ({})", name, uid);
        Ok(())
    }

    // ==================== Tables ====================

    /// Returns the new table's identifier
    pub fn create_table(
        &mut self,
        database: &str,
        table: &str,
        columns: &[ColumnSpec],
    ) -> Result<String> {
        let db_uid = {
            let entry = self.database_entry(database)?;
            if entry.tables.contains_key(table) {
                return Err(StorageError::TableExists {
                    database: database.to_string(),
                    table: table.to_string(),
                });
            }
            entry.uid.clone()
        };
        validate_columns(table, columns)?;

        let uid = Uuid::new_v4().to_string();
        let now = Utc::now();
        let max_rows_per_file = self.config.max_rows_per_file(columns);

        fs::create_dir_all(self.layout.data_dir(&db_uid, &uid))?;
        File::create(self.layout.data_file(&db_uid, &uid, 0))?;

        let table_meta = TableMetadata {
            version: METADATA_VERSION.to_string(),
            name: table.to_string(),
            created_at: now,
            last_modified: now,
            columns: columns.to_vec(),
            max_file_size_bytes: self.config.max_file_size_bytes,
            max_rows_per_file,
            latest_data_file: data_file_name(0),
        };
        self.store.save_table(&db_uid, &uid, &table_meta)?;

        let mut db_meta = self.store.load_database(&db_uid)?;
        db_meta.tables.insert(
            table.to_string(),
            DatabaseTableEntry {
                uid: uid.clone(),
                name: table.to_string(),
                created_at: now,
                last_modified: now,
            },
        );
        db_meta.last_modified = now;
        self.store.save_database(&db_uid, &db_meta)?;

        if let Some(entry) = self.metadata.databases.get_mut(database) {
            entry.tables.insert(
                table.to_string(),
                TableEntry {
                    uid: uid.clone(),
                    created_at: now,
                    last_modified: now,
                },
            );
            entry.last_modified = now;
        }
        self.metadata.touch(now);
        self.persist_global()?;

        log::info!(
            "Created table '{}.{}' ({}), {} rows per data file",
            database,
            table,
            uid,
            max_rows_per_file
        );
        Ok(uid)
    }

    pub fn delete_table(&mut self, database: &str, table: &str) -> Result<()> {
        let (db_uid, table_uid) = self.resolve(database, table)?;

        remove_tree(&self.layout.table_dir(&db_uid, &table_uid))?;

        let now = Utc::now();
        let mut db_meta = self.store.load_database(&db_uid)?;
        db_meta.tables.remove(table);
        db_meta.last_modified = now;
        self.store.save_database(&db_uid, &db_meta)?;

        if let Some(entry) = self.metadata.databases.get_mut(database) {
            entry.tables.remove(table);
            entry.last_modified = now;
        }
        self.metadata.touch(now);
        self.persist_global()?;

        log::info!("Deleted table '{}.{}' ({})", database, table, table_uid);
        Ok(())
    }

    // ==================== Rows ====================

    /// Append `rows` in order, rolling over to a new data file whenever the
    /// current one is full. Returns the number of rows written.
    ///
    /// Every key of every row must be a declared column; declared columns a
    /// row omits are stored empty and read back as NULL.
    pub fn append_rows(&self, database: &str, table: &str, rows: &[Row]) -> Result<usize> {
        let (db_uid, table_uid) = self.resolve(database, table)?;
        let mut meta = self.store.load_table(&db_uid, &table_uid)?;

        for row in rows {
            if let Some(unknown) = row.keys().find(|k| meta.column(k).is_none()) {
                return Err(StorageError::InvalidArgument(format!(
                    "Unknown column '{}' for table '{}'",
                    unknown, table
                )));
            }
        }
        if rows.is_empty() {
            return Ok(0);
        }

        let max_rows = meta.max_rows_per_file.max(1);
        let mut index = parse_data_file_index(&meta.latest_data_file).ok_or_else(|| {
            StorageError::InvalidArgument(format!(
                "Malformed latest data file '{}' for table '{}'",
                meta.latest_data_file, table
            ))
        })?;
        let mut path = self.layout.data_file(&db_uid, &table_uid, index);
        let mut in_file = data_file::count_rows(&path)?;

        let mut remaining = rows;
        while !remaining.is_empty() {
            if in_file >= max_rows {
                index += 1;
                path = self.layout.data_file(&db_uid, &table_uid, index);
                in_file = 0;
                log::debug!("Table '{}' rolled over to {}", table, data_file_name(index));
            }

            let room = (max_rows - in_file).min(remaining.len() as u64) as usize;
            let (chunk, rest) = remaining.split_at(room);
            data_file::append_rows(&path, &meta.columns, chunk)?;

            in_file += chunk.len() as u64;
            remaining = rest;
        }

        meta.latest_data_file = data_file_name(index);
        meta.last_modified = Utc::now();
        self.store.save_table(&db_uid, &table_uid, &meta)?;

        log::debug!("Appended {} row(s) to '{}.{}'", rows.len(), database, table);
        Ok(rows.len())
    }

    /// Lazily read every row of `table` in batches of up to `batch_size`
    ///
    /// Each call starts a fresh pass over the data files.
    pub fn scan_table(&self, database: &str, table: &str, batch_size: usize) -> Result<TableScan> {
        if batch_size == 0 {
            return Err(StorageError::InvalidArgument("Batch size must be at least 1".into()));
        }

        let (db_uid, table_uid) = self.resolve(database, table)?;
        let meta = self.store.load_table(&db_uid, &table_uid)?;
        let files = data_file::list_data_files(&self.layout.data_dir(&db_uid, &table_uid))?;

        Ok(TableScan::new(files, &meta.columns, batch_size))
    }

    // ==================== Introspection ====================

    /// Database names, sorted
    pub fn list_databases(&self) -> Vec<String> {
        self.metadata.databases.keys().cloned().collect()
    }

    /// Table names of `database`, sorted
    pub fn list_tables(&self, database: &str) -> Result<Vec<String>> {
        Ok(self.database_entry(database)?.tables.keys().cloned().collect())
    }

    pub fn table_metadata(&self, database: &str, table: &str) -> Result<TableMetadata> {
        let (db_uid, table_uid) = self.resolve(database, table)?;
        self.store.load_table(&db_uid, &table_uid)
    }

    pub fn database_uid(&self, database: &str) -> Option<&str> {
        self.metadata.databases.get(database).map(|e| e.uid.as_str())
    }

    pub fn has_database(&self, database: &str) -> bool {
        self.metadata.databases.contains_key(database)
    }
}

fn validate_columns(table: &str, columns: &[ColumnSpec]) -> Result<()> {
    if columns.is_empty() {
        return Err(StorageError::InvalidArgument(format!(
            "Table '{}' must declare at least one column",
            table
        )));
    }

    let mut seen = HashSet::new();
    for column in columns {
        if !seen.insert(column.name.as_str()) {
            return Err(StorageError::InvalidArgument(format!(
                "Duplicate column '{}' in table '{}'",
                column.name, table
            )));
        }
    }
    Ok(())
}

/// Remove a directory tree; already gone is fine
fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Directory {} was already missing", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Batch, Value};
    use tempfile::TempDir;

    fn user_columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("id", "INTEGER").primary_key(),
            ColumnSpec::new("name", "VARCHAR(20)"),
            ColumnSpec::new("age", "INTEGER"),
            ColumnSpec::new("email", "VARCHAR(50)"),
        ]
    }

    fn user(id: i64) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::Integer(id));
        row.insert("name".into(), Value::Text(format!("user{}", id)));
        row.insert("age".into(), Value::Integer(20 + id));
        row.insert("email".into(), Value::Text(format!("u{}@example.com", id)));
        row
    }

    fn small_files(max_file_size_bytes: u64) -> StorageConfig {
        StorageConfig {
            max_file_size_bytes,
            ..StorageConfig::default()
        }
    }

    fn engine_with_table(dir: &TempDir, config: StorageConfig) -> StorageEngine {
        let mut engine = StorageEngine::with_config(dir.path(), config).unwrap();
        engine.create_database("shop").unwrap();
        engine.create_table("shop", "users", &user_columns()).unwrap();
        engine
    }

    fn collect(engine: &StorageEngine, batch_size: usize) -> Vec<Batch> {
        engine
            .scan_table("shop", "users", batch_size)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn data_files(engine: &StorageEngine) -> Vec<String> {
        let db_uid = engine.database_uid("shop").unwrap().to_string();
        let table_uid = engine.global_metadata().databases["shop"].tables["users"].uid.clone();
        let dir = engine.layout.data_dir(&db_uid, &table_uid);
        data_file::list_data_files(&dir)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_initializes_empty_directory() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path().join("nested")).unwrap();

        assert!(dir.path().join("nested/global_metadata.json").exists());
        assert!(engine.list_databases().is_empty());
    }

    #[test]
    fn test_reopen_sees_existing_catalog() {
        let dir = TempDir::new().unwrap();
        {
            engine_with_table(&dir, StorageConfig::default());
        }
        let engine = StorageEngine::open(dir.path()).unwrap();
        assert_eq!(engine.list_databases(), vec!["shop"]);
        assert_eq!(engine.list_tables("shop").unwrap(), vec!["users"]);
    }

    #[test]
    fn test_corrupt_global_metadata() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("global_metadata.json"), "[1, 2").unwrap();

        let err = StorageEngine::open(dir.path()).err().unwrap();
        assert!(matches!(err, StorageError::CorruptMetadata { .. }));
    }

    #[test]
    fn test_create_table_layout() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_table(&dir, StorageConfig::default());

        let db_uid = engine.database_uid("shop").unwrap();
        let db_dir = dir.path().join(format!("db_{}", db_uid));
        assert!(db_dir.join("db_metadata.json").exists());

        let meta = engine.table_metadata("shop", "users").unwrap();
        assert_eq!(meta.latest_data_file, "data_0.csv");
        assert_eq!(meta.columns, user_columns());
        assert_eq!(data_files(&engine), vec!["data_0.csv"]);

        let db_meta: DatabaseMetadata =
            serde_json::from_slice(&fs::read(db_dir.join("db_metadata.json")).unwrap()).unwrap();
        assert!(db_meta.tables.contains_key("users"));
    }

    #[test]
    fn test_duplicate_database() {
        let dir = TempDir::new().unwrap();
        let mut engine = StorageEngine::open(dir.path()).unwrap();
        engine.create_database("shop").unwrap();
        let before = fs::read_dir(dir.path()).unwrap().count();

        let err = engine.create_database("shop").unwrap_err();
        assert_eq!(err.to_string(), "Database 'shop' already exists");
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), before);
    }

    #[test]
    fn test_duplicate_table_leaves_disk_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with_table(&dir, StorageConfig::default());
        let db_dir = dir.path().join(format!("db_{}", engine.database_uid("shop").unwrap()));
        let before = fs::read_dir(&db_dir).unwrap().count();

        let err = engine.create_table("shop", "users", &user_columns()).unwrap_err();
        assert!(matches!(err, StorageError::TableExists { .. }));
        assert_eq!(fs::read_dir(&db_dir).unwrap().count(), before);
    }

    #[test]
    fn test_unknown_database_names_it() {
        let dir = TempDir::new().unwrap();
        let mut engine = StorageEngine::open(dir.path()).unwrap();

        let err = engine.create_table("nowhere", "t", &user_columns()).unwrap_err();
        assert!(matches!(err, StorageError::DatabaseNotFound(_)));
        assert!(err.to_string().contains("nowhere"));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_invalid_columns_rejected() {
        let dir = TempDir::new().unwrap();
        let mut engine = StorageEngine::open(dir.path()).unwrap();
        engine.create_database("shop").unwrap();

        assert!(engine.create_table("shop", "t", &[]).is_err());
        let dup = vec![ColumnSpec::new("a", "INTEGER"), ColumnSpec::new("a", "INTEGER")];
        assert!(matches!(
            engine.create_table("shop", "t", &dup),
            Err(StorageError::InvalidArgument(_))
        ));
        assert!(engine.list_tables("shop").unwrap().is_empty());
    }

    #[test]
    fn test_oversized_declared_lengths() {
        let dir = TempDir::new().unwrap();
        let mut engine = StorageEngine::open(dir.path()).unwrap();
        engine.create_database("shop").unwrap();

        let columns: Vec<ColumnSpec> = ["a", "b", "c"]
            .iter()
            .map(|name| ColumnSpec::new(*name, "varchar(9223372036854775807)"))
            .collect();
        engine.create_table("shop", "wide", &columns).unwrap();
        assert_eq!(engine.table_metadata("shop", "wide").unwrap().max_rows_per_file, 1);
    }

    #[test]
    fn test_round_trip_with_coercion() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_table(&dir, StorageConfig::default());
        let rows: Vec<Row> = (1..=5).map(user).collect();

        assert_eq!(engine.append_rows("shop", "users", &rows).unwrap(), 5);

        for batch_size in [1, 2, 5, 100] {
            let scanned: Vec<Row> = collect(&engine, batch_size).into_iter().flatten().collect();
            assert_eq!(scanned, rows, "batch size {}", batch_size);
        }
    }

    #[test]
    fn test_batches_of_two_over_five_rows() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_table(&dir, StorageConfig::default());
        engine.append_rows("shop", "users", &(1..=5).map(user).collect::<Vec<_>>()).unwrap();

        let sizes: Vec<usize> = collect(&engine, 2).iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_scan_is_repeatable() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_table(&dir, small_files(78 * 2));
        engine.append_rows("shop", "users", &(1..=7).map(user).collect::<Vec<_>>()).unwrap();

        assert_eq!(collect(&engine, 3), collect(&engine, 3));
    }

    #[test]
    fn test_rollover_file_count() {
        let dir = TempDir::new().unwrap();
        // 78-byte rows, 3 per file
        let engine = engine_with_table(&dir, small_files(78 * 3 + 10));
        assert_eq!(engine.table_metadata("shop", "users").unwrap().max_rows_per_file, 3);

        engine.append_rows("shop", "users", &(1..=4).map(user).collect::<Vec<_>>()).unwrap();
        engine.append_rows("shop", "users", &(5..=8).map(user).collect::<Vec<_>>()).unwrap();

        // ceil(8 / 3) files
        assert_eq!(data_files(&engine), vec!["data_0.csv", "data_1.csv", "data_2.csv"]);
        let meta = engine.table_metadata("shop", "users").unwrap();
        assert_eq!(meta.latest_data_file, "data_2.csv");

        let ids: Vec<Value> = collect(&engine, 10)
            .into_iter()
            .flatten()
            .map(|r| r["id"].clone())
            .collect();
        assert_eq!(ids, (1..=8).map(Value::Integer).collect::<Vec<_>>());
    }

    #[test]
    fn test_one_more_than_capacity_makes_two_files() {
        let dir = TempDir::new().unwrap();
        let max_file_size = 1000;
        let engine = engine_with_table(&dir, small_files(max_file_size));
        let per_file = engine.table_metadata("shop", "users").unwrap().max_rows_per_file;
        assert_eq!(per_file, max_file_size / 78);

        let rows: Vec<Row> = (0..per_file as i64 + 1).map(user).collect();
        engine.append_rows("shop", "users", &rows).unwrap();

        assert_eq!(data_files(&engine).len(), 2);
    }

    #[test]
    fn test_append_rejects_unknown_columns() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_table(&dir, StorageConfig::default());
        let mut row = user(1);
        row.insert("nickname".into(), Value::Text("x".into()));

        let err = engine.append_rows("shop", "users", &[user(2), row]).unwrap_err();
        assert!(err.to_string().contains("nickname"));
        assert!(collect(&engine, 10).is_empty());
    }

    #[test]
    fn test_omitted_columns_read_back_null() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_table(&dir, StorageConfig::default());
        let mut row = Row::new();
        row.insert("id".into(), Value::Integer(1));

        engine.append_rows("shop", "users", &[row]).unwrap();
        let scanned = collect(&engine, 1).remove(0).remove(0);
        assert_eq!(scanned["id"], Value::Integer(1));
        assert_eq!(scanned["email"], Value::Null);
    }

    #[test]
    fn test_zero_batch_size() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_table(&dir, StorageConfig::default());
        assert!(matches!(
            engine.scan_table("shop", "users", 0),
            Err(StorageError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_delete_table() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with_table(&dir, StorageConfig::default());
        let db_dir = dir.path().join(format!("db_{}", engine.database_uid("shop").unwrap()));

        engine.delete_table("shop", "users").unwrap();

        assert!(engine.list_tables("shop").unwrap().is_empty());
        assert_eq!(fs::read_dir(&db_dir).unwrap().count(), 1);
        assert!(matches!(
            engine.scan_table("shop", "users", 1),
            Err(StorageError::TableNotFound { .. })
        ));
        assert!(engine.delete_table("shop", "users").is_err());

        // Name is free again
        engine.create_table("shop", "users", &user_columns()).unwrap();
    }

    #[test]
    fn test_delete_database() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_with_table(&dir, StorageConfig::default());
        let db_dir = dir.path().join(format!("db_{}", engine.database_uid("shop").unwrap()));

        engine.delete_database("shop").unwrap();
        assert!(!db_dir.exists());
        assert!(engine.list_databases().is_empty());

        let reopened = StorageEngine::open(dir.path()).unwrap();
        assert!(reopened.list_databases().is_empty());
        assert!(matches!(
            engine.delete_database("shop"),
            Err(StorageError::DatabaseNotFound(_))
        ));
    }

    #[test]
    fn test_malformed_values_are_kept() {
        let dir = TempDir::new().unwrap();
        let engine = engine_with_table(&dir, StorageConfig::default());
        let mut row = user(1);
        row.insert("age".into(), Value::Text("unknown".into()));

        engine.append_rows("shop", "users", &[row]).unwrap();
        let scanned = collect(&engine, 1).remove(0).remove(0);
        assert_eq!(scanned["age"], Value::Text("unknown".into()));
    }
}
