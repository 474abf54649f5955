//! Database configuration
//!
//! Storage limits, row-size estimates, logging and diagnostics settings.
//! Everything has a default; a TOML file may override any subset.

use crate::types::{ColumnKind, ColumnSpec};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default maximum data file size (100MB)
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 100 * 1024 * 1024;

/// Default scan batch size
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Default log file name used when file logging is enabled
pub const DEFAULT_LOG_FILE: &str = "flatdb.log";

/// Per-type byte estimates used to size rows
///
/// Parameterized VARCHAR/CHAR columns use their declared length; the
/// `VARCHAR` and `CHAR` entries apply only when no length is given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", default)]
pub struct TypeSizes {
    pub varchar: u64,
    pub char: u64,
    pub integer: u64,
    pub bigint: u64,
    pub float: u64,
    pub double: u64,
    pub boolean: u64,
    pub date: u64,
    pub timestamp: u64,
    /// Unrecognized types
    pub fallback: u64,
}

impl Default for TypeSizes {
    fn default() -> Self {
        Self {
            varchar: 255,
            char: 1,
            integer: 4,
            bigint: 8,
            float: 8,
            double: 8,
            boolean: 1,
            date: 8,
            timestamp: 8,
            fallback: 16,
        }
    }
}

impl TypeSizes {
    /// Estimated on-disk size of one value of this kind
    pub fn size_of(&self, kind: &ColumnKind) -> u64 {
        match kind {
            ColumnKind::Varchar(len) => len.unwrap_or(self.varchar),
            ColumnKind::Char(len) => len.unwrap_or(self.char),
            ColumnKind::Integer => self.integer,
            ColumnKind::Bigint => self.bigint,
            ColumnKind::Float => self.float,
            ColumnKind::Double => self.double,
            ColumnKind::Boolean => self.boolean,
            ColumnKind::Date => self.date,
            ColumnKind::Timestamp => self.timestamp,
            ColumnKind::Other(_) => self.fallback,
        }
    }
}

/// Storage engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Upper bound used to derive rows per data file
    pub max_file_size_bytes: u64,

    /// Default scan batch size
    pub batch_size: usize,

    pub type_sizes: TypeSizes,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            batch_size: DEFAULT_BATCH_SIZE,
            type_sizes: TypeSizes::default(),
        }
    }
}

impl StorageConfig {
    /// Sum of per-type estimates over all columns, saturating at
    /// `u64::MAX` and never below 1
    pub fn max_row_size(&self, columns: &[ColumnSpec]) -> u64 {
        columns
            .iter()
            .map(|c| self.type_sizes.size_of(&c.kind()))
            .fold(0u64, u64::saturating_add)
            .max(1)
    }

    /// Rows that fit in one data file, never below 1
    pub fn max_rows_per_file(&self, columns: &[ColumnSpec]) -> u64 {
        (self.max_file_size_bytes / self.max_row_size(columns)).max(1)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter (`error`, `warn`, `info`, `debug`, `trace`); `RUST_LOG` wins
    pub level: String,

    /// Write to `file_path` instead of stderr
    pub log_to_file: bool,

    pub file_path: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_to_file: false,
            file_path: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}

/// Parse-tree diagnostics output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Directory receiving per-run parse-tree dumps; `None` disables them
    pub parse_tree_dir: Option<PathBuf>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub diagnostics: DiagnosticsConfig,
}

impl DbConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: DbConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use defaults
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) if p.exists() => Self::from_file(p),
            Some(p) => {
                log::debug!("Config file {} not found, using defaults", p.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.storage.batch_size == 0 {
            anyhow::bail!("storage.batch_size must be at least 1");
        }
        if self.storage.max_file_size_bytes == 0 {
            anyhow::bail!("storage.max_file_size_bytes must be at least 1");
        }
        Ok(())
    }

    /// Small files and batches so tests exercise rollover
    pub fn for_testing() -> Self {
        Self {
            storage: StorageConfig {
                max_file_size_bytes: 1024,
                batch_size: 2,
                ..Default::default()
            },
            logging: LoggingConfig {
                level: "debug".to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
