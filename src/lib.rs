//! flatdb
//!
//! Minimal single-node database: a SQL front end and a flat-file storage
//! engine.
//!
//! ## Architecture
//! - SQL layer: Lexer → recursive-descent parser → AST (+ visitor, evaluator)
//! - Catalog: JSON metadata records for databases and tables
//! - Storage layer: append-only CSV data files with row-count rollover
//! - Query layer: batched scan → filter → project → sink pipeline
//! - Session: executes parsed statements against one engine
//!
//! ```no_run
//! use flatdb::{Session, DbConfig};
//!
//! # fn main() -> flatdb::Result<()> {
//! let mut session = Session::open("./flatdb_data", &DbConfig::default())?;
//! session.execute_sql("CREATE DATABASE shop")?;
//! session.use_database("shop")?;
//! session.execute_sql("CREATE TABLE users (id INTEGER, name VARCHAR(20))")?;
//! session.execute_sql("INSERT INTO users VALUES (1, 'Alice')")?;
//! let result = session.execute_sql("SELECT * FROM users WHERE id = 1")?;
//! assert_eq!(result.row_count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod types;
pub mod sql;
pub mod catalog;
pub mod storage;
pub mod query;
pub mod session;

mod error;

pub use config::{DbConfig, DiagnosticsConfig, LoggingConfig, StorageConfig};
pub use error::{DbError, ExecutorError, ParseError, Result, StorageError, ValidationError};
pub use logging::init_logging;
pub use types::{Batch, ColumnKind, ColumnSpec, Row, Value};

pub use sql::{parse, SqlParser, Statement};
pub use storage::StorageEngine;
pub use session::{QueryResult, Session};
