//! Error types for flatdb
//!
//! Each subsystem owns one error enum; `DbError` wraps them for callers
//! that cross subsystem boundaries (executor, session, CLI).

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DbError>;

/// Lexing and parsing failures. The first error aborts the parse.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unterminated string at line {line}, column {column}")]
    UnterminatedString { line: usize, column: usize },

    #[error("Unterminated comment at line {line}, column {column}")]
    UnterminatedComment { line: usize, column: usize },

    #[error("Illegal character '{ch}' at line {line}, column {column}")]
    IllegalCharacter { ch: char, line: usize, column: usize },

    #[error("Syntax error at '{value}' at line {line}, column {column}")]
    UnexpectedToken {
        value: String,
        line: usize,
        column: usize,
    },

    #[error("Syntax error: unexpected end of input")]
    UnexpectedEof,

    #[error("Empty SQL statement")]
    EmptyInput,
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Database '{0}' already exists")]
    DatabaseExists(String),

    #[error("Database '{0}' not found")]
    DatabaseNotFound(String),

    #[error("Table '{table}' already exists in database '{database}'")]
    TableExists { database: String, table: String },

    #[error("Table '{table}' not found in database '{database}'")]
    TableNotFound { database: String, table: String },

    #[error("Global metadata file not found: {0}")]
    MetadataNotFound(PathBuf),

    #[error("Invalid global metadata format in {path}: {source}")]
    CorruptMetadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Data file error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Data type error: {0}")]
    DataType(String),

    #[error("Column not found: {0}")]
    UnknownColumn(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutorError {
    #[error("Not supported: {0}")]
    Unsupported(String),

    #[error("Evaluation error: {0}")]
    Evaluation(String),

    #[error("No database selected")]
    NoDatabaseSelected,
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        DbError::Storage(StorageError::Io(err))
    }
}
