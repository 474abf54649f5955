//! Statement execution against a storage engine
//!
//! A `Session` owns one engine and remembers the current database.
//! Tables are append-only, so UPDATE and DELETE are rejected, and so are
//! the SELECT features that need more than a single streaming pass
//! (GROUP BY, HAVING, ORDER BY, aggregates).

use crate::catalog::{JsonMetadataStore, MetadataStore, TableMetadata};
use crate::config::DbConfig;
use crate::error::{ExecutorError, Result, StorageError, ValidationError};
use crate::query::{Executor, OutputSink, TupleSink};
use crate::sql::ast::{
    CreateTableStmt, Expr, FunctionCall, InsertStmt, SelectStmt, Statement,
};
use crate::sql::visitor::Visitor;
use crate::sql::{evaluate, generate_run_id, referenced_columns, ParseTreeWriter, SqlParser};
use crate::storage::StorageEngine;
use crate::types::{ColumnSpec, Row, Value};
use std::path::Path;

/// Statement outcome
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// SELECT result
    Select {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },

    /// INSERT result
    Modification { affected_rows: usize },

    /// CREATE/DROP result
    Definition { message: String },
}

impl QueryResult {
    pub fn affected_rows(&self) -> usize {
        match self {
            QueryResult::Modification { affected_rows } => *affected_rows,
            _ => 0,
        }
    }

    /// Columns and rows of a SELECT result
    pub fn select_rows(&self) -> Option<(&[String], &[Vec<Value>])> {
        match self {
            QueryResult::Select { columns, rows } => Some((columns.as_slice(), rows.as_slice())),
            _ => None,
        }
    }

    pub fn row_count(&self) -> usize {
        match self {
            QueryResult::Select { rows, .. } => rows.len(),
            QueryResult::Modification { affected_rows } => *affected_rows,
            QueryResult::Definition { .. } => 0,
        }
    }
}

pub struct Session<S: MetadataStore = JsonMetadataStore> {
    engine: StorageEngine<S>,
    parser: SqlParser,
    current_database: Option<String>,
    batch_size: usize,
}

impl Session<JsonMetadataStore> {
    /// Open the engine at `data_dir` with `config`'s storage and diagnostics settings
    pub fn open<P: AsRef<Path>>(data_dir: P, config: &DbConfig) -> Result<Self> {
        let engine = StorageEngine::with_config(data_dir, config.storage.clone())?;

        let mut parser = SqlParser::new();
        if let Some(dir) = &config.diagnostics.parse_tree_dir {
            let writer = ParseTreeWriter::new(dir, generate_run_id());
            log::info!("Writing parse trees to {}", writer.run_dir().display());
            parser = parser.with_parse_tree_writer(writer);
        }

        Ok(Session::new(engine).with_parser(parser))
    }
}

impl<S: MetadataStore> Session<S> {
    pub fn new(engine: StorageEngine<S>) -> Self {
        let batch_size = engine.config().batch_size.max(1);
        Self {
            engine,
            parser: SqlParser::new(),
            current_database: None,
            batch_size,
        }
    }

    pub fn with_parser(mut self, parser: SqlParser) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn engine(&self) -> &StorageEngine<S> {
        &self.engine
    }

    pub fn current_database(&self) -> Option<&str> {
        self.current_database.as_deref()
    }

    pub fn use_database(&mut self, name: &str) -> Result<()> {
        if !self.engine.has_database(name) {
            return Err(StorageError::DatabaseNotFound(name.to_string()).into());
        }
        self.current_database = Some(name.to_string());
        Ok(())
    }

    /// Parse and execute one statement
    pub fn execute_sql(&mut self, sql: &str) -> Result<QueryResult> {
        let statement = self.parser.parse(sql)?;
        self.execute(&statement)
    }

    pub fn execute(&mut self, statement: &Statement) -> Result<QueryResult> {
        log::debug!("Executing {}", statement.kind());

        match statement {
            Statement::CreateDatabase(stmt) => {
                self.engine.create_database(&stmt.name)?;
                Ok(definition(format!("Database '{}' created", stmt.name)))
            }
            Statement::DropDatabase(stmt) => {
                self.engine.delete_database(&stmt.name)?;
                if self.current_database.as_deref() == Some(stmt.name.as_str()) {
                    self.current_database = None;
                }
                Ok(definition(format!("Database '{}' dropped", stmt.name)))
            }
            Statement::CreateTable(stmt) => self.create_table(stmt),
            Statement::DropTable(stmt) => {
                let database = self.database()?;
                self.engine.delete_table(&database, &stmt.name)?;
                Ok(definition(format!("Table '{}' dropped", stmt.name)))
            }
            Statement::Insert(stmt) => self.insert(stmt),
            Statement::Select(stmt) => self.select(stmt),
            Statement::Update(_) | Statement::Delete(_) => Err(ExecutorError::Unsupported(
                format!("{}: tables are append-only", statement.kind()),
            )
            .into()),
        }
    }

    fn database(&self) -> Result<String> {
        self.current_database
            .clone()
            .ok_or_else(|| ExecutorError::NoDatabaseSelected.into())
    }

    fn create_table(&mut self, stmt: &CreateTableStmt) -> Result<QueryResult> {
        let database = self.database()?;
        let empty = Row::new();

        let mut columns = Vec::with_capacity(stmt.columns.len());
        for def in &stmt.columns {
            let mut spec = ColumnSpec::from(def);
            if let Some(expr) = &def.default_value {
                let value = evaluate(expr, &empty)?;
                spec.default = (!value.is_null()).then_some(value);
            }
            columns.push(spec);
        }

        self.engine.create_table(&database, &stmt.table, &columns)?;
        Ok(definition(format!("Table '{}' created", stmt.table)))
    }

    fn insert(&mut self, stmt: &InsertStmt) -> Result<QueryResult> {
        let database = self.database()?;
        let meta = self.engine.table_metadata(&database, &stmt.table)?;

        let targets = match &stmt.columns {
            Some(columns) => columns.clone(),
            None => meta.column_names(),
        };
        for (i, name) in targets.iter().enumerate() {
            if meta.column(name).is_none() {
                return Err(ValidationError::UnknownColumn(name.clone()).into());
            }
            if targets[..i].contains(name) {
                return Err(ValidationError::Schema(format!("Column '{}' listed twice", name)).into());
            }
        }

        let empty = Row::new();
        let mut rows = Vec::with_capacity(stmt.values.len());
        for values in &stmt.values {
            if values.len() != targets.len() {
                return Err(ValidationError::Schema(format!(
                    "INSERT has {} value(s) for {} column(s)",
                    values.len(),
                    targets.len()
                ))
                .into());
            }

            let mut row = Row::with_capacity(meta.columns.len());
            for (name, expr) in targets.iter().zip(values) {
                row.insert(name.clone(), evaluate(expr, &empty)?);
            }
            fill_defaults(&meta, &mut row)?;
            rows.push(row);
        }

        let affected_rows = self.engine.append_rows(&database, &stmt.table, &rows)?;
        Ok(QueryResult::Modification { affected_rows })
    }

    fn select(&mut self, stmt: &SelectStmt) -> Result<QueryResult> {
        if stmt.group_by.is_some() {
            return Err(ExecutorError::Unsupported("GROUP BY".into()).into());
        }
        if stmt.having.is_some() {
            return Err(ExecutorError::Unsupported("HAVING".into()).into());
        }
        if stmt.order_by.is_some() {
            return Err(ExecutorError::Unsupported("ORDER BY".into()).into());
        }
        if let Some(name) = stmt.columns.iter().find_map(first_aggregate) {
            return Err(ExecutorError::Unsupported(format!("aggregate function {}", name)).into());
        }

        let (columns, mut rows) = match &stmt.from {
            Some(table) => self.scan_select(stmt, &table.name)?,
            None => constant_select(stmt)?,
        };

        if stmt.distinct {
            let mut unique: Vec<Vec<Value>> = Vec::with_capacity(rows.len());
            for row in rows {
                if !unique.contains(&row) {
                    unique.push(row);
                }
            }
            rows = unique;
        }

        if let Some(limit) = stmt.limit {
            let offset = limit.offset.unwrap_or(0) as usize;
            rows = rows.into_iter().skip(offset).take(limit.count as usize).collect();
        }

        Ok(QueryResult::Select { columns, rows })
    }

    fn scan_select(&self, stmt: &SelectStmt, table: &str) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
        let database = self.database()?;
        let meta = self.engine.table_metadata(&database, table)?;

        if let Some(predicate) = &stmt.where_clause {
            for column in referenced_columns(predicate) {
                if meta.column(&column.name).is_none() {
                    return Err(ValidationError::UnknownColumn(column.to_string()).into());
                }
            }
        }

        let executor = Executor::new(&self.engine);
        let predicate = stmt.where_clause.as_ref();

        if let Some(names) = plain_columns(&stmt.columns, &meta)? {
            let rows = executor.run_pipeline(
                &database,
                table,
                self.batch_size,
                predicate,
                None,
                TupleSink::new(names.clone()),
            )?;
            return Ok((names, rows));
        }

        let rows = executor.run_pipeline(
            &database,
            table,
            self.batch_size,
            predicate,
            None,
            OutputSink::new(),
        )?;
        let names = stmt.columns.iter().map(output_name).collect();
        let tuples = rows
            .iter()
            .map(|row| stmt.columns.iter().map(|expr| evaluate(expr, row)).collect())
            .collect::<Result<Vec<Vec<Value>>>>()?;
        Ok((names, tuples))
    }
}

fn definition(message: String) -> QueryResult {
    log::info!("{}", message);
    QueryResult::Definition { message }
}

/// Apply column defaults and NOT NULL to an INSERT row
fn fill_defaults(meta: &TableMetadata, row: &mut Row) -> Result<()> {
    for column in &meta.columns {
        let value = row
            .entry(column.name.clone())
            .or_insert_with(|| column.default.clone().unwrap_or(Value::Null));
        if value.is_null() && !column.nullable {
            return Err(ValidationError::Schema(format!(
                "Column '{}' cannot be NULL",
                column.name
            ))
            .into());
        }
    }
    Ok(())
}

/// Column names when the select list is `*` or bare column references
fn plain_columns(columns: &[Expr], meta: &TableMetadata) -> Result<Option<Vec<String>>> {
    if columns.len() == 1 && columns[0].is_wildcard() {
        return Ok(Some(meta.column_names()));
    }

    let mut names = Vec::with_capacity(columns.len());
    for expr in columns {
        match expr {
            Expr::Column(column) if column.name == "*" => {
                return Err(ExecutorError::Unsupported("'*' mixed with other columns".into()).into());
            }
            Expr::Column(column) => {
                if meta.column(&column.name).is_none() {
                    return Err(ValidationError::UnknownColumn(column.to_string()).into());
                }
                names.push(column.name.clone());
            }
            _ => return Ok(None),
        }
    }
    Ok(Some(names))
}

/// SELECT without FROM: one row of constants
fn constant_select(stmt: &SelectStmt) -> Result<(Vec<String>, Vec<Vec<Value>>)> {
    let empty = Row::new();
    let row = stmt
        .columns
        .iter()
        .map(|expr| evaluate(expr, &empty))
        .collect::<Result<Vec<_>>>()?;
    let names = stmt.columns.iter().map(output_name).collect();

    let passes = match &stmt.where_clause {
        Some(predicate) => evaluate(predicate, &empty)?.is_truthy(),
        None => true,
    };
    Ok((names, if passes { vec![row] } else { Vec::new() }))
}

fn output_name(expr: &Expr) -> String {
    match expr {
        Expr::Column(column) => column.name.clone(),
        other => other.to_string(),
    }
}

#[derive(Default)]
struct AggregateFinder {
    found: Option<String>,
}

impl Visitor for AggregateFinder {
    fn visit_function_call(&mut self, call: &FunctionCall) {
        if call.is_aggregate() && self.found.is_none() {
            self.found = Some(call.name.to_uppercase());
        }
        for arg in &call.args {
            self.visit_expr(arg);
        }
    }
}

fn first_aggregate(expr: &Expr) -> Option<String> {
    let mut finder = AggregateFinder::default();
    finder.visit_expr(expr);
    finder.found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::error::DbError;
    use tempfile::TempDir;

    fn session(dir: &TempDir) -> Session {
        let config = StorageConfig {
            max_file_size_bytes: 200,
            ..StorageConfig::default()
        };
        let engine = StorageEngine::with_config(dir.path(), config).unwrap();
        let mut session = Session::new(engine).with_batch_size(2);
        session.execute_sql("CREATE DATABASE shop").unwrap();
        session.use_database("shop").unwrap();
        session
            .execute_sql(
                "CREATE TABLE items (id INTEGER PRIMARY KEY, name VARCHAR(20) NOT NULL, \
                 price FLOAT, qty INTEGER DEFAULT 1)",
            )
            .unwrap();
        session
    }

    fn rows(result: QueryResult) -> Vec<Vec<Value>> {
        match result {
            QueryResult::Select { rows, .. } => rows,
            other => panic!("Expected SELECT result, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_and_select_star() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);

        let result = session
            .execute_sql("INSERT INTO items VALUES (1, 'apple', 0.5, 3), (2, 'pear', 0.75, 1)")
            .unwrap();
        assert_eq!(result.affected_rows(), 2);

        let result = session.execute_sql("SELECT * FROM items").unwrap();
        let (columns, data) = result.select_rows().unwrap();
        assert_eq!(columns, ["id", "name", "price", "qty"]);
        assert_eq!(data.len(), 2);
        assert_eq!(
            data[1],
            vec![Value::Integer(2), Value::Text("pear".into()), Value::Float(0.75), Value::Integer(1)]
        );
    }

    #[test]
    fn test_defaults_and_column_list() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);

        session.execute_sql("INSERT INTO items (name, id) VALUES ('fig', 7)").unwrap();
        let data = rows(session.execute_sql("SELECT id, price, qty FROM items").unwrap());
        assert_eq!(data, vec![vec![Value::Integer(7), Value::Null, Value::Integer(1)]]);
    }

    #[test]
    fn test_not_null_enforced() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);

        let err = session.execute_sql("INSERT INTO items (id) VALUES (1)").unwrap_err();
        assert!(err.to_string().contains("cannot be NULL"));
    }

    #[test]
    fn test_where_limit_offset_distinct() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);
        for i in 1..=6 {
            let sql = format!("INSERT INTO items VALUES ({}, 'n{}', {}.5, {})", i, i, i, i % 2);
            session.execute_sql(&sql).unwrap();
        }

        let data = rows(
            session
                .execute_sql("SELECT id FROM items WHERE price > 2 AND name LIKE 'n%' LIMIT 2 OFFSET 1")
                .unwrap(),
        );
        assert_eq!(data, vec![vec![Value::Integer(3)], vec![Value::Integer(4)]]);

        let data = rows(session.execute_sql("SELECT DISTINCT qty FROM items").unwrap());
        assert_eq!(data, vec![vec![Value::Integer(1)], vec![Value::Integer(0)]]);
    }

    #[test]
    fn test_computed_columns() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);
        session.execute_sql("INSERT INTO items VALUES (1, 'kiwi', 2.0, 4)").unwrap();

        let result = session.execute_sql("SELECT upper(name), qty * 2 FROM items").unwrap();
        let (columns, data) = result.select_rows().unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(data[0], vec![Value::Text("KIWI".into()), Value::Integer(8)]);
    }

    #[test]
    fn test_select_without_from() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);
        let data = rows(session.execute_sql("SELECT 1 + 2").unwrap());
        assert_eq!(data, vec![vec![Value::Integer(3)]]);
    }

    #[test]
    fn test_unknown_where_column_on_empty_table() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);
        let err = session.execute_sql("SELECT * FROM items WHERE color = 'red'").unwrap_err();
        assert!(matches!(err, DbError::Validation(ValidationError::UnknownColumn(_))));
    }

    #[test]
    fn test_unsupported_statements() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);

        for sql in [
            "UPDATE items SET qty = 2",
            "DELETE FROM items",
            "SELECT COUNT(*) FROM items",
            "SELECT name FROM items GROUP BY name",
            "SELECT name FROM items ORDER BY name",
        ] {
            let err = session.execute_sql(sql).unwrap_err();
            assert!(
                matches!(err, DbError::Executor(ExecutorError::Unsupported(_))),
                "{}: {}",
                sql,
                err
            );
        }
    }

    #[test]
    fn test_requires_database() {
        let dir = TempDir::new().unwrap();
        let engine = StorageEngine::open(dir.path()).unwrap();
        let mut session = Session::new(engine);

        let err = session.execute_sql("CREATE TABLE t (id INTEGER)").unwrap_err();
        assert!(matches!(err, DbError::Executor(ExecutorError::NoDatabaseSelected)));
        assert!(session.use_database("missing").is_err());
    }

    #[test]
    fn test_drop_table_and_database() {
        let dir = TempDir::new().unwrap();
        let mut session = session(&dir);

        session.execute_sql("DROP TABLE items").unwrap();
        assert!(session.execute_sql("SELECT * FROM items").is_err());

        session.execute_sql("DROP DATABASE shop").unwrap();
        assert_eq!(session.current_database(), None);
        assert!(session.engine().list_databases().is_empty());
    }
}
