//! Batch sources and per-batch operators
//!
//! Operators wrap a [`BatchIter`] and return another, so a pipeline is a
//! chain of lazy iterators pulled by its sink.

use crate::catalog::MetadataStore;
use crate::error::{DbError, Result, ValidationError};
use crate::storage::StorageEngine;
use crate::types::{Batch, Row};

pub type BatchIter<'a> = Box<dyn Iterator<Item = Result<Batch>> + 'a>;

/// Anything that can stream a table as batches of rows
pub trait BatchSource {
    fn scan_batches(&self, database: &str, table: &str, batch_size: usize)
        -> Result<BatchIter<'_>>;
}

impl<S: MetadataStore> BatchSource for StorageEngine<S> {
    fn scan_batches(
        &self,
        database: &str,
        table: &str,
        batch_size: usize,
    ) -> Result<BatchIter<'_>> {
        let scan = self.scan_table(database, table, batch_size)?;
        Ok(Box::new(scan.map(|batch| batch.map_err(DbError::from))))
    }
}

/// Keep rows matching `predicate`; batches left empty are dropped
pub fn filter_batches<'a, P>(batches: BatchIter<'a>, mut predicate: P) -> BatchIter<'a>
where
    P: FnMut(&Row) -> Result<bool> + 'a,
{
    Box::new(batches.filter_map(move |batch| {
        let rows = match batch {
            Ok(rows) => rows,
            Err(e) => return Some(Err(e)),
        };

        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            match predicate(&row) {
                Ok(true) => kept.push(row),
                Ok(false) => {}
                Err(e) => return Some(Err(e)),
            }
        }

        if kept.is_empty() {
            None
        } else {
            Some(Ok(kept))
        }
    }))
}

/// Narrow every row to `columns`
pub fn project_batches<'a>(batches: BatchIter<'a>, columns: Vec<String>) -> BatchIter<'a> {
    Box::new(batches.map(move |batch| -> Result<Batch> {
        batch?
            .into_iter()
            .map(|row| project_row(&row, &columns))
            .collect()
    }))
}

pub(crate) fn project_row(row: &Row, columns: &[String]) -> Result<Row> {
    columns
        .iter()
        .map(|name| match row.get(name) {
            Some(value) => Ok((name.clone(), value.clone())),
            None => Err(ValidationError::UnknownColumn(name.clone()).into()),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Value;

    /// In-memory source: the same pre-built batches for every table
    pub(crate) struct StaticSource(pub Vec<Batch>);

    impl BatchSource for StaticSource {
        fn scan_batches(&self, _: &str, _: &str, _: usize) -> Result<BatchIter<'_>> {
            Ok(Box::new(self.0.clone().into_iter().map(Ok)))
        }
    }

    pub(crate) fn numbered(ids: std::ops::Range<i64>) -> Batch {
        ids.map(|id| {
            let mut row = Row::new();
            row.insert("id".into(), Value::Integer(id));
            row.insert("label".into(), Value::Text(format!("row{}", id)));
            row
        })
        .collect()
    }

    #[test]
    fn test_filter_drops_empty_batches() {
        let source = StaticSource(vec![numbered(0..3), numbered(3..6), numbered(6..9)]);
        let batches = source.scan_batches("db", "t", 3).unwrap();

        let filtered: Vec<Batch> = filter_batches(batches, |row| {
            Ok(matches!(row["id"], Value::Integer(i) if i < 2 || i >= 7))
        })
        .collect::<Result<_>>()
        .unwrap();

        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].len(), 2);
        assert_eq!(filtered[1].len(), 2);
    }

    #[test]
    fn test_filter_propagates_predicate_errors() {
        let source = StaticSource(vec![numbered(0..2)]);
        let batches = source.scan_batches("db", "t", 2).unwrap();

        let mut filtered = filter_batches(batches, |_| {
            Err(ValidationError::UnknownColumn("ghost".into()).into())
        });
        assert!(matches!(
            filtered.next(),
            Some(Err(DbError::Validation(ValidationError::UnknownColumn(_))))
        ));
    }

    #[test]
    fn test_project_keeps_only_requested_columns() {
        let source = StaticSource(vec![numbered(0..2)]);
        let batches = source.scan_batches("db", "t", 2).unwrap();

        let projected: Vec<Batch> = project_batches(batches, vec!["label".into()])
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(projected[0][1].len(), 1);
        assert_eq!(projected[0][1]["label"], Value::Text("row1".into()));
    }

    #[test]
    fn test_project_unknown_column() {
        let source = StaticSource(vec![numbered(0..1)]);
        let batches = source.scan_batches("db", "t", 1).unwrap();

        let err = project_batches(batches, vec!["missing".into()])
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.to_string(), "Column not found: missing");
    }
}
