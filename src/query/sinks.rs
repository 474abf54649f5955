//! Pipeline sinks: where batches end up

use crate::catalog::MetadataStore;
use crate::error::Result;
use crate::query::batch_ops::project_row;
use crate::storage::StorageEngine;
use crate::types::{Batch, Row, Value};

/// Terminal stage of a pipeline
pub trait Sink {
    type Output;

    fn consume(&mut self, batch: Batch) -> Result<()>;

    fn finish(self) -> Result<Self::Output>;
}

/// Append target for [`InsertSink`]
pub trait RowAppender {
    fn append_batch(&self, database: &str, table: &str, rows: &[Row]) -> Result<usize>;
}

impl<S: MetadataStore> RowAppender for StorageEngine<S> {
    fn append_batch(&self, database: &str, table: &str, rows: &[Row]) -> Result<usize> {
        Ok(self.append_rows(database, table, rows)?)
    }
}

/// Collects every row
#[derive(Debug, Default)]
pub struct OutputSink {
    rows: Vec<Row>,
}

impl OutputSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Sink for OutputSink {
    type Output = Vec<Row>;

    fn consume(&mut self, batch: Batch) -> Result<()> {
        self.rows.extend(batch);
        Ok(())
    }

    fn finish(self) -> Result<Vec<Row>> {
        Ok(self.rows)
    }
}

/// Appends each batch to a table as it arrives; yields the row count
pub struct InsertSink<'a, A: RowAppender + ?Sized> {
    target: &'a A,
    database: String,
    table: String,
    inserted: usize,
}

impl<'a, A: RowAppender + ?Sized> InsertSink<'a, A> {
    pub fn new(target: &'a A, database: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            target,
            database: database.into(),
            table: table.into(),
            inserted: 0,
        }
    }
}

impl<A: RowAppender + ?Sized> Sink for InsertSink<'_, A> {
    type Output = usize;

    fn consume(&mut self, batch: Batch) -> Result<()> {
        self.inserted += self.target.append_batch(&self.database, &self.table, &batch)?;
        Ok(())
    }

    fn finish(self) -> Result<usize> {
        log::debug!("Inserted {} row(s) into '{}.{}'", self.inserted, self.database, self.table);
        Ok(self.inserted)
    }
}

/// Collects rows as value tuples in a fixed column order
#[derive(Debug)]
pub struct TupleSink {
    columns: Vec<String>,
    tuples: Vec<Vec<Value>>,
}

impl TupleSink {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            tuples: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }
}

impl Sink for TupleSink {
    type Output = Vec<Vec<Value>>;

    fn consume(&mut self, batch: Batch) -> Result<()> {
        for row in batch {
            let mut projected = project_row(&row, &self.columns)?;
            let tuple = self
                .columns
                .iter()
                .map(|c| projected.remove(c).unwrap_or(Value::Null))
                .collect();
            self.tuples.push(tuple);
        }
        Ok(())
    }

    fn finish(self) -> Result<Vec<Vec<Value>>> {
        Ok(self.tuples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::batch_ops::tests::numbered;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingTarget {
        calls: RefCell<Vec<(String, usize)>>,
    }

    impl RowAppender for RecordingTarget {
        fn append_batch(&self, _: &str, table: &str, rows: &[Row]) -> Result<usize> {
            self.calls.borrow_mut().push((table.to_string(), rows.len()));
            Ok(rows.len())
        }
    }

    #[test]
    fn test_output_sink_collects_in_order() {
        let mut sink = OutputSink::new();
        sink.consume(numbered(0..2)).unwrap();
        sink.consume(numbered(2..3)).unwrap();

        let rows = sink.finish().unwrap();
        let ids: Vec<_> = rows.iter().map(|r| r["id"].clone()).collect();
        assert_eq!(ids, vec![Value::Integer(0), Value::Integer(1), Value::Integer(2)]);
    }

    #[test]
    fn test_insert_sink_appends_per_batch() {
        let target = RecordingTarget::default();
        let mut sink = InsertSink::new(&target, "db", "copy");
        sink.consume(numbered(0..3)).unwrap();
        sink.consume(numbered(3..4)).unwrap();

        assert_eq!(sink.finish().unwrap(), 4);
        assert_eq!(
            *target.calls.borrow(),
            vec![("copy".to_string(), 3), ("copy".to_string(), 1)]
        );
    }

    #[test]
    fn test_tuple_sink_orders_values() {
        let mut sink = TupleSink::new(vec!["label".into(), "id".into()]);
        sink.consume(numbered(5..6)).unwrap();

        assert_eq!(
            sink.finish().unwrap(),
            vec![vec![Value::Text("row5".into()), Value::Integer(5)]]
        );
    }

    #[test]
    fn test_tuple_sink_unknown_column() {
        let mut sink = TupleSink::new(vec!["nope".into()]);
        assert!(sink.consume(numbered(0..1)).is_err());
    }
}
