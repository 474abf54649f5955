//! Batched table scan
//!
//! Streams a table's data files in numeric order, keeping at most one
//! file open at a time. Batches may span file boundaries.

use crate::error::StorageError;
use crate::storage::coerce::coerce_field;
use crate::types::{Batch, ColumnKind, ColumnSpec, Row, Value};
use std::fs::{self, File};
use std::path::PathBuf;

struct FileCursor {
    reader: csv::Reader<File>,
    headers: Vec<String>,
    record: csv::StringRecord,
}

impl FileCursor {
    /// `None` for an empty file
    fn open(path: &PathBuf) -> Result<Option<Self>, StorageError> {
        if fs::metadata(path)?.len() == 0 {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let headers = reader.headers()?.iter().map(String::from).collect();
        log::debug!("Scanning data file {}", path.display());

        Ok(Some(Self {
            reader,
            headers,
            record: csv::StringRecord::new(),
        }))
    }
}

/// Iterator of row batches. Rows carry one entry per declared column;
/// values the file does not hold read as NULL.
pub struct TableScan {
    files: std::vec::IntoIter<PathBuf>,
    current: Option<FileCursor>,
    columns: Vec<(String, ColumnKind)>,
    batch_size: usize,
    finished: bool,
}

impl TableScan {
    pub(crate) fn new(files: Vec<PathBuf>, columns: &[ColumnSpec], batch_size: usize) -> Self {
        Self {
            files: files.into_iter(),
            current: None,
            columns: columns.iter().map(|c| (c.name.clone(), c.kind())).collect(),
            batch_size,
            finished: false,
        }
    }

    fn to_row(columns: &[(String, ColumnKind)], cursor: &FileCursor) -> Row {
        let mut row = Row::with_capacity(columns.len());

        for (header, raw) in cursor.headers.iter().zip(cursor.record.iter()) {
            let kind = columns.iter().find(|(name, _)| name == header).map(|(_, k)| k);
            row.insert(header.clone(), coerce_field(raw, kind));
        }
        for (name, _) in columns {
            row.entry(name.clone()).or_insert(Value::Null);
        }

        row
    }

    fn next_row(&mut self) -> Result<Option<Row>, StorageError> {
        loop {
            if let Some(cursor) = self.current.as_mut() {
                if cursor.reader.read_record(&mut cursor.record)? {
                    return Ok(Some(Self::to_row(&self.columns, cursor)));
                }
                // Drained; release the handle before opening the next file
                self.current = None;
            }

            match self.files.next() {
                Some(path) => self.current = FileCursor::open(&path)?,
                None => return Ok(None),
            }
        }
    }
}

impl Iterator for TableScan {
    type Item = Result<Batch, StorageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut batch = Vec::with_capacity(self.batch_size);
        while batch.len() < self.batch_size {
            match self.next_row() {
                Ok(Some(row)) => batch.push(row),
                Ok(None) => {
                    self.finished = true;
                    break;
                }
                Err(e) => {
                    self.finished = true;
                    self.current = None;
                    return Some(Err(e));
                }
            }
        }

        if batch.is_empty() {
            None
        } else {
            Some(Ok(batch))
        }
    }
}
