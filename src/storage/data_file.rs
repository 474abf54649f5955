//! CSV data files
//!
//! The first record of a non-empty file is the header (column names in
//! declared order). Values are written as text; types live in table
//! metadata only.

use crate::error::StorageError;
use crate::storage::layout::parse_data_file_index;
use crate::types::{ColumnSpec, Row};
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

type Result<T> = std::result::Result<T, StorageError>;

fn file_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Data rows in `path`, header excluded. A missing or empty file has none.
pub fn count_rows(path: &Path) -> Result<u64> {
    if file_len(path)? == 0 {
        return Ok(0);
    }

    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
    let mut record = csv::ByteRecord::new();
    let mut count = 0;
    while reader.read_byte_record(&mut record)? {
        count += 1;
    }
    Ok(count)
}

/// Append `rows` to `path` in `columns` order, writing the header first
/// when the file is new or empty. Absent values are written as empty fields.
pub fn append_rows(path: &Path, columns: &[ColumnSpec], rows: &[Row]) -> Result<()> {
    let write_header = file_len(path)? == 0;

    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(file);

    if write_header {
        writer.write_record(columns.iter().map(|c| c.name.as_str()))?;
    }

    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|c| row.get(&c.name).map(|v| v.to_field()).unwrap_or_default()),
        )?;
    }

    writer.flush()?;
    Ok(())
}

/// Data files in `dir`, in ascending numeric order
pub fn list_data_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        if let Some(index) = name.to_str().and_then(parse_data_file_index) {
            files.push((index, entry.path()));
        }
    }

    files.sort_by_key(|(index, _)| *index);
    Ok(files.into_iter().map(|(_, path)| path).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Value;
    use tempfile::TempDir;

    fn columns() -> Vec<ColumnSpec> {
        vec![ColumnSpec::new("id", "INTEGER"), ColumnSpec::new("name", "VARCHAR(20)")]
    }

    fn row(id: i64, name: &str) -> Row {
        let mut row = Row::new();
        row.insert("id".into(), Value::Integer(id));
        row.insert("name".into(), Value::Text(name.into()));
        row
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data_0.csv");
        fs::File::create(&path).unwrap();

        append_rows(&path, &columns(), &[row(1, "a")]).unwrap();
        append_rows(&path, &columns(), &[row(2, "b"), row(3, "c, d")]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "id,name\n1,a\n2,b\n3,\"c, d\"\n");
        assert_eq!(count_rows(&path).unwrap(), 3);
    }

    #[test]
    fn test_missing_values_written_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data_0.csv");
        let mut partial = Row::new();
        partial.insert("id".into(), Value::Integer(9));

        append_rows(&path, &columns(), &[partial]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,name\n9,\n");
    }

    #[test]
    fn test_count_rows_of_empty_or_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data_0.csv");
        assert_eq!(count_rows(&path).unwrap(), 0);
        fs::File::create(&path).unwrap();
        assert_eq!(count_rows(&path).unwrap(), 0);
    }

    #[test]
    fn test_multiline_values_count_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data_0.csv");
        append_rows(&path, &columns(), &[row(1, "line1\nline2"), row(2, "x")]).unwrap();
        assert_eq!(count_rows(&path).unwrap(), 2);
    }

    #[test]
    fn test_list_in_numeric_order() {
        let dir = TempDir::new().unwrap();
        for name in ["data_10.csv", "data_2.csv", "data_0.csv", "notes.txt"] {
            fs::File::create(dir.path().join(name)).unwrap();
        }
        let names: Vec<_> = list_data_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["data_0.csv", "data_2.csv", "data_10.csv"]);
    }
}
