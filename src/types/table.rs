//! Column schema records persisted in table metadata

use super::Value;
use serde::{Deserialize, Serialize};

fn default_nullable() -> bool {
    true
}

/// Column definition as stored in `table_metadata.json`
///
/// The type stays textual (`"varchar(20)"`, `"INTEGER"`); [`ColumnKind`]
/// interprets it when sizing rows and coercing scanned values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub data_type: String,
    /// Whether this column is nullable
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Whether this column is part of the primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Value used when an INSERT omits this column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn kind(&self) -> ColumnKind {
        ColumnKind::parse(&self.data_type)
    }
}

/// Interpreted column type
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    /// VARCHAR with declared length, `None` if absent or unparseable
    Varchar(Option<u64>),
    /// CHAR with declared length, `None` if absent or unparseable
    Char(Option<u64>),
    Integer,
    Bigint,
    Float,
    Double,
    Boolean,
    Date,
    Timestamp,
    /// Any other type name, upper-cased
    Other(String),
}

impl ColumnKind {
    /// Interpret a declared type such as `varchar(20)` or `INTEGER`
    pub fn parse(type_name: &str) -> Self {
        let upper = type_name.trim().to_uppercase();
        let (base, param) = match upper.split_once('(') {
            Some((base, rest)) => (base.trim(), Some(rest.trim_end_matches(')').trim())),
            None => (upper.as_str(), None),
        };
        let length = param.and_then(|p| p.parse::<u64>().ok());

        match base {
            "VARCHAR" => ColumnKind::Varchar(length),
            "CHAR" => ColumnKind::Char(length),
            "INTEGER" | "INT" => ColumnKind::Integer,
            "BIGINT" => ColumnKind::Bigint,
            "FLOAT" => ColumnKind::Float,
            "DOUBLE" => ColumnKind::Double,
            "BOOLEAN" | "BOOL" => ColumnKind::Boolean,
            "DATE" => ColumnKind::Date,
            "TIMESTAMP" => ColumnKind::Timestamp,
            _ => ColumnKind::Other(upper.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_parameterized_types() {
        assert_eq!(ColumnKind::parse("varchar(20)"), ColumnKind::Varchar(Some(20)));
        assert_eq!(ColumnKind::parse("CHAR(10)"), ColumnKind::Char(Some(10)));
        assert_eq!(ColumnKind::parse("VARCHAR"), ColumnKind::Varchar(None));
        assert_eq!(ColumnKind::parse("varchar(abc)"), ColumnKind::Varchar(None));
    }

    #[test]
    fn test_parse_scalar_types() {
        assert_eq!(ColumnKind::parse("integer"), ColumnKind::Integer);
        assert_eq!(ColumnKind::parse("Timestamp"), ColumnKind::Timestamp);
        assert_eq!(ColumnKind::parse("blob"), ColumnKind::Other("BLOB".into()));
    }

    #[test]
    fn test_column_spec_json_shape() {
        let col = ColumnSpec::new("id", "INTEGER").primary_key().not_null();
        let json = serde_json::to_value(&col).unwrap();
        assert_eq!(json["type"], "INTEGER");
        assert_eq!(json["primary_key"], true);
        assert_eq!(json["nullable"], false);

        let parsed: ColumnSpec = serde_json::from_str(r#"{"name":"x","type":"TEXT"}"#).unwrap();
        assert!(parsed.nullable);
        assert!(!parsed.primary_key);
        assert!(parsed.default.is_none());
        assert!(json.get("default").is_none());
    }

    #[test]
    fn test_default_value_persisted() {
        let col = ColumnSpec::new("qty", "INTEGER").with_default(Value::Integer(1));
        let json = serde_json::to_string(&col).unwrap();
        let back: ColumnSpec = serde_json::from_str(&json).unwrap();
        assert_eq!(back.default, Some(Value::Integer(1)));
    }
}
