//! Token types for SQL lexer

use crate::types::Value;
use phf::phf_map;
use std::fmt;

// Reserved words, matched case-insensitively
static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "select" => TokenType::Select,
    "from" => TokenType::From,
    "where" => TokenType::Where,
    "insert" => TokenType::Insert,
    "into" => TokenType::Into,
    "values" => TokenType::Values,
    "update" => TokenType::Update,
    "set" => TokenType::Set,
    "delete" => TokenType::Delete,
    "create" => TokenType::Create,
    "table" => TokenType::Table,
    "database" => TokenType::Database,
    "drop" => TokenType::Drop,
    "alter" => TokenType::Alter,
    "add" => TokenType::Add,
    "column" => TokenType::Column,
    "primary" => TokenType::Primary,
    "key" => TokenType::Key,
    "default" => TokenType::Default,
    "not" => TokenType::Not,
    "null" => TokenType::Null,
    "and" => TokenType::And,
    "or" => TokenType::Or,
    "like" => TokenType::Like,
    "in" => TokenType::In,
    "between" => TokenType::Between,
    "is" => TokenType::Is,
    "order" => TokenType::Order,
    "by" => TokenType::By,
    "asc" => TokenType::Asc,
    "desc" => TokenType::Desc,
    "limit" => TokenType::Limit,
    "offset" => TokenType::Offset,
    "group" => TokenType::Group,
    "having" => TokenType::Having,
    "join" => TokenType::Join,
    "left" => TokenType::Left,
    "right" => TokenType::Right,
    "inner" => TokenType::Inner,
    "outer" => TokenType::Outer,
    "on" => TokenType::On,
    "as" => TokenType::As,
    "distinct" => TokenType::Distinct,
    "count" => TokenType::Count,
    "sum" => TokenType::Sum,
    "avg" => TokenType::Avg,
    "max" => TokenType::Max,
    "min" => TokenType::Min,
    "integer" => TokenType::Integer,
    "bigint" => TokenType::Bigint,
    "varchar" => TokenType::Varchar,
    "char" => TokenType::Char,
    "boolean" => TokenType::Boolean,
    "float" => TokenType::Float,
    "double" => TokenType::Double,
    "date" => TokenType::Date,
    "timestamp" => TokenType::Timestamp,
    "text" => TokenType::Text,
    "blob" => TokenType::Blob,
    "true" => TokenType::BooleanLiteral,
    "false" => TokenType::BooleanLiteral,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // Keywords
    Select,
    From,
    Where,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    Create,
    Table,
    Database,
    Drop,
    Alter,
    Add,
    Column,
    Primary,
    Key,
    Default,
    Not,
    Null,
    And,
    Or,
    Like,
    In,
    Between,
    Is,
    Order,
    By,
    Asc,
    Desc,
    Limit,
    Offset,
    Group,
    Having,
    Join,
    Left,
    Right,
    Inner,
    Outer,
    On,
    As,
    Distinct,

    // Aggregates
    Count,
    Sum,
    Avg,
    Max,
    Min,

    // Data types
    Integer,
    Bigint,
    Varchar,
    Char,
    Boolean,
    Float,
    Double,
    Date,
    Timestamp,
    Text,
    Blob,

    // Operators
    Eq,           // =
    Ne,           // !=
    Lt,           // <
    Gt,           // >
    Le,           // <=
    Ge,           // >=
    Plus,         // +
    Minus,        // -
    Star,         // *
    Slash,        // /

    // Delimiters
    LParen,       // (
    RParen,       // )
    Comma,        // ,
    Semicolon,    // ;
    Dot,          // .

    // Literals
    Identifier,
    StringLiteral,
    NumberLiteral,
    BooleanLiteral,

    // Special
    Eof,
}

impl TokenType {
    /// Case-insensitive reserved word lookup
    pub fn from_keyword(s: &str) -> Option<Self> {
        let lowercase = s.to_lowercase();
        KEYWORDS.get(lowercase.as_str()).copied()
    }

    pub fn is_data_type(self) -> bool {
        matches!(
            self,
            TokenType::Integer
                | TokenType::Bigint
                | TokenType::Varchar
                | TokenType::Char
                | TokenType::Boolean
                | TokenType::Float
                | TokenType::Double
                | TokenType::Date
                | TokenType::Timestamp
                | TokenType::Text
                | TokenType::Blob
        )
    }

    pub fn is_aggregate(self) -> bool {
        matches!(
            self,
            TokenType::Count | TokenType::Sum | TokenType::Avg | TokenType::Max | TokenType::Min
        )
    }
}

/// One lexical unit
///
/// `value` holds the decoded literal for string, number and boolean tokens
/// and the source text for everything else.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: Value,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(token_type: TokenType, value: Value, line: usize, column: usize) -> Self {
        Self { token_type, value, line, column }
    }

    /// Source text for keywords, identifiers and operators
    pub fn text(&self) -> &str {
        match &self.value {
            Value::Text(s) => s,
            _ => "",
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.token_type {
            TokenType::Eof => write!(f, "end of input"),
            _ => write!(f, "{}", self.value),
        }
    }
}
