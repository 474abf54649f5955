//! Abstract Syntax Tree for SQL statements
//!
//! Pure syntax: nodes are plain data built once by the parser. Nothing
//! here validates names or evaluates expressions.

use crate::types::Value;
use std::fmt;

/// Top-level SQL statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select(SelectStmt),
    Insert(InsertStmt),
    Update(UpdateStmt),
    Delete(DeleteStmt),
    CreateTable(CreateTableStmt),
    CreateDatabase(CreateDatabaseStmt),
    DropTable(DropTableStmt),
    DropDatabase(DropDatabaseStmt),
}

impl Statement {
    /// Short variant name, used in logs and diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Statement::Select(_) => "SELECT",
            Statement::Insert(_) => "INSERT",
            Statement::Update(_) => "UPDATE",
            Statement::Delete(_) => "DELETE",
            Statement::CreateTable(_) => "CREATE TABLE",
            Statement::CreateDatabase(_) => "CREATE DATABASE",
            Statement::DropTable(_) => "DROP TABLE",
            Statement::DropDatabase(_) => "DROP DATABASE",
        }
    }
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq)]
pub struct SelectStmt {
    pub distinct: bool,
    /// `*` is represented as a single `ColumnRef` named `*`
    pub columns: Vec<Expr>,
    pub from: Option<TableRef>,
    pub where_clause: Option<Expr>,
    pub group_by: Option<Vec<ColumnRef>>,
    pub having: Option<Expr>,
    pub order_by: Option<Vec<OrderByItem>>,
    pub limit: Option<LimitClause>,
}

/// Table reference in FROM clause: `name`, `name AS alias` or `name alias`
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderByItem {
    pub column: ColumnRef,
    /// `None` when no direction was written
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LimitClause {
    pub count: u64,
    pub offset: Option<u64>,
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStmt {
    pub table: String,
    pub columns: Option<Vec<String>>,
    /// One entry per parenthesized tuple
    pub values: Vec<Vec<Expr>>,
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateStmt {
    pub table: String,
    /// Assignments in source order; a repeated column keeps its last value
    pub assignments: Vec<(String, Expr)>,
    pub where_clause: Option<Expr>,
}

impl UpdateStmt {
    pub fn assignment(&self, column: &str) -> Option<&Expr> {
        self.assignments
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, expr)| expr)
    }
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteStmt {
    pub table: String,
    pub where_clause: Option<Expr>,
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq)]
pub struct CreateTableStmt {
    pub table: String,
    pub columns: Vec<ColumnDef>,
}

/// Column definition in CREATE TABLE
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    /// Lower-cased type text, e.g. `varchar(20)` or `integer`
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
    pub default_value: Option<Expr>,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            primary_key: false,
            default_value: None,
        }
    }
}

impl From<&ColumnDef> for crate::types::ColumnSpec {
    fn from(def: &ColumnDef) -> Self {
        crate::types::ColumnSpec {
            name: def.name.clone(),
            data_type: def.data_type.clone(),
            nullable: def.nullable,
            primary_key: def.primary_key,
            default: match &def.default_value {
                Some(Expr::Literal(literal)) => Some(literal.value.clone()),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreateDatabaseStmt {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropTableStmt {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DropDatabaseStmt {
    pub name: String,
}

/// Expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(ColumnRef),
    Literal(Literal),
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    Function(FunctionCall),
    /// Right-hand side of `IN (...)`
    List(Vec<Expr>),
}

impl Expr {
    pub fn column(name: impl Into<String>) -> Self {
        Expr::Column(ColumnRef::new(name))
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(Literal::new(value.into()))
    }

    pub fn null() -> Self {
        Expr::Literal(Literal::new(Value::Null))
    }

    pub fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Self {
        Expr::BinaryOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOperator, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    /// True for the `*` select-list marker
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Expr::Column(c) if c.name == "*" && c.table.is_none())
    }
}

/// Column reference, optionally qualified: `name` or `table.name`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub name: String,
    pub table: Option<String>,
}

impl ColumnRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), table: None }
    }

    pub fn qualified(table: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: Some(table.into()),
        }
    }
}

/// Literal type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    String,
    Number,
    Boolean,
    Null,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LiteralKind::String => "string",
            LiteralKind::Number => "number",
            LiteralKind::Boolean => "boolean",
            LiteralKind::Null => "null",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: Value,
}

impl Literal {
    pub fn new(value: Value) -> Self {
        Self { value }
    }

    /// Type tag derived from the value
    pub fn kind(&self) -> LiteralKind {
        match self.value {
            Value::Text(_) => LiteralKind::String,
            Value::Integer(_) | Value::Float(_) => LiteralKind::Number,
            Value::Bool(_) => LiteralKind::Boolean,
            Value::Null => LiteralKind::Null,
        }
    }
}

/// Function call. `name` is lower-cased; `COUNT(*)` carries a `*` column argument.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub args: Vec<Expr>,
}

impl FunctionCall {
    pub fn is_aggregate(&self) -> bool {
        matches!(self.name.as_str(), "count" | "sum" | "avg" | "max" | "min")
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    Ne,
    IsNull,
    IsNotNull,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    In,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinaryOperator::Or => "OR",
            BinaryOperator::And => "AND",
            BinaryOperator::Eq => "=",
            BinaryOperator::Ne => "!=",
            BinaryOperator::IsNull => "IS NULL",
            BinaryOperator::IsNotNull => "IS NOT NULL",
            BinaryOperator::Lt => "<",
            BinaryOperator::Le => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Like => "LIKE",
            BinaryOperator::In => "IN",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "NOT"),
            UnaryOperator::Minus => write!(f, "-"),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{}.{}", table, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Value::Text(s) => write!(f, "'{}'", s.replace('\'', "''")),
            other => write!(f, "{}", other),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(c) => write!(f, "{}", c),
            Expr::Literal(l) => write!(f, "{}", l),
            Expr::BinaryOp { left, op, right } => match op {
                BinaryOperator::IsNull | BinaryOperator::IsNotNull => write!(f, "({} {})", left, op),
                _ => write!(f, "({} {} {})", left, op, right),
            },
            Expr::UnaryOp { op: UnaryOperator::Not, operand } => write!(f, "NOT {}", operand),
            Expr::UnaryOp { op: UnaryOperator::Minus, operand } => write!(f, "-{}", operand),
            Expr::Function(call) => {
                write!(f, "{}(", call.name)?;
                write_list(f, &call.args)?;
                write!(f, ")")
            }
            Expr::List(items) => {
                write!(f, "(")?;
                write_list(f, items)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_kind_tags() {
        assert_eq!(Literal::new(Value::Integer(1)).kind(), LiteralKind::Number);
        assert_eq!(Literal::new(Value::Float(1.5)).kind(), LiteralKind::Number);
        assert_eq!(Literal::new("a".into()).kind().to_string(), "string");
        assert_eq!(Literal::new(Value::Null).kind().to_string(), "null");
    }

    #[test]
    fn test_expr_display() {
        let expr = Expr::binary(
            Expr::Column(ColumnRef::qualified("u", "age")),
            BinaryOperator::Ge,
            Expr::literal(18i64),
        );
        assert_eq!(expr.to_string(), "(u.age >= 18)");

        let expr = Expr::binary(Expr::column("name"), BinaryOperator::IsNull, Expr::null());
        assert_eq!(expr.to_string(), "(name IS NULL)");

        let expr = Expr::binary(Expr::column("n"), BinaryOperator::Eq, Expr::literal("O'Neil"));
        assert_eq!(expr.to_string(), "(n = 'O''Neil')");
    }

    #[test]
    fn test_update_assignment_lookup() {
        let stmt = UpdateStmt {
            table: "t".into(),
            assignments: vec![("a".into(), Expr::literal(1i64))],
            where_clause: None,
        };
        assert_eq!(stmt.assignment("a"), Some(&Expr::literal(1i64)));
        assert_eq!(stmt.assignment("b"), None);
    }
}
