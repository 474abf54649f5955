//! flatdb SQL front end
//!
//! Architecture:
//! - Lexer: Tokenizes SQL strings
//! - Parser: Builds AST from tokens
//! - Visitor: Traverses the AST
//! - Evaluator: Evaluates expressions against rows
//! - Dot: Optional parse-tree diagnostics

pub mod token;
pub mod lexer;
pub mod ast;
pub mod parser;
pub mod visitor;
pub mod evaluator;
pub mod dot;

pub use token::{Token, TokenType};
pub use lexer::{tokenize, Lexer};
pub use ast::{
    BinaryOperator, ColumnDef, ColumnRef, Expr, FunctionCall, Literal, LiteralKind, SelectStmt,
    Statement, UnaryOperator,
};
pub use parser::Parser;
pub use visitor::{referenced_columns, Visitor};
pub use evaluator::{evaluate, ExprEvaluator};
pub use dot::{generate_run_id, ParseTreeWriter};

use crate::error::ParseError;

pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Parser entry point
///
/// Holds its own configuration; nothing is shared between instances.
#[derive(Debug, Clone, Default)]
pub struct SqlParser {
    parse_trees: Option<ParseTreeWriter>,
}

impl SqlParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also dump a DOT parse tree for every successful parse
    pub fn with_parse_tree_writer(mut self, writer: ParseTreeWriter) -> Self {
        self.parse_trees = Some(writer);
        self
    }

    pub fn parse(&self, sql: &str) -> ParseResult<Statement> {
        let tokens = Lexer::new(sql).tokenize()?;
        let statement = Parser::new(tokens).parse()?;

        if let Some(writer) = &self.parse_trees {
            if let Err(e) = writer.write(sql, &statement) {
                log::warn!("Failed to write parse tree: {}", e);
            }
        }

        Ok(statement)
    }
}

/// Parse one SQL statement
pub fn parse(sql: &str) -> ParseResult<Statement> {
    SqlParser::new().parse(sql)
}
