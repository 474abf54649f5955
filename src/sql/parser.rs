//! SQL Parser - converts tokens into AST
//!
//! Recursive descent, one method per production. Precedence from low to
//! high: OR, AND, equality (`=`, `!=`, `IS [NOT] NULL`), comparison
//! (`<`, `<=`, `>`, `>=`, `LIKE`, `IN`), primary. Arithmetic `+ - * /`
//! chains left to right at the primary level with a single precedence.

use super::ast::*;
use super::token::{Token, TokenType};
use super::ParseResult;
use crate::error::ParseError;
use crate::types::Value;

/// What a parenthesized group may contain
#[derive(Clone, Copy)]
enum Nesting {
    /// Select-list and VALUES items: arithmetic only
    Value,
    /// WHERE/HAVING/SET operands: full boolean expressions
    Condition,
}

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Appends an `Eof` token when `tokens` does not already end with one
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let (line, column) = tokens.last().map_or((1, 1), |t| (t.line, t.column));
            tokens.push(Token::new(TokenType::Eof, Value::Null, line, column));
        }
        Self { tokens, position: 0 }
    }

    /// Parse exactly one statement, optionally followed by one semicolon
    pub fn parse(&mut self) -> ParseResult<Statement> {
        let stmt = match self.current().token_type {
            TokenType::Eof => return Err(ParseError::EmptyInput),
            TokenType::Select => Statement::Select(self.parse_select()?),
            TokenType::Insert => Statement::Insert(self.parse_insert()?),
            TokenType::Update => Statement::Update(self.parse_update()?),
            TokenType::Delete => Statement::Delete(self.parse_delete()?),
            TokenType::Create => self.parse_create()?,
            TokenType::Drop => self.parse_drop()?,
            _ => return Err(self.error()),
        };

        self.match_token(TokenType::Semicolon);

        if self.current().token_type != TokenType::Eof {
            return Err(self.error());
        }

        log::debug!("Parsed {} statement", stmt.kind());
        Ok(stmt)
    }

    /// Parse SELECT statement
    fn parse_select(&mut self) -> ParseResult<SelectStmt> {
        self.expect(TokenType::Select)?;

        let distinct = self.match_token(TokenType::Distinct);

        let columns = if self.match_token(TokenType::Star) {
            vec![Expr::column("*")]
        } else {
            self.parse_value_list()?
        };

        let from = if self.match_token(TokenType::From) {
            Some(self.parse_table_ref()?)
        } else {
            None
        };

        let where_clause = if self.match_token(TokenType::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let group_by = if self.match_token(TokenType::Group) {
            self.expect(TokenType::By)?;
            Some(self.parse_column_ref_list()?)
        } else {
            None
        };

        let having = if self.match_token(TokenType::Having) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let order_by = if self.match_token(TokenType::Order) {
            self.expect(TokenType::By)?;
            Some(self.parse_order_by()?)
        } else {
            None
        };

        let limit = if self.match_token(TokenType::Limit) {
            let count = self.parse_unsigned()?;
            let offset = if self.match_token(TokenType::Offset) {
                Some(self.parse_unsigned()?)
            } else {
                None
            };
            Some(LimitClause { count, offset })
        } else {
            None
        };

        Ok(SelectStmt {
            distinct,
            columns,
            from,
            where_clause,
            group_by,
            having,
            order_by,
            limit,
        })
    }

    /// `name`, `name AS alias` or `name alias`
    fn parse_table_ref(&mut self) -> ParseResult<TableRef> {
        let name = self.parse_identifier()?;

        let alias = if self.match_token(TokenType::As) {
            Some(self.parse_identifier()?)
        } else if self.current().token_type == TokenType::Identifier {
            Some(self.parse_identifier()?)
        } else {
            None
        };

        Ok(TableRef { name, alias })
    }

    fn parse_order_by(&mut self) -> ParseResult<Vec<OrderByItem>> {
        let mut items = Vec::new();

        loop {
            let column = self.parse_column_ref()?;
            let direction = if self.match_token(TokenType::Asc) {
                Some(SortDirection::Asc)
            } else if self.match_token(TokenType::Desc) {
                Some(SortDirection::Desc)
            } else {
                None
            };
            items.push(OrderByItem { column, direction });

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        Ok(items)
    }

    /// Parse INSERT statement
    fn parse_insert(&mut self) -> ParseResult<InsertStmt> {
        self.expect(TokenType::Insert)?;
        self.expect(TokenType::Into)?;

        let table = self.parse_identifier()?;

        let columns = if self.match_token(TokenType::LParen) {
            let cols = self.parse_identifier_list()?;
            self.expect(TokenType::RParen)?;
            Some(cols)
        } else {
            None
        };

        self.expect(TokenType::Values)?;

        let mut values = Vec::new();
        loop {
            self.expect(TokenType::LParen)?;
            values.push(self.parse_value_list()?);
            self.expect(TokenType::RParen)?;

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        Ok(InsertStmt { table, columns, values })
    }

    /// Parse UPDATE statement
    fn parse_update(&mut self) -> ParseResult<UpdateStmt> {
        self.expect(TokenType::Update)?;
        let table = self.parse_identifier()?;
        self.expect(TokenType::Set)?;

        let mut assignments: Vec<(String, Expr)> = Vec::new();
        loop {
            let column = self.parse_identifier()?;
            self.expect(TokenType::Eq)?;
            let value = self.parse_expression()?;

            // Last assignment to a column wins
            match assignments.iter_mut().find(|(name, _)| *name == column) {
                Some(existing) => existing.1 = value,
                None => assignments.push((column, value)),
            }

            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        let where_clause = if self.match_token(TokenType::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(UpdateStmt { table, assignments, where_clause })
    }

    /// Parse DELETE statement
    fn parse_delete(&mut self) -> ParseResult<DeleteStmt> {
        self.expect(TokenType::Delete)?;
        self.expect(TokenType::From)?;
        let table = self.parse_identifier()?;

        let where_clause = if self.match_token(TokenType::Where) {
            Some(self.parse_expression()?)
        } else {
            None
        };

        Ok(DeleteStmt { table, where_clause })
    }

    fn parse_create(&mut self) -> ParseResult<Statement> {
        self.expect(TokenType::Create)?;

        if self.match_token(TokenType::Table) {
            let table = self.parse_identifier()?;
            self.expect(TokenType::LParen)?;

            let mut columns = Vec::new();
            loop {
                columns.push(self.parse_column_def()?);
                if !self.match_token(TokenType::Comma) {
                    break;
                }
            }

            self.expect(TokenType::RParen)?;
            Ok(Statement::CreateTable(CreateTableStmt { table, columns }))
        } else if self.match_token(TokenType::Database) {
            let name = self.parse_identifier()?;
            Ok(Statement::CreateDatabase(CreateDatabaseStmt { name }))
        } else {
            Err(self.error())
        }
    }

    /// `name type [PRIMARY KEY | NOT NULL | NULL | DEFAULT expr]*`
    fn parse_column_def(&mut self) -> ParseResult<ColumnDef> {
        let name = self.parse_identifier()?;
        let data_type = self.parse_data_type()?;
        let mut def = ColumnDef::new(name, data_type);

        loop {
            match self.current().token_type {
                TokenType::Primary => {
                    self.advance();
                    self.expect(TokenType::Key)?;
                    def.primary_key = true;
                }
                TokenType::Not => {
                    self.advance();
                    self.expect(TokenType::Null)?;
                    def.nullable = false;
                }
                TokenType::Null => {
                    self.advance();
                    def.nullable = true;
                }
                TokenType::Default => {
                    self.advance();
                    def.default_value = Some(self.parse_value_expr()?);
                }
                _ => break,
            }
        }

        Ok(def)
    }

    /// Lower-cased type name; VARCHAR and CHAR require a length
    fn parse_data_type(&mut self) -> ParseResult<String> {
        let token_type = self.current().token_type;
        if !token_type.is_data_type() {
            return Err(self.error());
        }
        let name = self.current().text().to_lowercase();
        self.advance();

        if matches!(token_type, TokenType::Varchar | TokenType::Char) {
            self.expect(TokenType::LParen)?;
            let length = self.parse_unsigned()?;
            self.expect(TokenType::RParen)?;
            return Ok(format!("{}({})", name, length));
        }

        Ok(name)
    }

    fn parse_drop(&mut self) -> ParseResult<Statement> {
        self.expect(TokenType::Drop)?;

        if self.match_token(TokenType::Table) {
            let name = self.parse_identifier()?;
            Ok(Statement::DropTable(DropTableStmt { name }))
        } else if self.match_token(TokenType::Database) {
            let name = self.parse_identifier()?;
            Ok(Statement::DropDatabase(DropDatabaseStmt { name }))
        } else {
            Err(self.error())
        }
    }

    /// Full boolean expression
    pub fn parse_expression(&mut self) -> ParseResult<Expr> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_and()?;
        while self.match_token(TokenType::Or) {
            let right = self.parse_and()?;
            left = Expr::binary(left, BinaryOperator::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.match_token(TokenType::And) {
            let right = self.parse_equality()?;
            left = Expr::binary(left, BinaryOperator::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_comparison()?;

        loop {
            match self.current().token_type {
                TokenType::Eq | TokenType::Ne => {
                    let op = if self.current().token_type == TokenType::Eq {
                        BinaryOperator::Eq
                    } else {
                        BinaryOperator::Ne
                    };
                    self.advance();
                    let right = self.parse_comparison()?;
                    left = Expr::binary(left, op, right);
                }
                TokenType::Is => {
                    self.advance();
                    let op = if self.match_token(TokenType::Not) {
                        BinaryOperator::IsNotNull
                    } else {
                        BinaryOperator::IsNull
                    };
                    self.expect(TokenType::Null)?;
                    left = Expr::binary(left, op, Expr::null());
                }
                _ => break,
            }
        }

        Ok(left)
    }

    fn parse_comparison(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_primary()?;

        loop {
            let op = match self.current().token_type {
                TokenType::Lt => BinaryOperator::Lt,
                TokenType::Le => BinaryOperator::Le,
                TokenType::Gt => BinaryOperator::Gt,
                TokenType::Ge => BinaryOperator::Ge,
                TokenType::Like => {
                    self.advance();
                    if self.current().token_type != TokenType::StringLiteral {
                        return Err(self.error());
                    }
                    let pattern = Expr::Literal(Literal::new(self.current().value.clone()));
                    self.advance();
                    left = Expr::binary(left, BinaryOperator::Like, pattern);
                    continue;
                }
                TokenType::In => {
                    self.advance();
                    self.expect(TokenType::LParen)?;
                    let items = self.parse_value_list()?;
                    self.expect(TokenType::RParen)?;
                    left = Expr::binary(left, BinaryOperator::In, Expr::List(items));
                    continue;
                }
                _ => break,
            };
            self.advance();
            let right = self.parse_primary()?;
            left = Expr::binary(left, op, right);
        }

        Ok(left)
    }

    /// `NOT primary` or an arithmetic chain of terms
    fn parse_primary(&mut self) -> ParseResult<Expr> {
        if self.match_token(TokenType::Not) {
            let operand = self.parse_primary()?;
            return Ok(Expr::unary(UnaryOperator::Not, operand));
        }
        self.parse_arithmetic(Nesting::Condition)
    }

    /// Select-list, VALUES and DEFAULT item
    fn parse_value_expr(&mut self) -> ParseResult<Expr> {
        self.parse_arithmetic(Nesting::Value)
    }

    fn parse_arithmetic(&mut self, nesting: Nesting) -> ParseResult<Expr> {
        let mut left = self.parse_term(nesting)?;

        loop {
            let op = match self.current().token_type {
                TokenType::Plus => BinaryOperator::Add,
                TokenType::Minus => BinaryOperator::Sub,
                TokenType::Star => BinaryOperator::Mul,
                TokenType::Slash => BinaryOperator::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_term(nesting)?;
            left = Expr::binary(left, op, right);
        }

        Ok(left)
    }

    fn parse_term(&mut self, nesting: Nesting) -> ParseResult<Expr> {
        let token = self.current().clone();

        match token.token_type {
            TokenType::StringLiteral | TokenType::NumberLiteral | TokenType::BooleanLiteral => {
                self.advance();
                Ok(Expr::Literal(Literal::new(token.value)))
            }
            TokenType::Null => {
                self.advance();
                Ok(Expr::null())
            }
            TokenType::LParen => {
                self.advance();
                let inner = match nesting {
                    Nesting::Value => self.parse_value_expr()?,
                    Nesting::Condition => self.parse_expression()?,
                };
                self.expect(TokenType::RParen)?;
                Ok(inner)
            }
            TokenType::Minus => {
                self.advance();
                let operand = self.parse_term(nesting)?;
                Ok(Expr::unary(UnaryOperator::Minus, operand))
            }
            TokenType::Identifier => {
                if self.peek_type() == TokenType::LParen {
                    self.parse_function_call()
                } else {
                    Ok(Expr::Column(self.parse_column_ref()?))
                }
            }
            t if t.is_aggregate() => self.parse_aggregate(),
            _ => Err(self.error()),
        }
    }

    /// `name(expr, ...)`
    fn parse_function_call(&mut self) -> ParseResult<Expr> {
        let name = self.parse_identifier()?.to_lowercase();
        self.expect(TokenType::LParen)?;

        let mut args = Vec::new();
        loop {
            args.push(self.parse_expression()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }

        self.expect(TokenType::RParen)?;
        Ok(Expr::Function(FunctionCall { name, args }))
    }

    /// `COUNT(*)`, `COUNT(col)`, `SUM|AVG|MAX|MIN(col)`
    fn parse_aggregate(&mut self) -> ParseResult<Expr> {
        let token_type = self.current().token_type;
        let name = self.current().text().to_lowercase();
        self.advance();
        self.expect(TokenType::LParen)?;

        let arg = if token_type == TokenType::Count && self.match_token(TokenType::Star) {
            Expr::column("*")
        } else {
            Expr::Column(self.parse_column_ref()?)
        };

        self.expect(TokenType::RParen)?;
        Ok(Expr::Function(FunctionCall { name, args: vec![arg] }))
    }

    /// `name` or `table.name`
    fn parse_column_ref(&mut self) -> ParseResult<ColumnRef> {
        let first = self.parse_identifier()?;
        if self.match_token(TokenType::Dot) {
            let name = self.parse_identifier()?;
            Ok(ColumnRef::qualified(first, name))
        } else {
            Ok(ColumnRef::new(first))
        }
    }

    fn parse_column_ref_list(&mut self) -> ParseResult<Vec<ColumnRef>> {
        let mut list = Vec::new();
        loop {
            list.push(self.parse_column_ref()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(list)
    }

    fn parse_value_list(&mut self) -> ParseResult<Vec<Expr>> {
        let mut list = Vec::new();
        loop {
            list.push(self.parse_value_expr()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(list)
    }

    fn parse_identifier(&mut self) -> ParseResult<String> {
        if self.current().token_type == TokenType::Identifier {
            let name = self.current().text().to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.error())
        }
    }

    fn parse_identifier_list(&mut self) -> ParseResult<Vec<String>> {
        let mut list = Vec::new();
        loop {
            list.push(self.parse_identifier()?);
            if !self.match_token(TokenType::Comma) {
                break;
            }
        }
        Ok(list)
    }

    /// Non-negative integer literal (LIMIT, OFFSET, type lengths)
    fn parse_unsigned(&mut self) -> ParseResult<u64> {
        let token = self.current();
        if token.token_type == TokenType::NumberLiteral {
            if let Value::Integer(n) = token.value {
                if n >= 0 {
                    self.advance();
                    return Ok(n as u64);
                }
            }
        }
        Err(self.error())
    }

    fn current(&self) -> &Token {
        &self.tokens[self.position]
    }

    fn peek_type(&self) -> TokenType {
        self.tokens
            .get(self.position + 1)
            .map_or(TokenType::Eof, |t| t.token_type)
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn match_token(&mut self, token_type: TokenType) -> bool {
        if self.current().token_type == token_type {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token_type: TokenType) -> ParseResult<()> {
        if self.match_token(token_type) {
            Ok(())
        } else {
            Err(self.error())
        }
    }

    /// Error at the current token
    fn error(&self) -> ParseError {
        let token = self.current();
        if token.token_type == TokenType::Eof {
            return ParseError::UnexpectedEof;
        }
        ParseError::UnexpectedToken {
            value: token.value.to_string(),
            line: token.line,
            column: token.column,
        }
    }
}
