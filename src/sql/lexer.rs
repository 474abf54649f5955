//! SQL Lexer - converts SQL string into tokens

use super::token::{Token, TokenType};
use super::ParseResult;
use crate::error::ParseError;
use crate::types::Value;

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
        }
    }

    /// Tokenize the whole input. The last token is always `Eof`.
    pub fn tokenize(&mut self) -> ParseResult<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.token_type == TokenType::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    pub fn next_token(&mut self) -> ParseResult<Token> {
        loop {
            self.skip_whitespace();
            if self.is_eof() {
                break;
            }
            match (self.current_char(), self.peek_char()) {
                ('-', Some('-')) => self.skip_line_comment(),
                ('/', Some('*')) => self.skip_block_comment()?,
                _ => break,
            }
        }

        let line = self.line;
        let column = self.column;

        if self.is_eof() {
            return Ok(Token::new(TokenType::Eof, Value::Null, line, column));
        }

        let ch = self.current_char();

        match ch {
            '\'' => {
                let value = self.read_string(line, column)?;
                return Ok(Token::new(TokenType::StringLiteral, Value::Text(value), line, column));
            }
            '0'..='9' => {
                let value = self.read_number();
                return Ok(Token::new(TokenType::NumberLiteral, value, line, column));
            }
            'a'..='z' | 'A'..='Z' | '_' => {
                let word = self.read_identifier();
                return Ok(match TokenType::from_keyword(&word) {
                    Some(TokenType::BooleanLiteral) => Token::new(
                        TokenType::BooleanLiteral,
                        Value::Bool(word.eq_ignore_ascii_case("true")),
                        line,
                        column,
                    ),
                    Some(keyword) => Token::new(keyword, Value::Text(word), line, column),
                    None => Token::new(TokenType::Identifier, Value::Text(word), line, column),
                });
            }
            _ => {}
        }

        // Two-character operators first
        let two = match (ch, self.peek_char()) {
            ('<', Some('=')) => Some((TokenType::Le, "<=")),
            ('>', Some('=')) => Some((TokenType::Ge, ">=")),
            ('!', Some('=')) => Some((TokenType::Ne, "!=")),
            _ => None,
        };
        if let Some((token_type, text)) = two {
            self.advance();
            self.advance();
            return Ok(Token::new(token_type, Value::Text(text.to_string()), line, column));
        }

        let token_type = match ch {
            '=' => TokenType::Eq,
            '<' => TokenType::Lt,
            '>' => TokenType::Gt,
            '+' => TokenType::Plus,
            '-' => TokenType::Minus,
            '*' => TokenType::Star,
            '/' => TokenType::Slash,
            '(' => TokenType::LParen,
            ')' => TokenType::RParen,
            ',' => TokenType::Comma,
            ';' => TokenType::Semicolon,
            '.' => TokenType::Dot,
            _ => return Err(ParseError::IllegalCharacter { ch, line, column }),
        };
        self.advance();

        Ok(Token::new(token_type, Value::Text(ch.to_string()), line, column))
    }

    fn current_char(&self) -> char {
        if self.is_eof() {
            '\0'
        } else {
            self.input[self.position]
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        if !self.is_eof() {
            if self.input[self.position] == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.position += 1;
        }
    }

    fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && matches!(self.current_char(), ' ' | '\t' | '\n' | '\r') {
            self.advance();
        }
    }

    fn skip_line_comment(&mut self) {
        while !self.is_eof() && self.current_char() != '\n' {
            self.advance();
        }
    }

    fn skip_block_comment(&mut self) -> ParseResult<()> {
        let line = self.line;
        let column = self.column;
        self.advance(); // skip '/'
        self.advance(); // skip '*'

        while !self.is_eof() {
            if self.current_char() == '*' && self.peek_char() == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(ParseError::UnterminatedComment { line, column })
    }

    /// Single-quoted string; `''` inside the literal is one quote
    fn read_string(&mut self, line: usize, column: usize) -> ParseResult<String> {
        self.advance(); // skip opening quote
        let mut value = String::new();

        loop {
            if self.is_eof() {
                return Err(ParseError::UnterminatedString { line, column });
            }
            let ch = self.current_char();
            if ch == '\'' {
                if self.peek_char() == Some('\'') {
                    value.push('\'');
                    self.advance();
                    self.advance();
                    continue;
                }
                self.advance(); // skip closing quote
                return Ok(value);
            }
            value.push(ch);
            self.advance();
        }
    }

    /// `digits` or `digits.digits`; no sign, no exponent
    fn read_number(&mut self) -> Value {
        let mut text = String::new();

        while !self.is_eof() && self.current_char().is_ascii_digit() {
            text.push(self.current_char());
            self.advance();
        }

        let has_fraction = self.current_char() == '.'
            && self.peek_char().map_or(false, |c| c.is_ascii_digit());
        if has_fraction {
            text.push('.');
            self.advance();
            while !self.is_eof() && self.current_char().is_ascii_digit() {
                text.push(self.current_char());
                self.advance();
            }
            // digit runs always parse as f64
            return Value::Float(text.parse::<f64>().unwrap_or(f64::NAN));
        }

        match text.parse::<i64>() {
            Ok(i) => Value::Integer(i),
            // Out of i64 range
            Err(_) => Value::Float(text.parse::<f64>().unwrap_or(f64::INFINITY)),
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut value = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch.is_ascii_alphanumeric() || ch == '_' {
                value.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        value
    }
}

/// Tokenize `input` in one call
pub fn tokenize(input: &str) -> ParseResult<Vec<Token>> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(sql: &str) -> Vec<TokenType> {
        tokenize(sql).unwrap().into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn test_lexer_simple_select() {
        let tokens = tokenize("SELECT * FROM users").unwrap();

        assert_eq!(tokens.len(), 5); // SELECT, *, FROM, users, EOF
        assert_eq!(tokens[0].token_type, TokenType::Select);
        assert_eq!(tokens[1].token_type, TokenType::Star);
        assert_eq!(tokens[2].token_type, TokenType::From);
        assert_eq!(tokens[3].token_type, TokenType::Identifier);
        assert_eq!(tokens[3].value, Value::Text("users".into()));
        assert_eq!(tokens[4].token_type, TokenType::Eof);
    }

    #[test]
    fn test_lexer_keywords_ignore_case_identifiers_keep_it() {
        let tokens = tokenize("sElEcT UserName fRoM Accounts").unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Select);
        assert_eq!(tokens[1].value, Value::Text("UserName".into()));
        assert_eq!(tokens[2].token_type, TokenType::From);
        assert_eq!(tokens[3].value, Value::Text("Accounts".into()));
    }

    #[test]
    fn test_lexer_numbers() {
        let tokens = tokenize("42 3.14 7.").unwrap();
        assert_eq!(tokens[0].value, Value::Integer(42));
        assert_eq!(tokens[1].value, Value::Float(3.14));
        // Trailing dot is not part of the number
        assert_eq!(tokens[2].value, Value::Integer(7));
        assert_eq!(tokens[3].token_type, TokenType::Dot);
    }

    #[test]
    fn test_lexer_minus_is_separate_token() {
        assert_eq!(
            types("-5"),
            vec![TokenType::Minus, TokenType::NumberLiteral, TokenType::Eof]
        );
    }

    #[test]
    fn test_lexer_string_literal() {
        let tokens = tokenize("SELECT * FROM users WHERE name = 'John'").unwrap();
        assert_eq!(tokens[7].token_type, TokenType::StringLiteral);
        assert_eq!(tokens[7].value, Value::Text("John".into()));
    }

    #[test]
    fn test_lexer_escaped_quote() {
        let tokens = tokenize("'O''Brien' ''").unwrap();
        assert_eq!(tokens[0].value, Value::Text("O'Brien".into()));
        assert_eq!(tokens[1].value, Value::Text(String::new()));
    }

    #[test]
    fn test_lexer_booleans() {
        let tokens = tokenize("TRUE false True").unwrap();
        assert_eq!(tokens[0].token_type, TokenType::BooleanLiteral);
        assert_eq!(tokens[0].value, Value::Bool(true));
        assert_eq!(tokens[1].value, Value::Bool(false));
        assert_eq!(tokens[2].value, Value::Bool(true));
    }

    #[test]
    fn test_lexer_operators() {
        assert_eq!(
            types("= != < > <= >= + - * / , ; ( ) ."),
            vec![
                TokenType::Eq,
                TokenType::Ne,
                TokenType::Lt,
                TokenType::Gt,
                TokenType::Le,
                TokenType::Ge,
                TokenType::Plus,
                TokenType::Minus,
                TokenType::Star,
                TokenType::Slash,
                TokenType::Comma,
                TokenType::Semicolon,
                TokenType::LParen,
                TokenType::RParen,
                TokenType::Dot,
                TokenType::Eof,
            ]
        );
        // No whitespace needed between operator and operand
        assert_eq!(
            types("a<=1"),
            vec![TokenType::Identifier, TokenType::Le, TokenType::NumberLiteral, TokenType::Eof]
        );
    }

    #[test]
    fn test_lexer_comments() {
        let tokens = tokenize("SELECT * -- this is a comment\nFROM users").unwrap();
        assert_eq!(tokens.len(), 5);
        assert_eq!(tokens[2].token_type, TokenType::From);
        assert_eq!(tokens[2].line, 2);

        let tokens = tokenize("SELECT /* multi\nline */ id").unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].line, 2);
        assert_eq!(tokens[1].column, 9);
    }

    #[test]
    fn test_lexer_positions() {
        let tokens = tokenize("SELECT\n  name").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn test_lexer_errors() {
        assert!(matches!(
            tokenize("SELECT * FROM users WHERE name = 'Alice"),
            Err(ParseError::UnterminatedString { line: 1, column: 34 })
        ));
        assert!(matches!(
            tokenize("SELECT /* never closed"),
            Err(ParseError::UnterminatedComment { .. })
        ));
        assert_eq!(
            tokenize("SELECT @x"),
            Err(ParseError::IllegalCharacter { ch: '@', line: 1, column: 8 })
        );
        assert!(matches!(tokenize("a ! b"), Err(ParseError::IllegalCharacter { ch: '!', .. })));
    }

    #[test]
    fn test_lexer_empty_input() {
        assert_eq!(types("   \n\t "), vec![TokenType::Eof]);
    }
}
