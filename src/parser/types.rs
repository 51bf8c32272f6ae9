//! Parse errors and the limits the parser enforces on its input.

use std::fmt;
use thiserror::Error;

use crate::parser::lexer::{LexerError, Token, TokenType};

/// Scripts larger than this are rejected before lexing
pub const MAX_INPUT_SIZE: usize = 1_000_000;
pub const MAX_TOKENS: usize = 100_000;
/// Nesting limit for compound commands
pub const MAX_PARSER_DEPTH: usize = 200;

/// Operators that start a redirection
pub fn is_redirection_token(t: TokenType) -> bool {
    matches!(
        t,
        TokenType::Less
            | TokenType::Great
            | TokenType::DLess
            | TokenType::DGreat
            | TokenType::LessAnd
            | TokenType::GreatAnd
            | TokenType::LessGreat
            | TokenType::DLessDash
            | TokenType::Clobber
            | TokenType::TLess
            | TokenType::AndGreat
            | TokenType::AndDGreat
    )
}

#[derive(Debug, Error)]
pub struct ParseException {
    pub message: String,
    pub line: usize,
    pub column: usize,
    pub token: Option<Token>,
}

impl fmt::Display for ParseException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {}, column {})", self.message, self.line, self.column)
    }
}

impl ParseException {
    pub fn new(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            message: message.into(),
            line,
            column,
            token: None,
        }
    }

    /// Error naming the token that was not expected here
    pub fn unexpected(token: &Token) -> Self {
        let shown = match token.token_type {
            TokenType::Eof => "end of file".to_string(),
            TokenType::Newline => "newline".to_string(),
            _ => format!("`{}'", token.value),
        };
        Self {
            message: format!("syntax error near unexpected token {}", shown),
            line: token.line,
            column: token.column,
            token: Some(token.clone()),
        }
    }
}

impl From<LexerError> for ParseException {
    fn from(err: LexerError) -> Self {
        Self::new(err.message, err.line, err.column)
    }
}
