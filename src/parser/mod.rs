//! Parser module for shell scripts
//!
//! This module contains the lexer, the recursive descent parser and the
//! word and arithmetic sub-parsers.

pub mod types;
pub mod lexer;
pub mod arithmetic_parser;
pub mod word_parser;
pub mod compound_parser;
pub mod parser;

// Re-exports
pub use types::ParseException;
pub use lexer::{Lexer, LexerError, Token, TokenType};
pub use arithmetic_parser::{parse_arithmetic, ArithExpr, ArithSyntaxError};
pub use parser::{parse, Parser};
