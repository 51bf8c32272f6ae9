//! Abstract Syntax Tree (AST) Types for the Shell
//!
//! Architecture:
//!   Input → Lexer → Parser → AST → Expander → ExecutionEngine → Output

pub mod types;
