//! zshell - A POSIX shell with a ZSH-compatible surface
//!
//! This library parses shell scripts into an AST and executes them against
//! a process/environment model: pipelines, redirections, job control,
//! parameter and arithmetic expansion, globbing, functions, associative
//! arrays and `setopt` options.
//!
//! Architecture:
//!   Input → Lexer → Parser → AST → Expander → ExecutionEngine → ExecResult

pub mod ast;
pub mod interpreter;
pub mod parser;
pub mod shell;
pub mod zshell;

pub use ast::types::*;
pub use interpreter::{ExecResult, ShellContext};
pub use parser::{parse, ParseException, Parser};
pub use zshell::{ExecOptions, Shell, ShellConfig};
