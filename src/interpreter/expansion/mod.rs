//! Expansion building blocks
//!
//! Pure helpers used by the word expansion driver in
//! `interpreter::word_expansion`.

pub mod brace_range;
pub mod command_substitution;
pub mod parameter_ops;
pub mod pattern;
pub mod prompt;
pub mod tilde;
pub mod word_split;
