//! Filename generation against the real filesystem

pub mod extended_glob;
pub mod glob_expander;

pub use glob_expander::{GlobExpander, GlobOptions};
