//! Small utilities shared by builtins and the engine.

pub mod file_tests;
pub mod quoting;
pub mod script;
pub mod xtrace;
