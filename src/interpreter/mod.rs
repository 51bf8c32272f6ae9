//! Interpreter module
//!
//! Executes parsed scripts: word expansion, command resolution, pipelines,
//! redirections, control flow, functions, traps and job control.

pub mod arithmetic;
pub mod assoc_arrays;
pub mod builtin_dispatch;
pub mod builtins;
pub mod command_resolution;
pub mod completion;
pub mod conditionals;
pub mod control_flow;
pub mod errors;
pub mod execution_engine;
pub mod expansion;
pub mod functions;
pub mod helpers;
pub mod history;
pub mod jobs;
pub mod pipeline_execution;
pub mod process;
pub mod redirections;
pub mod simple_command_assignments;
pub mod subshell_group;
pub mod traps;
pub mod types;
pub mod word_expansion;
pub mod zsh_options;

pub use errors::*;
pub use execution_engine::ExecutionEngine;
pub use types::*;
