//! local - Declare function-local variables
//!
//! local [-aAirx] [name[=value] ...]
//!
//! Accepts the attribute flags of `typeset`. A new local starts out empty
//! and is restored to its previous value when the function returns.

use super::declare_cmd::{run_declaration, Attributes};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};

pub fn handle_local(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let attrs = Attributes {
        local: true,
        ..Attributes::default()
    };
    run_declaration(ctx, "local", args, attrs)
}
