//! continue - Continue loop iteration builtin
//!
//! continue [n]

use super::break_cmd::loop_levels;
use super::builtin_error;
use crate::interpreter::errors::{ContinueError, InterpreterError};
use crate::interpreter::types::{ExecResult, ShellContext};

pub fn handle_continue(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    if ctx.loop_depth == 0 {
        return Ok(builtin_error("continue", "not in while, until, select, or repeat loop"));
    }
    match loop_levels("continue", args) {
        Ok(levels) => Err(ContinueError::new(levels.min(ctx.loop_depth)).into()),
        Err(failure) => Ok(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continue() {
        let mut ctx = ShellContext::default();
        assert_eq!(handle_continue(&mut ctx, &[]).unwrap().exit_code, 1);
        ctx.loop_depth = 1;
        assert!(matches!(handle_continue(&mut ctx, &[]), Err(InterpreterError::Continue(_))));
    }
}
