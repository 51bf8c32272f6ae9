//! break - Exit from loops builtin
//!
//! break [n]

use super::builtin_error;
use crate::interpreter::errors::{BreakError, InterpreterError};
use crate::interpreter::types::{ExecResult, ShellContext};

/// Loop count argument shared by `break` and `continue`
pub(super) fn loop_levels(cmd: &str, args: &[String]) -> Result<u32, ExecResult> {
    match args {
        [] => Ok(1),
        [n] => match n.parse::<u32>() {
            Ok(levels) if levels >= 1 => Ok(levels),
            _ => Err(builtin_error(cmd, format!("argument is not positive: {}", n))),
        },
        _ => Err(builtin_error(cmd, "too many arguments")),
    }
}

/// Handle the break builtin command.
///
/// Outside a loop it prints a diagnostic and fails. A count larger than
/// the nesting depth leaves every enclosing loop.
pub fn handle_break(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    if ctx.loop_depth == 0 {
        return Ok(builtin_error("break", "not in while, until, select, or repeat loop"));
    }
    match loop_levels("break", args) {
        Ok(levels) => Err(BreakError::new(levels.min(ctx.loop_depth)).into()),
        Err(failure) => Ok(failure),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_break_outside_loop() {
        let mut ctx = ShellContext::default();
        let r = handle_break(&mut ctx, &[]).unwrap();
        assert_eq!(r.exit_code, 1);
        assert!(r.stderr.contains("not in while"));
    }

    #[test]
    fn test_break_levels_clamped() {
        let mut ctx = ShellContext::default();
        ctx.loop_depth = 2;
        match handle_break(&mut ctx, &["5".to_string()]) {
            Err(InterpreterError::Break(e)) => assert_eq!(e.levels, 2),
            other => panic!("unexpected: {:?}", other),
        }
        let r = handle_break(&mut ctx, &["0".to_string()]).unwrap();
        assert_eq!(r.exit_code, 1);
    }
}
