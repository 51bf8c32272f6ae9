//! exit - Exit the shell
//!
//! exit [n]
//!
//! Inside a subshell or background job only that context ends. The EXIT
//! trap runs where the context is torn down.

use super::return_cmd::status_argument;
use crate::interpreter::errors::{ExitError, InterpreterError};
use crate::interpreter::types::{ExecResult, ShellContext};

pub fn handle_exit(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let code = status_argument(ctx, args)?;
    Err(ExitError::new(code & 0xff).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_wraps() {
        let mut ctx = ShellContext::default();
        match handle_exit(&mut ctx, &["256".to_string()]) {
            Err(InterpreterError::Exit(e)) => assert_eq!(e.exit_code, 0),
            other => panic!("unexpected: {:?}", other),
        }
        ctx.last_exit_code = 4;
        match handle_exit(&mut ctx, &[]) {
            Err(InterpreterError::Exit(e)) => assert_eq!(e.exit_code, 4),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
