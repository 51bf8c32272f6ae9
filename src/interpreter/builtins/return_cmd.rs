//! return - Return from a function or sourced script
//!
//! return [n]
//!
//! The status is evaluated as an arithmetic expression and defaults to
//! the status of the last command.

use crate::interpreter::errors::{InterpreterError, ReturnError};
use crate::interpreter::types::{ExecResult, ShellContext};
use crate::interpreter::word_expansion::evaluate_arithmetic_text;

/// Status argument of `return` and `exit`
pub(super) fn status_argument(ctx: &mut ShellContext, args: &[String]) -> Result<i32, InterpreterError> {
    match args.first() {
        None => Ok(ctx.last_exit_code),
        Some(text) => match text.trim().parse::<i64>() {
            Ok(n) => Ok(n as i32),
            Err(_) => Ok(evaluate_arithmetic_text(ctx, text)?.as_int() as i32),
        },
    }
}

pub fn handle_return(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let code = status_argument(ctx, args)?;
    Err(ReturnError::new(code).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_return_codes() {
        let mut ctx = ShellContext::default();
        ctx.last_exit_code = 7;
        match handle_return(&mut ctx, &[]) {
            Err(InterpreterError::Return(e)) => assert_eq!(e.exit_code, 7),
            other => panic!("unexpected: {:?}", other),
        }
        match handle_return(&mut ctx, &["1+2".to_string()]) {
            Err(InterpreterError::Return(e)) => assert_eq!(e.exit_code, 3),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
