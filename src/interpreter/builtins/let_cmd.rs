//! let - Evaluate arithmetic expressions
//!
//! let expr [expr ...]
//!
//! Status is 0 when the last expression is non-zero, 1 otherwise.

use super::builtin_error;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};
use crate::interpreter::word_expansion::evaluate_arithmetic_text;

pub fn handle_let(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    if args.is_empty() {
        return Ok(builtin_error("let", "not enough arguments"));
    }
    let mut last = false;
    for expr in args {
        last = evaluate_arithmetic_text(ctx, expr)?.is_true();
    }
    Ok(ExecResult::new(String::new(), String::new(), if last { 0 } else { 1 }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_let_assigns_and_reports() {
        let mut ctx = ShellContext::default();
        let r = handle_let(&mut ctx, &args(&["x=5", "y=x*2"])).unwrap();
        assert_eq!(r.exit_code, 0);
        assert_eq!(ctx.get_var("y").as_deref(), Some("10"));
        let r = handle_let(&mut ctx, &args(&["x-5"])).unwrap();
        assert_eq!(r.exit_code, 1);
    }

    #[test]
    fn test_let_errors() {
        let mut ctx = ShellContext::default();
        assert!(handle_let(&mut ctx, &args(&["1/0"])).is_err());
        assert_eq!(handle_let(&mut ctx, &[]).unwrap().exit_code, 1);
    }
}
