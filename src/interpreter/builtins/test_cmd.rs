//! test / [ - Evaluate conditional expressions
//!
//! test expr
//! [ expr ]
//!
//! Exit status 0 when true, 1 when false, 2 on a malformed expression.

use super::usage_error;
use crate::interpreter::conditionals::evaluate_test;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};

fn run_test(ctx: &ShellContext, cmd: &str, args: &[String]) -> ExecResult {
    match evaluate_test(ctx, args) {
        Ok(true) => ExecResult::ok(),
        Ok(false) => ExecResult::new(String::new(), String::new(), 1),
        Err(msg) => usage_error(cmd, msg),
    }
}

/// Handle the test builtin command
pub fn handle_test(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    Ok(run_test(ctx, "test", args))
}

pub fn handle_bracket(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    match args.split_last() {
        Some((last, rest)) if last == "]" => Ok(run_test(ctx, "[", rest)),
        _ => Ok(usage_error("[", "']' expected")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(cmd: &str, list: &[&str]) -> i32 {
        let mut ctx = ShellContext::default();
        let args: Vec<String> = list.iter().map(|s| s.to_string()).collect();
        let r = if cmd == "[" {
            handle_bracket(&mut ctx, &args).unwrap()
        } else {
            handle_test(&mut ctx, &args).unwrap()
        };
        r.exit_code
    }

    #[test]
    fn test_strings_and_numbers() {
        assert_eq!(status("test", &["abc"]), 0);
        assert_eq!(status("test", &[""]), 1);
        assert_eq!(status("test", &[]), 1);
        assert_eq!(status("test", &["-n", "x"]), 0);
        assert_eq!(status("test", &["3", "-lt", "10"]), 0);
        assert_eq!(status("test", &["a", "=", "b"]), 1);
        assert_eq!(status("test", &["!", "a", "=", "b"]), 0);
    }

    #[test]
    fn test_bracket_requires_close() {
        assert_eq!(status("[", &["-d", "/", "]"]), 0);
        assert_eq!(status("[", &["-d", "/"]), 2);
    }

    #[test]
    fn test_malformed_expression() {
        assert_eq!(status("test", &["1", "-eq", "x"]), 2);
        assert_eq!(status("test", &["a", "b", "c", "d", "e"]), 2);
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(status("test", &["x", "-o", "", "-a", ""]), 0);
        assert_eq!(status("test", &["", "-a", "x", "-o", "x"]), 0);
        assert_eq!(status("test", &["(", "", "-o", "x", ")", "-a", ""]), 1);
    }
}
