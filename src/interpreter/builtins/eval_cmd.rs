//! eval - Execute arguments as a shell command
//!
//! eval [arg ...]
//!
//! The arguments are joined with spaces, parsed with the current aliases
//! and run in the current context.

use crate::interpreter::errors::InterpreterError;
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::helpers::script::{parse_with_aliases, syntax_error_message};
use crate::interpreter::types::{ExecResult, ShellContext};

pub fn handle_eval(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let text = args.join(" ");
    if text.trim().is_empty() {
        return Ok(ExecResult::ok());
    }
    let script = match parse_with_aliases(ctx, &text) {
        Ok(script) => script,
        Err(e) => return Ok(ExecResult::failure_with_code(syntax_error_message(&e), 1)),
    };
    ctx.last_exit_code = 0;
    ExecutionEngine.execute_script(ctx, &script)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(script: &str) -> ExecResult {
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        ExecutionEngine.run_isolated(&mut ctx, &parse(script).unwrap())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_eval_runs_in_current_shell() {
        let r = run("cmd='x=5; echo $x'; eval $cmd; echo after $x");
        assert_eq!(r.stdout, "5\nafter 5\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_eval_syntax_error() {
        let r = run("eval 'if then'; echo $?");
        assert_eq!(r.stdout, "1\n");
        assert!(r.stderr.contains("syntax error"));
    }
}
