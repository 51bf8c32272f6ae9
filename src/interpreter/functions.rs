//! Function Handling
//!
//! A call rebinds the positional parameters, pushes a local-variable
//! scope and runs the body in the current context. `return` unwinds as a
//! `ReturnError` and becomes the call's status. `$0` names the function
//! while it runs.

use crate::ast::types::FunctionDefNode;
use crate::interpreter::errors::{ExecutionLimitError, InterpreterError, LimitType};
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::types::{ExecResult, ShellContext};

/// Call depth limit: `FUNCNEST` when set, otherwise the configured limit
fn max_depth(ctx: &ShellContext) -> u32 {
    ctx.vars
        .get("FUNCNEST")
        .and_then(|v| v.parse::<u32>().ok())
        .map_or(ctx.limits.max_call_depth, |n| n.min(ctx.limits.max_call_depth))
}

/// Invoke `def` with `argv[0]` as its name and the rest as `$1..`
pub fn call_function(
    ctx: &mut ShellContext,
    def: &FunctionDefNode,
    argv: &[String],
) -> Result<ExecResult, InterpreterError> {
    if ctx.call_depth >= max_depth(ctx) {
        return Err(ExecutionLimitError::new(
            format!("{}: maximum nested function level reached; increase FUNCNEST?", def.name),
            LimitType::Recursion,
        )
        .into());
    }

    let saved_positional = std::mem::replace(&mut ctx.positional, argv.iter().skip(1).cloned().collect());
    let saved_name = std::mem::replace(&mut ctx.script_name, def.name.clone());
    ctx.push_scope();
    ctx.call_depth += 1;

    let result = ExecutionEngine.execute_with_redirections(ctx, &def.redirections, |ctx| {
        ExecutionEngine.execute_compound_command(ctx, &def.body)
    });

    ctx.call_depth -= 1;
    ctx.pop_scope();
    ctx.script_name = saved_name;
    ctx.positional = saved_positional;

    match result {
        Err(InterpreterError::Return(e)) => Ok(ExecResult::new(e.stdout, e.stderr, e.exit_code)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(script: &str) -> ExecResult {
        let mut ctx = ShellContext::default();
        let ast = parse(script).unwrap();
        ExecutionEngine.run_isolated(&mut ctx, &ast)
    }

    #[test]
    fn test_positional_rebinding() {
        let r = run("set -- outer; f() { echo $# $1 $0; }; f a b; echo $1");
        assert_eq!(r.stdout, "2 a f\nouter\n");
    }

    #[test]
    fn test_return_status() {
        let r = run("f() { return 3; echo no; }; f; echo $?");
        assert_eq!(r.stdout, "3\n");
    }

    #[test]
    fn test_local_scope() {
        let r = run("x=global; f() { local x=inner; echo $x; }; f; echo $x");
        assert_eq!(r.stdout, "inner\nglobal\n");
    }

    #[test]
    fn test_recursion_limit() {
        let r = run("FUNCNEST=20; f() { f; }; f");
        assert_eq!(r.exit_code, 126);
        assert!(r.stderr.contains("maximum nested function level"));
    }

    #[test]
    fn test_function_redirection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let r = run(&format!("f() {{ echo logged; }} > {0}; f; echo shown; cat {0}", path.display()));
        assert_eq!(r.stdout, "shown\nlogged\n");
    }
}
