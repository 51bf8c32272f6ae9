//! source / . - Execute commands from a file in the current shell
//!
//! source file [arg ...]
//!
//! A name without `/` is looked up in the current directory, then along
//! `$PATH`. Arguments replace the positional parameters for the duration.
//! `return` ends the sourced file.

use std::path::PathBuf;

use super::builtin_error;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::helpers::script::{parse_with_aliases, syntax_error_message};
use crate::interpreter::types::{ExecResult, ShellContext};

fn find_source_file(ctx: &ShellContext, name: &str) -> Option<PathBuf> {
    let direct = ctx.resolve_path(name);
    if name.contains('/') || direct.is_file() {
        return direct.is_file().then_some(direct);
    }
    let path_var = ctx.vars.get("PATH")?;
    path_var
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| PathBuf::from(dir).join(name))
        .find(|p| p.is_file())
}

pub fn handle_source(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let Some(name) = args.first() else {
        return Ok(builtin_error("source", "not enough arguments"));
    };
    let Some(path) = find_source_file(ctx, name) else {
        return Ok(builtin_error("source", format!("no such file or directory: {}", name)));
    };
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) => return Ok(builtin_error("source", format!("{}: {}", name, e))),
    };
    let script = match parse_with_aliases(ctx, &text) {
        Ok(script) => script,
        Err(e) => return Ok(ExecResult::failure_with_code(syntax_error_message(&e), 1)),
    };

    let saved_positional = (args.len() > 1).then(|| std::mem::replace(&mut ctx.positional, args[1..].to_vec()));
    ctx.last_exit_code = 0;
    let result = ExecutionEngine.execute_script(ctx, &script);
    if let Some(positional) = saved_positional {
        ctx.positional = positional;
    }

    match result {
        Err(InterpreterError::Return(e)) => Ok(ExecResult::new(e.stdout, e.stderr, e.exit_code)),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_source_sets_variables_and_args() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("lib.sh"), "greeting=\"hi $1\"\nreturn 3\necho unreachable\n").unwrap();
        let mut ctx = ShellContext::new(dir.path().to_path_buf(), std::env::vars().collect());
        let ast = parse("set -- outer; . ./lib.sh there; echo $? $greeting $1").unwrap();
        let r = ExecutionEngine.run_isolated(&mut ctx, &ast);
        assert_eq!(r.stdout, "3 hi there outer\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_source_missing_file() {
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        let r = handle_source(&mut ctx, &["definitely-missing.zsh".to_string()]).unwrap();
        assert_eq!(r.exit_code, 1);
        assert!(r.stderr.contains("no such file or directory"));
    }
}
