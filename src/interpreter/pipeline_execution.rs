//! Pipeline Execution
//!
//! Every stage but the last runs on its own thread against a subshell copy
//! of the context, connected to the next stage by an OS pipe. External
//! commands write into the pipe directly; in-process commands (builtins,
//! functions, compound commands) have their captured output copied in when
//! they finish. The last stage runs in the current context, so
//! `echo x | read v` sets `v`.
//!
//! The pipeline's status is the last stage's, or under pipefail the last
//! non-zero stage status. `!` negates it. All statuses are recorded in
//! `pipestatus`/`PIPESTATUS`.

use std::io::Write;
use std::thread::JoinHandle;

use crate::ast::types::{CommandNode, PipelineNode};
use crate::interpreter::assoc_arrays::ShellArray;
use crate::interpreter::errors::{InterpreterError, RuntimeError};
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::types::{ExecResult, Input, ShellContext};

/// Execute a pipeline
pub fn execute_pipeline(ctx: &mut ShellContext, pipeline: &PipelineNode) -> Result<ExecResult, InterpreterError> {
    let mut result = match pipeline.commands.as_slice() {
        [] => ExecResult::ok(),
        [only] => {
            let r = ExecutionEngine.execute_command(ctx, only)?;
            set_pipestatus(ctx, &[r.exit_code]);
            r
        }
        commands => {
            let (mut r, statuses) = run_stages(ctx, commands, &pipeline.pipe_stderr)?;
            set_pipestatus(ctx, &statuses);
            r.exit_code = pipeline_status(&statuses, ctx.options.pipefail);
            r
        }
    };
    if pipeline.negated {
        result.exit_code = if result.exit_code == 0 { 1 } else { 0 };
    }
    Ok(result)
}

/// Status of a pipeline from its stage statuses
pub fn pipeline_status(statuses: &[i32], pipefail: bool) -> i32 {
    if pipefail {
        statuses.iter().rev().find(|&&s| s != 0).copied().unwrap_or(0)
    } else {
        statuses.last().copied().unwrap_or(0)
    }
}

pub fn set_pipestatus(ctx: &mut ShellContext, statuses: &[i32]) {
    let values: Vec<String> = statuses.iter().map(|s| s.to_string()).collect();
    for name in ["pipestatus", "PIPESTATUS"] {
        ctx.vars.remove(name);
        ctx.arrays.insert(name, ShellArray::from_values(values.clone()));
    }
}

/// Output a finished upstream stage leaves behind: its status and stderr
struct StageOutcome {
    status: i32,
    stderr: String,
}

fn pipe_error(e: std::io::Error) -> InterpreterError {
    RuntimeError::new(format!("cannot create pipe: {}", e), 1).into()
}

fn run_stages(
    ctx: &mut ShellContext,
    commands: &[CommandNode],
    pipe_stderr: &[bool],
) -> Result<(ExecResult, Vec<i32>), InterpreterError> {
    let (upstream, last) = commands.split_at(commands.len() - 1);
    let mut handles: Vec<JoinHandle<StageOutcome>> = Vec::with_capacity(upstream.len());
    let mut input: Option<Input> = None;

    for (i, command) in upstream.iter().enumerate() {
        let (reader, writer) = os_pipe::pipe().map_err(pipe_error)?;
        let mut stage_ctx = ctx.subshell();
        if let Some(stdin) = input.take() {
            stage_ctx.stdin = stdin;
        }
        let merge_stderr = pipe_stderr.get(i).copied().unwrap_or(false);
        if matches!(command, CommandNode::Simple(_)) {
            stage_ctx.stage.stdout = Some(writer.try_clone().map_err(pipe_error)?);
            stage_ctx.stage.merge_stderr = merge_stderr;
        }
        let command = command.clone();
        handles.push(std::thread::spawn(move || {
            run_upstream_stage(stage_ctx, &command, writer, merge_stderr)
        }));
        input = Some(Input::from_pipe(reader));
    }

    let saved_stdin = input.map(|pipe| std::mem::replace(&mut ctx.stdin, pipe));
    let last_result = ExecutionEngine.execute_command(ctx, &last[0]);
    if let Some(stdin) = saved_stdin {
        ctx.stdin = stdin;
    }

    let mut statuses = Vec::with_capacity(commands.len());
    let mut stderr = String::new();
    for handle in handles {
        match handle.join() {
            Ok(outcome) => {
                statuses.push(outcome.status);
                stderr.push_str(&outcome.stderr);
            }
            Err(_) => statuses.push(1),
        }
    }

    let mut result = last_result.map_err(|e| e.prepend_output("", &stderr))?;
    statuses.push(result.exit_code);
    result.stderr.insert_str(0, &stderr);
    Ok((result, statuses))
}

fn run_upstream_stage(
    mut ctx: ShellContext,
    command: &CommandNode,
    mut writer: os_pipe::PipeWriter,
    merge_stderr: bool,
) -> StageOutcome {
    let result = match ExecutionEngine.execute_command(&mut ctx, command) {
        Ok(r) => r,
        Err(e) => ExecResult::new(e.stdout().to_string(), e.stderr().to_string(), e.exit_code()),
    };
    // Unused wiring must close before the reader can see end of file
    ctx.stage.stdout = None;
    drop(ctx);

    let mut stderr = result.stderr;
    // A reader that exits early closes the pipe; the write error is expected
    let _ = writer.write_all(result.stdout.as_bytes());
    if merge_stderr {
        let _ = writer.write_all(stderr.as_bytes());
        stderr.clear();
    }
    StageOutcome {
        status: result.exit_code,
        stderr,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run(script: &str) -> (ExecResult, ShellContext) {
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        let ast = parse(script).unwrap();
        let r = ExecutionEngine.run_isolated(&mut ctx, &ast);
        (r, ctx)
    }

    #[test]
    fn test_pipeline_status() {
        assert_eq!(pipeline_status(&[1, 0], false), 0);
        assert_eq!(pipeline_status(&[0, 1], false), 1);
        assert_eq!(pipeline_status(&[2, 0, 0], true), 2);
        assert_eq!(pipeline_status(&[2, 3, 0], true), 3);
        assert_eq!(pipeline_status(&[0, 0], true), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_false_true_statuses() {
        assert_eq!(run("false | true").0.exit_code, 0);
        assert_eq!(run("true | false").0.exit_code, 1);
        assert_eq!(run("! true | false").0.exit_code, 0);
        assert_eq!(run("set -o pipefail; false | true").0.exit_code, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_builtin_stages() {
        let (r, _) = run("echo hello | cat");
        assert_eq!(r.stdout, "hello\n");
        let (r, _) = run("printf 'b\\na\\n' | sort | head -n 1");
        assert_eq!(r.stdout, "a\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_last_stage_runs_in_current_shell() {
        let (r, _) = run("echo value | read v; echo $v");
        assert_eq!(r.stdout, "value\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pipestatus_and_stderr_pipe() {
        let (r, ctx) = run("true | false | true; echo ${pipestatus[@]}");
        assert_eq!(r.stdout, "0 1 0\n");
        assert!(ctx.arrays.contains("PIPESTATUS"));
        let (r, _) = run("{ echo out; echo err >&2; } |& cat");
        assert_eq!(r.stdout, "out\nerr\n");
        assert_eq!(r.stderr, "");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_early_reader_exit() {
        let (r, _) = run("yes | head -n 2");
        assert_eq!(r.stdout, "y\ny\n");
    }
}
