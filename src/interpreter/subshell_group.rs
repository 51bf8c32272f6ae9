//! Subshells, Groups and Background Jobs
//!
//! `( ... )` runs against a copy of the context, so nothing it changes
//! (variables, cwd, options, `exit`) reaches the parent. `{ ...; }` runs in
//! the current context.
//!
//! `cmd &` becomes a job. A lone external command is spawned as a real
//! process in its own process group; anything else runs on a thread with
//! a cancel flag and a virtual pid.

use std::io::Read;
use std::process::Stdio;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::ast::types::{CommandNode, GroupNode, ScriptNode, StatementNode, SubshellNode};
use crate::interpreter::builtin_dispatch::is_builtin;
use crate::interpreter::command_resolution::find_command_path;
use crate::interpreter::errors::{InterpreterError, RuntimeError};
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::jobs::{JobHandle, JobTable};
use crate::interpreter::process::{spawn, SpawnSpec};
use crate::interpreter::types::{ExecResult, Input, ShellContext};
use crate::interpreter::word_expansion::expand_words;

/// Stack for background job threads; deep recursion must hit the call
/// depth limit first
const JOB_STACK_SIZE: usize = 64 * 1024 * 1024;

pub fn execute_subshell(ctx: &mut ShellContext, node: &SubshellNode) -> Result<ExecResult, InterpreterError> {
    let mut child = ctx.subshell();
    let result = ExecutionEngine.run_isolated_statements(&mut child, &node.body);
    Ok(result)
}

pub fn execute_group(ctx: &mut ShellContext, node: &GroupNode) -> Result<ExecResult, InterpreterError> {
    ExecutionEngine.execute_statements(ctx, &node.body)
}

fn job_table_error() -> InterpreterError {
    RuntimeError::new("job table unavailable", 1).into()
}

/// Start `statement` as a background job
pub fn spawn_background(ctx: &mut ShellContext, statement: &StatementNode) -> Result<ExecResult, InterpreterError> {
    let command_text = statement.source_text.trim_end_matches('&').trim().to_string();

    let (job_id, pid) = match external_argv(ctx, statement)? {
        Some(argv) => spawn_process_job(ctx, argv, &command_text)?,
        None => spawn_thread_job(ctx, statement, &command_text)?,
    };

    ctx.last_bg_pid = Some(pid);
    ctx.last_exit_code = 0;
    let mut result = ExecResult::ok();
    if ctx.options.monitor {
        result.stderr = format!("[{}] {}\n", job_id, pid);
    }
    Ok(result)
}

/// Expanded argv when the job is a single external command without
/// assignments or redirections
fn external_argv(ctx: &mut ShellContext, statement: &StatementNode) -> Result<Option<Vec<String>>, InterpreterError> {
    let [pipeline] = statement.pipelines.as_slice() else {
        return Ok(None);
    };
    let [CommandNode::Simple(simple)] = pipeline.commands.as_slice() else {
        return Ok(None);
    };
    if pipeline.negated || !simple.assignments.is_empty() || !simple.redirections.is_empty() {
        return Ok(None);
    }
    let Some(name) = &simple.name else {
        return Ok(None);
    };
    let literal_name = match name.parts.as_slice() {
        [crate::ast::types::WordPart::Literal(s)] => s.as_str(),
        _ => return Ok(None),
    };
    if is_builtin(literal_name)
        || ctx.functions.contains_key(literal_name)
        || find_command_path(ctx, literal_name).is_none()
    {
        return Ok(None);
    }

    let mut words = vec![name.clone()];
    words.extend(simple.args.iter().cloned());
    let argv = expand_words(ctx, &words)?;
    Ok(Some(argv))
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut bytes = Vec::new();
        let _ = reader.read_to_end(&mut bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn spawn_process_job(
    ctx: &mut ShellContext,
    argv: Vec<String>,
    command_text: &str,
) -> Result<(usize, u32), InterpreterError> {
    let Some(program) = find_command_path(ctx, &argv[0]) else {
        return Err(RuntimeError::new(format!("command not found: {}", argv[0]), 127).into());
    };
    let io_error = |e: std::io::Error| -> InterpreterError { RuntimeError::new(format!("{}: {}", argv[0], e), 126).into() };

    let (out_reader, out_writer) = os_pipe::pipe().map_err(io_error)?;
    let (err_reader, err_writer) = os_pipe::pipe().map_err(io_error)?;
    let env = ctx.child_env();
    let spec = SpawnSpec {
        program: &program,
        argv: &argv,
        env: &env,
        cwd: &ctx.cwd,
        new_process_group: true,
    };
    let child = spawn(&spec, Stdio::null(), out_writer.into(), err_writer.into()).map_err(io_error)?;
    let pid = child.id();
    let handle = JobHandle::Process {
        child,
        stdout: Some(drain(out_reader)),
        stderr: Some(drain(err_reader)),
    };
    let id = ctx
        .jobs
        .lock()
        .map_err(|_| job_table_error())?
        .add_job(pid, pid, command_text, handle);
    Ok((id, pid))
}

fn spawn_thread_job(
    ctx: &mut ShellContext,
    statement: &StatementNode,
    command_text: &str,
) -> Result<(usize, u32), InterpreterError> {
    let cancel = Arc::new(AtomicBool::new(false));
    let children = Arc::new(Mutex::new(Vec::new()));

    let mut job_ctx = ctx.subshell();
    job_ctx.stdin = Input::Empty;
    job_ctx.cancel = Some(cancel.clone());
    job_ctx.spawned_pids = Some(children.clone());
    // The job's own `&` children live in its own table
    job_ctx.jobs = Arc::new(Mutex::new(JobTable::new()));

    let mut foreground = statement.clone();
    foreground.background = false;
    let script = ScriptNode {
        statements: vec![foreground],
    };

    let handle = std::thread::Builder::new()
        .name("zshell-job".to_string())
        .stack_size(JOB_STACK_SIZE)
        .spawn(move || ExecutionEngine.run_isolated(&mut job_ctx, &script))
        .map_err(|e| RuntimeError::new(format!("cannot start job: {}", e), 1))?;

    let mut jobs = ctx.jobs.lock().map_err(|_| job_table_error())?;
    let pid = jobs.allocate_virtual_pid();
    let id = jobs.add_job(
        pid,
        pid,
        command_text,
        JobHandle::Thread {
            handle: Some(handle),
            cancel,
            children,
        },
    );
    Ok((id, pid))
}
