//! Command Resolution
//!
//! Runs a simple command: expands its words, applies prefix assignments and
//! redirections, then finds what the name refers to in this order:
//!
//! special builtins -> functions -> builtins -> `$PATH`
//!
//! External commands get real file descriptors: redirected files are handed
//! over directly, pipeline stages write straight into their pipe, anything
//! else is captured through a pipe and returned as text. Scripts whose `#!`
//! names a shell (or that have no `#!` and cannot be executed) run in a
//! fresh interpreter context instead of a new process.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::thread::JoinHandle;

use crate::ast::types::SimpleCommandNode;
use crate::interpreter::builtin_dispatch::{is_builtin, is_special_builtin, lookup_builtin};
use crate::interpreter::builtins::type_cmd::describe_commands;
use crate::interpreter::errors::{ExitError, InterpreterError, RuntimeError};
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::functions::call_function;
use crate::interpreter::helpers::quoting::quote_value;
use crate::interpreter::helpers::script::syntax_error_message;
use crate::interpreter::helpers::xtrace::trace_command;
use crate::interpreter::process::{
    exit_code_of, find_in_path, is_executable, is_shell_interpreter, shebang, spawn, SpawnFailure, SpawnSpec,
};
use crate::interpreter::redirections::{
    apply_redirections, install_stdin, persist_redirections, route_output, route_result, InputSource,
    OutputTarget, RedirectPlan,
};
use crate::interpreter::simple_command_assignments::{
    apply_assignments, expand_prefix_assignments, TemporaryAssignments,
};
use crate::interpreter::types::{ExecResult, Input, ShellContext};
use crate::interpreter::word_expansion::{expand_word_fields, finish_substitutions};

/// Reserved words, as reported by `type` and `whence`
pub const RESERVED_WORDS: &[&str] = &[
    "!", "[[", "]]", "{", "}", "case", "do", "done", "elif", "else", "end", "esac", "fi", "for", "foreach",
    "function", "if", "in", "repeat", "select", "then", "time", "until", "while",
];

/// Which kinds of command a lookup may find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Any,
    /// `command name`
    SkipFunctions,
    /// `builtin name`
    BuiltinsOnly,
}

/// One meaning of a command name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandKind {
    Alias(String),
    Keyword,
    Function,
    SpecialBuiltin,
    Builtin,
    File(PathBuf),
}

/// Everything `name` could refer to, in lookup order. Aliases and
/// keywords come first since the parser sees them before lookup happens.
pub fn classify_command(ctx: &ShellContext, name: &str, all_paths: bool) -> Vec<CommandKind> {
    let mut kinds = Vec::new();
    if let Some(value) = ctx.aliases.get(name) {
        kinds.push(CommandKind::Alias(value.clone()));
    }
    if RESERVED_WORDS.contains(&name) {
        kinds.push(CommandKind::Keyword);
    }
    if is_special_builtin(name) {
        kinds.push(CommandKind::SpecialBuiltin);
    }
    if ctx.functions.contains_key(name) {
        kinds.push(CommandKind::Function);
    }
    if is_builtin(name) && !is_special_builtin(name) {
        kinds.push(CommandKind::Builtin);
    }
    if all_paths {
        kinds.extend(find_all_in_path(ctx, name).into_iter().map(CommandKind::File));
    } else if let Some(path) = find_command_path(ctx, name) {
        kinds.push(CommandKind::File(path));
    }
    kinds
}

/// The executable `name` would run, if any
pub fn find_command_path(ctx: &ShellContext, name: &str) -> Option<PathBuf> {
    find_in_path(name, ctx.vars.get("PATH").map(String::as_str), &ctx.cwd).filter(|p| is_executable(p))
}

fn find_all_in_path(ctx: &ShellContext, name: &str) -> Vec<PathBuf> {
    if name.contains('/') {
        return find_command_path(ctx, name).into_iter().collect();
    }
    let path_var = ctx.vars.get("PATH").map(String::as_str).unwrap_or("/usr/local/bin:/usr/bin:/bin");
    path_var
        .split(':')
        .map(|dir| if dir.is_empty() { ctx.cwd.clone() } else { PathBuf::from(dir) })
        .map(|dir| dir.join(name))
        .filter(|p| is_executable(p))
        .collect()
}

// ============================================================================
// Simple commands
// ============================================================================

/// Pipe wiring handed down by a pipeline stage
#[derive(Debug, Default)]
struct StageOutput {
    writer: Option<os_pipe::PipeWriter>,
    merge_stderr: bool,
}

/// Execute a simple command
pub fn execute_simple_command(
    ctx: &mut ShellContext,
    node: &SimpleCommandNode,
) -> Result<ExecResult, InterpreterError> {
    if node.line > 0 {
        ctx.current_line = node.line;
    }
    ctx.last_subst_status = None;
    let stage = StageOutput {
        writer: ctx.stage.stdout.take(),
        merge_stderr: std::mem::take(&mut ctx.stage.merge_stderr),
    };

    let result = run_simple_command(ctx, node, stage);
    let substituted = finish_substitutions(ctx);
    match result {
        Ok(mut r) => {
            r.stdout.push_str(&substituted.stdout);
            r.stderr.push_str(&substituted.stderr);
            Ok(r)
        }
        Err(e) => Err(e),
    }
}

fn run_simple_command(
    ctx: &mut ShellContext,
    node: &SimpleCommandNode,
    stage: StageOutput,
) -> Result<ExecResult, InterpreterError> {
    let mut argv = Vec::new();
    for word in node.name.iter().chain(&node.args) {
        argv.extend(expand_word_fields(ctx, word)?);
    }

    if argv.is_empty() {
        let traced = apply_assignments(ctx, &node.assignments)?;
        apply_redirections(ctx, RedirectPlan::from_shell_fds(ctx), &node.redirections)?;
        let stderr = trace_command(ctx, &traced, &[]).unwrap_or_default();
        // `x=$(false)` takes the substitution's status
        let status = ctx.last_subst_status.unwrap_or(0);
        return Ok(ExecResult::new(String::new(), stderr, status));
    }

    let prefix = expand_prefix_assignments(ctx, &node.assignments)?;
    let plan = apply_redirections(ctx, RedirectPlan::from_shell_fds(ctx), &node.redirections)?;
    let traced: Vec<String> = prefix.iter().map(|(n, v)| format!("{}={}", n, quote_value(v))).collect();
    let trace = trace_command(ctx, &traced, &argv).unwrap_or_default();

    match dispatch(ctx, &argv, &prefix, &plan, Lookup::Any, stage) {
        Ok(mut r) => {
            r.stderr.insert_str(0, &trace);
            Ok(r)
        }
        Err(e) => Err(e.prepend_output("", &trace)),
    }
}

/// Find and run `argv[0]`
fn dispatch(
    ctx: &mut ShellContext,
    argv: &[String],
    prefix: &[(String, String)],
    plan: &RedirectPlan,
    lookup: Lookup,
    stage: StageOutput,
) -> Result<ExecResult, InterpreterError> {
    let name = argv[0].as_str();

    if lookup == Lookup::Any && !is_special_builtin(name) {
        if let Some(def) = ctx.functions.get(name).cloned() {
            return run_in_process(ctx, prefix, plan, |ctx| call_function(ctx, &def, argv));
        }
    }

    if let Some(builtin) = lookup_builtin(name) {
        return match builtin.handler() {
            Some(handler) => run_in_process(ctx, prefix, plan, |ctx| handler(ctx, &argv[1..])),
            None => run_precommand(ctx, argv, prefix, plan, stage),
        };
    }

    if lookup == Lookup::BuiltinsOnly {
        let msg = format!("zshell: no such builtin: {}\n", name);
        return route_output(plan, ExecResult::failure(msg));
    }

    run_external(ctx, argv, prefix, plan, stage)
}

/// Builtins and functions: stdin swapped in, prefix assignments in effect,
/// captured output routed afterwards
fn run_in_process<F>(
    ctx: &mut ShellContext,
    prefix: &[(String, String)],
    plan: &RedirectPlan,
    body: F,
) -> Result<ExecResult, InterpreterError>
where
    F: FnOnce(&mut ShellContext) -> Result<ExecResult, InterpreterError>,
{
    let saved_stdin = install_stdin(ctx, plan);
    let result = match TemporaryAssignments::apply(ctx, prefix) {
        Ok(temp) => {
            let result = body(ctx);
            temp.restore(ctx);
            result
        }
        Err(e) => Err(e),
    };
    if let Some(stdin) = saved_stdin {
        ctx.stdin = stdin;
    }
    route_result(plan, result)
}

/// Leading single-letter options of a precommand modifier
fn split_modifier_options<'a>(args: &'a [String], allowed: &str) -> (Vec<char>, &'a [String]) {
    let mut flags = Vec::new();
    let mut i = 0;
    while let Some(arg) = args.get(i) {
        if arg == "--" {
            i += 1;
            break;
        }
        let Some(letters) = arg.strip_prefix('-') else { break };
        if letters.is_empty() || !letters.chars().all(|c| allowed.contains(c)) {
            break;
        }
        flags.extend(letters.chars());
        i += 1;
    }
    (flags, &args[i..])
}

/// `command`, `builtin` and `exec`
fn run_precommand(
    ctx: &mut ShellContext,
    argv: &[String],
    prefix: &[(String, String)],
    plan: &RedirectPlan,
    stage: StageOutput,
) -> Result<ExecResult, InterpreterError> {
    match argv[0].as_str() {
        "command" => {
            let (flags, rest) = split_modifier_options(&argv[1..], "pvV");
            if flags.contains(&'v') || flags.contains(&'V') {
                let result = describe_commands(ctx, rest, flags.contains(&'V'));
                return route_output(plan, result);
            }
            if rest.is_empty() {
                return Ok(ExecResult::ok());
            }
            dispatch(ctx, rest, prefix, plan, Lookup::SkipFunctions, stage)
        }
        "builtin" => {
            if argv.len() < 2 {
                return Ok(ExecResult::ok());
            }
            dispatch(ctx, &argv[1..], prefix, plan, Lookup::BuiltinsOnly, stage)
        }
        _ => run_exec(ctx, argv, prefix, plan, stage),
    }
}

/// `exec [-cl] [-a name] [command [args]]`
fn run_exec(
    ctx: &mut ShellContext,
    argv: &[String],
    prefix: &[(String, String)],
    plan: &RedirectPlan,
    stage: StageOutput,
) -> Result<ExecResult, InterpreterError> {
    let mut rest = &argv[1..];
    let mut arg0: Option<String> = None;
    let mut clear_env = false;
    while let Some(arg) = rest.first() {
        match arg.as_str() {
            "-a" => {
                let Some(name) = rest.get(1) else {
                    return Ok(ExecResult::failure_with_code("zshell: exec: -a: argument expected\n", 1));
                };
                arg0 = Some(name.clone());
                rest = &rest[2..];
            }
            "-c" => {
                clear_env = true;
                rest = &rest[1..];
            }
            "-l" => rest = &rest[1..],
            "--" => {
                rest = &rest[1..];
                break;
            }
            _ => break,
        }
    }

    if rest.is_empty() {
        for (name, value) in prefix {
            ctx.assign(name, value.clone())?;
        }
        persist_redirections(ctx, plan.clone());
        return Ok(ExecResult::ok());
    }

    let result = if clear_env || arg0.is_some() {
        let mut argv = rest.to_vec();
        let program = argv[0].clone();
        if let Some(name) = arg0 {
            argv[0] = name;
        }
        run_external_as(ctx, &program, &argv, prefix, plan, stage, clear_env)?
    } else {
        dispatch(ctx, rest, prefix, plan, Lookup::SkipFunctions, stage)?
    };
    let mut exit = ExitError::new(result.exit_code);
    exit.stdout = result.stdout;
    exit.stderr = result.stderr;
    Err(exit.into())
}

// ============================================================================
// External commands
// ============================================================================

fn run_external(
    ctx: &mut ShellContext,
    argv: &[String],
    prefix: &[(String, String)],
    plan: &RedirectPlan,
    stage: StageOutput,
) -> Result<ExecResult, InterpreterError> {
    run_external_as(ctx, &argv[0], argv, prefix, plan, stage, false)
}

fn run_external_as(
    ctx: &mut ShellContext,
    program: &str,
    argv: &[String],
    prefix: &[(String, String)],
    plan: &RedirectPlan,
    stage: StageOutput,
    clear_env: bool,
) -> Result<ExecResult, InterpreterError> {
    let path = match resolve_external(ctx, program) {
        Ok(path) => path,
        Err(failure) => return route_output(plan, failure),
    };

    let mut env = if clear_env { Vec::new() } else { ctx.child_env() };
    for (name, value) in prefix {
        env.retain(|(k, _)| k != name);
        env.push((name.clone(), value.clone()));
    }

    if let Some((interpreter, arg)) = shebang(&path) {
        if is_shell_interpreter(&interpreter, arg.as_deref()) {
            return run_shell_script(ctx, &path, argv, env, plan);
        }
    }

    match spawn_and_wait(ctx, &path, argv, &env, plan, stage) {
        Ok(result) => Ok(result),
        Err(SpawnFailure::NotExecutableFormat) => run_shell_script(ctx, &path, argv, env, plan),
        Err(failure) => route_output(
            plan,
            ExecResult::failure_with_code(failure.message(program), failure.exit_code()),
        ),
    }
}

/// Path of an external command, or the failure to report
fn resolve_external(ctx: &ShellContext, name: &str) -> Result<PathBuf, ExecResult> {
    let path = if name.contains('/') {
        let path = ctx.resolve_path(name);
        if !path.exists() {
            let msg = format!("zshell: no such file or directory: {}\n", name);
            return Err(ExecResult::failure_with_code(msg, 127));
        }
        path
    } else {
        match find_in_path(name, ctx.vars.get("PATH").map(String::as_str), &ctx.cwd) {
            Some(path) => path,
            None => {
                let msg = SpawnFailure::NotFound.message(name);
                return Err(ExecResult::failure_with_code(msg, 127));
            }
        }
    };
    if path.is_dir() || !is_executable(&path) {
        let failure = SpawnFailure::PermissionDenied;
        return Err(ExecResult::failure_with_code(failure.message(name), failure.exit_code()));
    }
    Ok(path)
}

/// Run a shell script in a new interpreter context, as a child shell would
fn run_shell_script(
    ctx: &mut ShellContext,
    path: &Path,
    argv: &[String],
    env: Vec<(String, String)>,
    plan: &RedirectPlan,
) -> Result<ExecResult, InterpreterError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| RuntimeError::new(format!("{}: {}", path.display(), e), 126))?;
    let script = match crate::parser::parse(&text) {
        Ok(script) => script,
        Err(e) => return route_output(plan, ExecResult::failure_with_code(syntax_error_message(&e), 2)),
    };

    let mut child = ShellContext::new(ctx.cwd.clone(), env.into_iter().collect());
    child.script_name = argv[0].clone();
    child.positional = argv[1..].to_vec();
    child.limits = ctx.limits.clone();
    child.cancel = ctx.cancel.clone();
    child.spawned_pids = ctx.spawned_pids.clone();
    child.stdin = ctx.stdin.clone();
    install_stdin(&mut child, plan);

    let result = ExecutionEngine.run_isolated(&mut child, &script);
    route_output(plan, result)
}

/// Lazily created pipe that collects one output stream
#[derive(Default)]
struct Capture {
    reader: Option<os_pipe::PipeReader>,
    writer: Option<os_pipe::PipeWriter>,
}

impl Capture {
    fn stdio(&mut self) -> io::Result<Stdio> {
        if let Some(writer) = &self.writer {
            return Ok(writer.try_clone()?.into());
        }
        let (reader, writer) = os_pipe::pipe()?;
        let stdio = writer.try_clone()?.into();
        self.reader = Some(reader);
        self.writer = Some(writer);
        Ok(stdio)
    }

    /// Close our write end and drain the pipe on a thread
    fn collect(self) -> Option<JoinHandle<String>> {
        drop(self.writer);
        let mut reader = self.reader?;
        Some(std::thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = reader.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        }))
    }
}

fn join_text(handle: Option<JoinHandle<String>>) -> String {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

fn output_stdio(
    target: &OutputTarget,
    stage: &StageOutput,
    out: &mut Capture,
    err: &mut Capture,
) -> io::Result<Stdio> {
    match target {
        OutputTarget::Stdout => match &stage.writer {
            Some(writer) => Ok(writer.try_clone()?.into()),
            None => out.stdio(),
        },
        OutputTarget::Stderr => match &stage.writer {
            Some(writer) if stage.merge_stderr => Ok(writer.try_clone()?.into()),
            _ => err.stdio(),
        },
        OutputTarget::File { file, .. } => Ok(file.try_clone()?.into()),
        OutputTarget::Closed => Ok(Stdio::null()),
    }
}

/// Feed `text` to a child's stdin from a thread
fn feed(text: String) -> io::Result<(Stdio, Option<JoinHandle<()>>)> {
    let (reader, mut writer) = os_pipe::pipe()?;
    let handle = std::thread::spawn(move || {
        // The child may exit without reading everything
        let _ = writer.write_all(text.as_bytes());
    });
    Ok((reader.into(), Some(handle)))
}

fn stdin_stdio(ctx: &mut ShellContext, plan: &RedirectPlan) -> io::Result<(Stdio, Option<JoinHandle<()>>)> {
    match &plan.stdin {
        Some(InputSource::File(file)) => return Ok((file.try_clone()?.into(), None)),
        Some(InputSource::Text(text)) => return feed(text.clone()),
        Some(InputSource::Closed) => return Ok((Stdio::null(), None)),
        None => {}
    }
    if let Input::Buffer { .. } = ctx.stdin {
        return feed(ctx.stdin.take_rest().unwrap_or_default());
    }
    match &ctx.stdin {
        Input::Buffer { .. } => Ok((Stdio::null(), None)),
        Input::Pipe(reader) => {
            let reader = reader.lock().map_err(|_| io::Error::new(io::ErrorKind::Other, "stdin lock poisoned"))?;
            Ok((reader.try_clone()?.into(), None))
        }
        Input::File(file) => Ok((file.try_clone()?.into(), None)),
        Input::Inherit => Ok((Stdio::inherit(), None)),
        Input::Empty => Ok((Stdio::null(), None)),
    }
}

fn spawn_and_wait(
    ctx: &mut ShellContext,
    path: &Path,
    argv: &[String],
    env: &[(String, String)],
    plan: &RedirectPlan,
    stage: StageOutput,
) -> Result<ExecResult, SpawnFailure> {
    let io_failure = |e: io::Error| SpawnFailure::Other(e.to_string());
    let (stdin, feeder) = stdin_stdio(ctx, plan).map_err(io_failure)?;
    let mut out = Capture::default();
    let mut err = Capture::default();
    let stdout = output_stdio(&plan.stdout, &stage, &mut out, &mut err).map_err(io_failure)?;
    let stderr = output_stdio(&plan.stderr, &stage, &mut out, &mut err).map_err(io_failure)?;

    let spec = SpawnSpec {
        program: path,
        argv,
        env,
        cwd: &ctx.cwd,
        new_process_group: false,
    };
    let spawned = spawn(&spec, stdin, stdout, stderr);
    // Our copies of the write ends must close for readers to see EOF
    drop(stage);
    let stdout_text = out.collect();
    let stderr_text = err.collect();
    let mut child = spawned.map_err(|e| SpawnFailure::from_io(&e))?;

    ctx.track_child(child.id());
    let status = child.wait().map(exit_code_of).unwrap_or(1);
    if let Some(feeder) = feeder {
        let _ = feeder.join();
    }
    Ok(ExecResult::new(join_text(stdout_text), join_text(stderr_text), status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use std::os::unix::fs::PermissionsExt;

    fn run_in(ctx: &mut ShellContext, script: &str) -> ExecResult {
        let ast = parse(script).unwrap();
        ExecutionEngine.run_isolated(ctx, &ast)
    }

    fn run(script: &str) -> ExecResult {
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        run_in(&mut ctx, script)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_external_command_output() {
        let r = run("printf '%s\\n' a b | tr a-z A-Z");
        assert_eq!(r.stdout, "A\nB\n");
        let r = run("ls /nonexistent-dir-for-test 2>/dev/null; echo $?");
        assert_ne!(r.stdout, "0\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_command_not_found() {
        let r = run("no_such_command_xyz; echo $?");
        assert_eq!(r.stdout, "127\n");
        assert!(r.stderr.contains("command not found: no_such_command_xyz"));
        let r = run("./missing-script; echo $?");
        assert_eq!(r.stdout, "127\n");
        assert!(r.stderr.contains("no such file or directory"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_permission_denied() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("plain"), "echo hi\n").unwrap();
        let mut ctx = ShellContext::new(dir.path().to_path_buf(), std::env::vars().collect());
        let r = run_in(&mut ctx, "./plain; echo $?");
        assert_eq!(r.stdout, "126\n");
        assert!(r.stderr.contains("permission denied"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shell_script_runs_in_process() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("greet");
        std::fs::write(&script, "#!/bin/sh\necho \"hello $1 from $0\"\nexit 3\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let mut ctx = ShellContext::new(dir.path().to_path_buf(), std::env::vars().collect());
        let r = run_in(&mut ctx, "./greet world; echo $?");
        assert_eq!(r.stdout, "hello world from ./greet\n3\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_prefix_assignments() {
        let r = run("FOO=bar sh -c 'echo $FOO'; echo \"[$FOO]\"");
        assert_eq!(r.stdout, "bar\n[]\n");
        let r = run("f() { echo $V; }; V=inner f; echo \"[$V]\"");
        assert_eq!(r.stdout, "inner\n[]\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_function_shadows_builtin_and_command_skips_it() {
        let r = run("echo() { builtin echo wrapped $@; }; echo hi; command echo plain");
        assert_eq!(r.stdout, "wrapped hi\nplain\n");
        let r = run("builtin nosuch; echo $?");
        assert_eq!(r.stdout, "1\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_command_v() {
        let r = run("f() { :; }; command -v f echo sh");
        let lines: Vec<&str> = r.stdout.lines().collect();
        assert_eq!(lines[0], "f");
        assert_eq!(lines[1], "echo");
        assert!(lines[2].ends_with("/sh"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_replaces_shell() {
        let r = run("exec sh -c 'echo in; exit 4'; echo unreachable");
        assert_eq!(r.stdout, "in\n");
        assert_eq!(r.exit_code, 4);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_persistent_redirection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let r = run(&format!("exec 3>{0}; echo one >&3; echo two >&3; cat {0}", path.display()));
        assert_eq!(r.stdout, "one\ntwo\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stdin_reaches_external() {
        let r = run("cat <<EOF\nline1\nline2\nEOF");
        assert_eq!(r.stdout, "line1\nline2\n");
        let r = run("echo 'x y' | { read a; echo \"$a\" | wc -w; }");
        assert_eq!(r.stdout.trim(), "2");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stderr_to_stdout() {
        let r = run("sh -c 'echo err >&2' 2>&1");
        assert_eq!(r.stdout, "err\n");
        assert_eq!(r.stderr, "");
    }

    #[test]
    fn test_classify_command() {
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        ctx.aliases.insert("ll".into(), "ls -l".into());
        assert_eq!(classify_command(&ctx, "ll", false)[0], CommandKind::Alias("ls -l".into()));
        assert_eq!(classify_command(&ctx, "if", false), vec![CommandKind::Keyword]);
        assert_eq!(classify_command(&ctx, "export", false), vec![CommandKind::SpecialBuiltin]);
        assert!(matches!(classify_command(&ctx, "sh", false)[0], CommandKind::File(_)));
        assert!(classify_command(&ctx, "no_such_command_xyz", true).is_empty());
    }
}
