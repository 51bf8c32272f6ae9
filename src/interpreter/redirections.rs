//! Redirection Handling
//!
//! Redirections are resolved, in order, into a [`RedirectPlan`] that says
//! where the command's stdin comes from and where fds 1 and 2 (and any
//! other fd named) end up:
//! - `<` `<>` `<&n` input from files or duplicated descriptors
//! - `>` `>|` `>>` output to files, honouring `noclobber`
//! - `&>` `&>>` both streams
//! - `n>&m` duplicates the *current* target of `m`, so `>f 2>&1` and
//!   `2>&1 >f` differ
//! - `<<` `<<-` `<<<` here-documents and here-strings
//!
//! In-process commands run with the plan's stdin and have their captured
//! output routed afterwards ([`route_output`]); external commands get the
//! plan turned into `Stdio` handles.

use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::ast::types::{RedirectionNode, RedirectionOperator, RedirectionTarget};
use crate::interpreter::errors::{InterpreterError, RuntimeError};
use crate::interpreter::types::{ExecResult, FdTarget, Input, ShellContext};
use crate::interpreter::word_expansion::{expand_word_fields, expand_word_string};

/// Where an output descriptor ends up
#[derive(Debug, Clone)]
pub enum OutputTarget {
    /// The enclosing standard output
    Stdout,
    /// The enclosing standard error
    Stderr,
    File { file: Arc<File>, path: PathBuf },
    Closed,
}

/// Where the command's standard input comes from
#[derive(Debug, Clone)]
pub enum InputSource {
    File(Arc<File>),
    Text(String),
    Closed,
}

#[derive(Debug, Clone)]
pub struct RedirectPlan {
    /// None keeps the enclosing stdin
    pub stdin: Option<InputSource>,
    pub stdout: OutputTarget,
    pub stderr: OutputTarget,
    /// Descriptors above 2 named by this command
    pub extra: BTreeMap<i32, FdTarget>,
}

impl Default for RedirectPlan {
    fn default() -> Self {
        Self {
            stdin: None,
            stdout: OutputTarget::Stdout,
            stderr: OutputTarget::Stderr,
            extra: BTreeMap::new(),
        }
    }
}

fn fd_to_output(target: &FdTarget) -> OutputTarget {
    match target {
        FdTarget::File { file, path, .. } => OutputTarget::File {
            file: file.clone(),
            path: path.clone(),
        },
        FdTarget::Stdout => OutputTarget::Stdout,
        FdTarget::Stderr => OutputTarget::Stderr,
        FdTarget::Closed => OutputTarget::Closed,
    }
}

fn output_to_fd(target: &OutputTarget, readable: bool) -> FdTarget {
    match target {
        OutputTarget::File { file, path } => FdTarget::File {
            file: file.clone(),
            path: path.clone(),
            readable,
        },
        OutputTarget::Stdout => FdTarget::Stdout,
        OutputTarget::Stderr => FdTarget::Stderr,
        OutputTarget::Closed => FdTarget::Closed,
    }
}

impl RedirectPlan {
    /// Plan for a simple command: descriptors kept open with `exec` apply
    pub fn from_shell_fds(ctx: &ShellContext) -> Self {
        let mut plan = Self::default();
        if let Some(target) = ctx.fds.get(&0) {
            plan.stdin = Some(match target {
                FdTarget::File { file, .. } => InputSource::File(file.clone()),
                _ => InputSource::Closed,
            });
        }
        if let Some(target) = ctx.fds.get(&1) {
            plan.stdout = fd_to_output(target);
        }
        if let Some(target) = ctx.fds.get(&2) {
            plan.stderr = fd_to_output(target);
        }
        plan
    }

    fn output(&self, ctx: &ShellContext, fd: i32) -> Result<OutputTarget, InterpreterError> {
        match fd {
            1 => Ok(self.stdout.clone()),
            2 => Ok(self.stderr.clone()),
            _ => match self.extra.get(&fd).or_else(|| ctx.fds.get(&fd)) {
                Some(target) => Ok(fd_to_output(target)),
                None => Err(bad_fd(fd)),
            },
        }
    }

    fn set_output(&mut self, fd: i32, target: OutputTarget) {
        match fd {
            0 => {
                self.stdin = Some(match &target {
                    OutputTarget::File { file, .. } => InputSource::File(file.clone()),
                    _ => InputSource::Closed,
                })
            }
            1 => self.stdout = target,
            2 => self.stderr = target,
            _ => {
                self.extra.insert(fd, output_to_fd(&target, false));
            }
        }
    }

    fn set_input(&mut self, fd: i32, source: InputSource, file_path: Option<PathBuf>) {
        if fd == 0 {
            self.stdin = Some(source);
            return;
        }
        let target = match (source, file_path) {
            (InputSource::File(file), Some(path)) => FdTarget::File { file, path, readable: true },
            (InputSource::File(file), None) => FdTarget::File {
                file,
                path: PathBuf::new(),
                readable: true,
            },
            _ => FdTarget::Closed,
        };
        match fd {
            1 => self.stdout = fd_to_output(&target),
            2 => self.stderr = fd_to_output(&target),
            _ => {
                self.extra.insert(fd, target);
            }
        }
    }
}

fn bad_fd(fd: i32) -> InterpreterError {
    RuntimeError::new(format!("{}: bad file descriptor", fd), 1).into()
}

fn io_error(err: &std::io::Error, target: &str) -> InterpreterError {
    let reason = match err.kind() {
        std::io::ErrorKind::NotFound => "no such file or directory",
        std::io::ErrorKind::PermissionDenied => "permission denied",
        _ if err.raw_os_error() == Some(libc::EISDIR) => "is a directory",
        _ => "cannot open file",
    };
    RuntimeError::new(format!("{}: {}", reason, target), 1).into()
}

fn open_output(ctx: &ShellContext, target: &str, append: bool, clobber: bool) -> Result<OutputTarget, InterpreterError> {
    let path = ctx.resolve_path(target);
    if path.is_dir() {
        return Err(RuntimeError::new(format!("is a directory: {}", target), 1).into());
    }
    if !append && !clobber && ctx.options.noclobber && path.is_file() {
        return Err(RuntimeError::new(format!("file exists: {}", target), 1).into());
    }
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(&path)
        .map_err(|e| io_error(&e, target))?;
    Ok(OutputTarget::File {
        file: Arc::new(file),
        path,
    })
}

fn open_input(ctx: &ShellContext, target: &str, write: bool) -> Result<(Arc<File>, PathBuf), InterpreterError> {
    let path = ctx.resolve_path(target);
    let file = OpenOptions::new()
        .read(true)
        .write(write)
        .create(write)
        .open(&path)
        .map_err(|e| io_error(&e, target))?;
    Ok((Arc::new(file), path))
}

/// Expand a redirection target to exactly one word
fn target_word(ctx: &mut ShellContext, redir: &RedirectionNode) -> Result<String, InterpreterError> {
    match &redir.target {
        RedirectionTarget::Word(word) => {
            let mut fields = expand_word_fields(ctx, word)?;
            if fields.len() != 1 {
                return Err(RuntimeError::new("ambiguous redirect", 1).into());
            }
            Ok(fields.remove(0))
        }
        RedirectionTarget::HereDoc(doc) => expand_word_string(ctx, &doc.content),
    }
}

/// Resolve redirections, in order, on top of `plan`
pub fn apply_redirections(
    ctx: &mut ShellContext,
    mut plan: RedirectPlan,
    redirections: &[RedirectionNode],
) -> Result<RedirectPlan, InterpreterError> {
    for redir in redirections {
        let fd = redir.fd.unwrap_or_else(|| redir.operator.default_fd());
        match redir.operator {
            RedirectionOperator::DLess | RedirectionOperator::DLessDash => {
                let body = target_word(ctx, redir)?;
                plan.set_input(fd, InputSource::Text(body), None);
            }
            RedirectionOperator::TLess => {
                let mut body = target_word(ctx, redir)?;
                body.push('\n');
                plan.set_input(fd, InputSource::Text(body), None);
            }
            RedirectionOperator::Less => {
                let target = target_word(ctx, redir)?;
                let (file, path) = open_input(ctx, &target, false)?;
                plan.set_input(fd, InputSource::File(file), Some(path));
            }
            RedirectionOperator::LessGreat => {
                let target = target_word(ctx, redir)?;
                let (file, path) = open_input(ctx, &target, true)?;
                plan.set_input(fd, InputSource::File(file), Some(path));
            }
            RedirectionOperator::Great | RedirectionOperator::Clobber | RedirectionOperator::DGreat => {
                let target = target_word(ctx, redir)?;
                let append = redir.operator == RedirectionOperator::DGreat;
                let clobber = redir.operator == RedirectionOperator::Clobber;
                let out = open_output(ctx, &target, append, clobber)?;
                plan.set_output(fd, out);
            }
            RedirectionOperator::AndGreat | RedirectionOperator::AndDGreat => {
                let target = target_word(ctx, redir)?;
                let append = redir.operator == RedirectionOperator::AndDGreat;
                let out = open_output(ctx, &target, append, false)?;
                plan.stdout = out.clone();
                plan.stderr = out;
            }
            RedirectionOperator::GreatAnd | RedirectionOperator::LessAnd => {
                let target = target_word(ctx, redir)?;
                if target == "-" {
                    if fd == 0 {
                        plan.stdin = Some(InputSource::Closed);
                    } else {
                        plan.set_output(fd, OutputTarget::Closed);
                    }
                    continue;
                }
                match target.parse::<i32>() {
                    Ok(source) => duplicate(ctx, &mut plan, fd, source, redir.operator)?,
                    // `>& file` is `&> file`
                    Err(_) if redir.operator == RedirectionOperator::GreatAnd && redir.fd.is_none() => {
                        let out = open_output(ctx, &target, false, false)?;
                        plan.stdout = out.clone();
                        plan.stderr = out;
                    }
                    Err(_) => return Err(RuntimeError::new(format!("{}: bad file descriptor", target), 1).into()),
                }
            }
        }
    }
    Ok(plan)
}

fn duplicate(
    ctx: &ShellContext,
    plan: &mut RedirectPlan,
    fd: i32,
    source: i32,
    operator: RedirectionOperator,
) -> Result<(), InterpreterError> {
    if fd == 0 || operator == RedirectionOperator::LessAnd {
        let input = match source {
            0 => plan.stdin.clone(),
            _ => match plan.extra.get(&source).or_else(|| ctx.fds.get(&source)) {
                Some(FdTarget::File { file, .. }) => Some(InputSource::File(file.clone())),
                Some(_) => Some(InputSource::Closed),
                None if source <= 2 => None,
                None => return Err(bad_fd(source)),
            },
        };
        match input {
            Some(input) if fd == 0 => plan.stdin = Some(input),
            None if fd == 0 => {}
            _ => {
                let target = plan.output(ctx, source)?;
                plan.set_output(fd, target);
            }
        }
        return Ok(());
    }
    let target = plan.output(ctx, source)?;
    plan.set_output(fd, target);
    Ok(())
}

/// Make the plan's stdin the command's stdin. Returns the previous input.
pub fn install_stdin(ctx: &mut ShellContext, plan: &RedirectPlan) -> Option<Input> {
    let input = match plan.stdin.as_ref()? {
        InputSource::File(file) => Input::File(file.clone()),
        InputSource::Text(text) => Input::from_string(text.clone()),
        InputSource::Closed => Input::Empty,
    };
    Some(std::mem::replace(&mut ctx.stdin, input))
}

fn write_to(target: &OutputTarget, text: &str, out: &mut ExecResult) -> Result<(), InterpreterError> {
    if text.is_empty() {
        return Ok(());
    }
    match target {
        OutputTarget::Stdout => out.stdout.push_str(text),
        OutputTarget::Stderr => out.stderr.push_str(text),
        OutputTarget::File { file, path } => {
            (&**file)
                .write_all(text.as_bytes())
                .map_err(|e| io_error(&e, &path.to_string_lossy()))?;
        }
        OutputTarget::Closed => {}
    }
    Ok(())
}

/// Send an in-process command's captured output where the plan says
pub fn route_output(plan: &RedirectPlan, result: ExecResult) -> Result<ExecResult, InterpreterError> {
    if matches!(plan.stdout, OutputTarget::Stdout) && matches!(plan.stderr, OutputTarget::Stderr) {
        return Ok(result);
    }
    let mut out = ExecResult::new(String::new(), String::new(), result.exit_code);
    write_to(&plan.stdout, &result.stdout, &mut out)?;
    write_to(&plan.stderr, &result.stderr, &mut out)?;
    Ok(out)
}

/// `route_output` for a command that may have failed: output carried by
/// the error is routed too
pub fn route_result(
    plan: &RedirectPlan,
    result: Result<ExecResult, InterpreterError>,
) -> Result<ExecResult, InterpreterError> {
    match result {
        Ok(r) => route_output(plan, r),
        Err(mut e) => {
            let (stdout, stderr) = e.take_output();
            let routed = route_output(plan, ExecResult::new(stdout, stderr, 0))?;
            Err(e.prepend_output(&routed.stdout, &routed.stderr))
        }
    }
}

/// `exec` with only redirections: keep the descriptors for the rest of
/// the shell's life
pub fn persist_redirections(ctx: &mut ShellContext, plan: RedirectPlan) {
    match plan.stdin {
        Some(InputSource::File(file)) => {
            ctx.stdin = Input::File(file.clone());
            ctx.fds.insert(
                0,
                FdTarget::File {
                    file,
                    path: PathBuf::new(),
                    readable: true,
                },
            );
        }
        Some(InputSource::Text(text)) => ctx.stdin = Input::from_string(text),
        Some(InputSource::Closed) => {
            ctx.stdin = Input::Empty;
            ctx.fds.insert(0, FdTarget::Closed);
        }
        None => {}
    }
    for (fd, target) in [(1, &plan.stdout), (2, &plan.stderr)] {
        let default = if fd == 1 {
            matches!(target, OutputTarget::Stdout)
        } else {
            matches!(target, OutputTarget::Stderr)
        };
        if default {
            continue;
        }
        ctx.fds.insert(fd, output_to_fd(target, false));
    }
    for (fd, target) in plan.extra {
        match target {
            FdTarget::Closed => {
                ctx.fds.remove(&fd);
            }
            other => {
                ctx.fds.insert(fd, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::ast::types::{CommandNode, StatementNode};
    use std::collections::HashMap;
    use std::path::Path;

    fn redirections(script: &str) -> Vec<RedirectionNode> {
        let ast = parse(script).unwrap();
        let StatementNode { pipelines, .. } = &ast.statements[0];
        match &pipelines[0].commands[0] {
            CommandNode::Simple(cmd) => cmd.redirections.clone(),
            _ => panic!("expected simple command"),
        }
    }

    fn ctx(dir: &Path) -> ShellContext {
        ShellContext::new(dir.to_path_buf(), HashMap::new())
    }

    #[test]
    fn test_order_of_duplication() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = ctx(dir.path());
        let plan = apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd >out 2>&1")).unwrap();
        assert!(matches!(plan.stdout, OutputTarget::File { .. }));
        assert!(matches!(plan.stderr, OutputTarget::File { .. }));

        let plan = apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd 2>&1 >out")).unwrap();
        assert!(matches!(plan.stdout, OutputTarget::File { .. }));
        assert!(matches!(plan.stderr, OutputTarget::Stdout));
    }

    #[test]
    fn test_route_output_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut c = ctx(dir.path());
        let plan = apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd >out")).unwrap();
        let routed = route_output(&plan, ExecResult::new("hello\n".into(), "err\n".into(), 0)).unwrap();
        assert_eq!(routed.stdout, "");
        assert_eq!(routed.stderr, "err\n");
        assert_eq!(std::fs::read_to_string(dir.path().join("out")).unwrap(), "hello\n");
    }

    #[test]
    fn test_append_and_noclobber() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f"), "a\n").unwrap();
        let mut c = ctx(dir.path());
        let plan = apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd >>f")).unwrap();
        route_output(&plan, ExecResult::new("b\n".into(), String::new(), 0)).unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("f")).unwrap(), "a\nb\n");

        c.options.noclobber = true;
        let err = apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd >f")).unwrap_err();
        assert!(err.stderr().contains("file exists: f"));
        assert!(apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd >|f")).is_ok());
    }

    #[test]
    fn test_input_sources() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("in"), "line\n").unwrap();
        let mut c = ctx(dir.path());
        let plan = apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd <in")).unwrap();
        install_stdin(&mut c, &plan);
        assert_eq!(c.stdin.read_until('\n'), Some(("line".to_string(), true)));

        let plan = apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd <<<word")).unwrap();
        assert!(matches!(plan.stdin, Some(InputSource::Text(ref t)) if t == "word\n"));

        let err = apply_redirections(&mut c, RedirectPlan::default(), &redirections("cmd <missing")).unwrap_err();
        assert!(err.stderr().contains("no such file or directory: missing"));
    }
}
