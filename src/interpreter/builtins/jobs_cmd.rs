//! jobs / fg / bg / wait / disown - Job control builtins
//!
//! jobs [-lp] [%job ...]
//! fg [%job]            - continue a job and wait for it
//! bg [%job ...]        - continue stopped jobs in the background
//! wait [-t secs] [%job | pid ...]
//! disown [%job ...]
//!
//! `wait` gives up after `-t secs` or `$WAIT_TIMEOUT` seconds when either
//! is set. Output captured from a job is returned when it is waited for.

use std::time::Duration;

use super::{builtin_error, split_flags};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::jobs::{format_job, JobTable, WaitTimeout};
use crate::interpreter::types::{ExecResult, ShellContext};

/// Status of a `wait` that timed out
const WAIT_TIMED_OUT: i32 = 124;

/// Job id for `%spec`, a pid, or the current job when `spec` is None
fn resolve(jobs: &JobTable, spec: Option<&str>) -> Option<usize> {
    match spec {
        None => jobs.current_id(),
        Some(s) if s.starts_with('%') => jobs.resolve_spec(s),
        Some(s) => s.parse::<u32>().ok().and_then(|pid| jobs.find_by_pid(pid)),
    }
}

fn no_such_job(cmd: &str, spec: Option<&str>) -> ExecResult {
    match spec {
        Some(s) => builtin_error(cmd, format!("{}: no such job", s)),
        None => builtin_error(cmd, "no current job"),
    }
}

fn table_error(cmd: &str) -> ExecResult {
    builtin_error(cmd, "job table unavailable")
}

/// Handle the jobs builtin command
pub fn handle_jobs(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, specs) = split_flags(args);
    let long = flags.iter().any(|(c, _)| *c == 'l');
    let pids_only = flags.iter().any(|(c, _)| *c == 'p');
    let Ok(mut jobs) = ctx.jobs.lock() else {
        return Ok(table_error("jobs"));
    };

    let infos = jobs.list();
    let mut result = ExecResult::ok();
    if specs.is_empty() {
        for info in &infos {
            result.stdout.push_str(&format_job(info, long, pids_only));
        }
        return Ok(result);
    }
    for spec in specs {
        match resolve(&jobs, Some(spec)).and_then(|id| infos.iter().find(|i| i.id == id)) {
            Some(info) => result.stdout.push_str(&format_job(info, long, pids_only)),
            None => {
                result.stderr.push_str(&no_such_job("jobs", Some(spec)).stderr);
                result.exit_code = 1;
            }
        }
    }
    Ok(result)
}

pub fn handle_fg(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let spec = args.first().map(String::as_str);
    let Ok(mut jobs) = ctx.jobs.lock() else {
        return Ok(table_error("fg"));
    };
    let Some(id) = resolve(&jobs, spec) else {
        return Ok(no_such_job("fg", spec));
    };
    let command = jobs.get(id).map(|j| j.command.clone()).unwrap_or_default();
    if let Err(msg) = jobs.resume(id) {
        return Ok(builtin_error("fg", msg));
    }
    let (status, stdout, mut stderr) = match jobs.wait(id, None) {
        Ok(done) => done,
        Err(WaitTimeout) => (WAIT_TIMED_OUT, String::new(), String::new()),
    };
    drop(jobs);
    stderr.insert_str(0, &format!("[{}]  - continued  {}\n", id, command));
    ctx.last_exit_code = status;
    Ok(ExecResult::new(stdout, stderr, status))
}

pub fn handle_bg(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let Ok(mut jobs) = ctx.jobs.lock() else {
        return Ok(table_error("bg"));
    };
    let specs: Vec<Option<&str>> = if args.is_empty() {
        vec![None]
    } else {
        args.iter().map(|a| Some(a.as_str())).collect()
    };
    let mut result = ExecResult::ok();
    for spec in specs {
        let Some(id) = resolve(&jobs, spec) else {
            result.stderr.push_str(&no_such_job("bg", spec).stderr);
            result.exit_code = 1;
            continue;
        };
        match jobs.resume(id) {
            Ok(()) => {
                let command = jobs.get(id).map(|j| j.command.clone()).unwrap_or_default();
                result.stderr.push_str(&format!("[{}]  - continued  {}\n", id, command));
            }
            Err(msg) => {
                result.stderr.push_str(&builtin_error("bg", msg).stderr);
                result.exit_code = 1;
            }
        }
    }
    Ok(result)
}

fn wait_timeout(ctx: &ShellContext, flags: &[(char, bool)], args: &mut &[String]) -> Result<Option<Duration>, String> {
    let mut secs = ctx.vars.get("WAIT_TIMEOUT").cloned();
    if flags.iter().any(|(c, _)| *c == 't') {
        let Some((value, rest)) = args.split_first() else {
            return Err("-t: argument expected".to_string());
        };
        secs = Some(value.clone());
        *args = rest;
    }
    match secs.filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => match s.parse::<f64>() {
            Ok(n) if n >= 0.0 => Ok(Some(Duration::from_secs_f64(n))),
            _ => Err(format!("invalid timeout: {}", s)),
        },
    }
}

pub fn handle_wait(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, mut operands) = split_flags(args);
    let timeout = match wait_timeout(ctx, &flags, &mut operands) {
        Ok(t) => t,
        Err(msg) => return Ok(builtin_error("wait", msg)),
    };
    let Ok(mut jobs) = ctx.jobs.lock() else {
        return Ok(table_error("wait"));
    };

    let mut result = ExecResult::ok();
    if operands.is_empty() {
        match jobs.wait_all(timeout) {
            Ok((_, stdout, stderr)) => {
                result.stdout = stdout;
                result.stderr = stderr;
            }
            Err(WaitTimeout) => {
                result.stderr = "zshell: wait: timed out\n".to_string();
                result.exit_code = WAIT_TIMED_OUT;
            }
        }
        return Ok(result);
    }

    for spec in operands {
        let Some(id) = resolve(&jobs, Some(spec)) else {
            let msg = if spec.starts_with('%') {
                format!("{}: no such job", spec)
            } else {
                format!("pid {} is not a child of this shell", spec)
            };
            result.stderr.push_str(&builtin_error("wait", msg).stderr);
            result.exit_code = 127;
            continue;
        };
        match jobs.wait(id, timeout) {
            Ok((status, stdout, stderr)) => {
                result.stdout.push_str(&stdout);
                result.stderr.push_str(&stderr);
                result.exit_code = status;
            }
            Err(WaitTimeout) => {
                result.stderr.push_str("zshell: wait: timed out\n");
                result.exit_code = WAIT_TIMED_OUT;
            }
        }
    }
    Ok(result)
}

pub fn handle_disown(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let Ok(mut jobs) = ctx.jobs.lock() else {
        return Ok(table_error("disown"));
    };
    let specs: Vec<Option<&str>> = if args.is_empty() {
        vec![None]
    } else {
        args.iter().map(|a| Some(a.as_str())).collect()
    };
    let mut result = ExecResult::ok();
    for spec in specs {
        match resolve(&jobs, spec) {
            Some(id) => {
                jobs.disown(id);
            }
            None => {
                result.stderr.push_str(&no_such_job("disown", spec).stderr);
                result.exit_code = 1;
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use crate::interpreter::execution_engine::ExecutionEngine;
    use crate::interpreter::types::{ExecResult, ShellContext};
    use crate::parser::parse;

    fn run(script: &str) -> ExecResult {
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        ExecutionEngine.run_isolated(&mut ctx, &parse(script).unwrap())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_wait_returns_job_output_and_status() {
        let r = run("{ echo one; exit 3; } & { echo two; } & wait %1; echo $?; wait; echo $?");
        assert_eq!(r.stdout, "one\n3\ntwo\n0\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_jobs_listing() {
        let r = run("sleep 5 & jobs; jobs -p | grep -c .; kill %1; wait %1; echo $?");
        assert!(r.stdout.starts_with("[1]  + running  sleep 5\n1\n"), "{}", r.stdout);
        assert!(r.stdout.ends_with("143\n"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_wait_timeout() {
        let r = run("sleep 5 & wait -t 0.1 $!; echo $?; kill %1");
        assert_eq!(r.stdout, "124\n");
        assert_eq!(r.stderr, "zshell: wait: timed out\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unknown_jobs() {
        let r = run("wait %3; echo $?; fg; echo $?; disown %9; echo $?");
        assert_eq!(r.stdout, "127\n1\n1\n");
        assert_eq!(
            r.stderr,
            "zshell: wait: %3: no such job\nzshell: fg: no current job\nzshell: disown: %9: no such job\n"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_disown_removes_job() {
        let r = run("sleep 5 & disown; jobs; echo done");
        assert_eq!(r.stdout, "done\n");
    }
}
