//! kill - Send signals to jobs and processes
//!
//! kill [-s SIG | -n NUM | -SIG] %job|pid ...
//! kill -l [status ...]
//!
//! Signalling the shell's own pid runs the matching trap, or ends the
//! script with status 128+SIG when the signal is not trapped.

use super::{builtin_error, usage_error};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::jobs::{signal_name, signal_names, signal_number};
use crate::interpreter::traps::deliver_signal;
use crate::interpreter::types::{ExecResult, ShellContext};

fn list_signals(args: &[String]) -> ExecResult {
    if args.is_empty() {
        return ExecResult::new(signal_names().join(" ") + "\n", String::new(), 0);
    }
    let mut result = ExecResult::ok();
    for arg in args {
        // `kill -l 130` names the signal behind an exit status
        let number = arg.parse::<i32>().ok().map(|n| if n > 128 { n - 128 } else { n });
        match number.and_then(signal_name) {
            Some(name) => result.stdout.push_str(&format!("{}\n", name)),
            None => match signal_number(arg) {
                Some(n) if n != 0 => result.stdout.push_str(&format!("{}\n", n)),
                _ => {
                    result.stderr.push_str(&builtin_error("kill", format!("unknown signal: {}", arg)).stderr);
                    result.exit_code = 1;
                }
            },
        }
    }
    result
}

/// Where a signal went
enum Delivery {
    Sent,
    /// The target is the shell itself
    ToShell,
}

/// Send `signal` to one target; returns an error message on failure
fn signal_target(ctx: &mut ShellContext, target: &str, signal: i32) -> Result<Delivery, String> {
    if target.starts_with('%') {
        let mut jobs = ctx.jobs.lock().map_err(|_| "job table unavailable".to_string())?;
        let id = jobs.resolve_spec(target).ok_or_else(|| format!("{}: no such job", target))?;
        jobs.kill(id, signal)?;
        return Ok(Delivery::Sent);
    }
    let pid: i32 = target.parse().map_err(|_| format!("illegal pid: {}", target))?;
    if pid as u32 == ctx.shell_pid {
        return Ok(Delivery::ToShell);
    }
    {
        let mut jobs = ctx.jobs.lock().map_err(|_| "job table unavailable".to_string())?;
        if let Some(id) = jobs.find_by_pid(pid as u32) {
            jobs.kill(id, signal)?;
            return Ok(Delivery::Sent);
        }
    }
    // SAFETY: plain kill(2) on a pid supplied by the user
    let rc = unsafe { libc::kill(pid as libc::pid_t, signal) };
    if rc != 0 {
        return Err(format!("kill {} failed: {}", pid, std::io::Error::last_os_error()));
    }
    Ok(Delivery::Sent)
}

/// Handle the kill builtin command
pub fn handle_kill(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let mut signal = libc::SIGTERM;
    let mut rest = args;
    match rest.first().map(String::as_str) {
        Some("-l") | Some("-L") => return Ok(list_signals(&rest[1..])),
        Some("-s") | Some("-n") => {
            let Some(spec) = rest.get(1) else {
                return Ok(usage_error("kill", "-s requires an argument"));
            };
            match signal_number(spec) {
                Some(n) => signal = n,
                None => return Ok(builtin_error("kill", format!("unknown signal: {}", spec))),
            }
            rest = &rest[2..];
        }
        Some(flag) if flag.starts_with('-') && flag.len() > 1 && flag != "--" => {
            match signal_number(&flag[1..]) {
                Some(n) => signal = n,
                None => return Ok(builtin_error("kill", format!("unknown signal: {}", &flag[1..]))),
            }
            rest = &rest[1..];
        }
        _ => {}
    }
    if rest.first().map(String::as_str) == Some("--") {
        rest = &rest[1..];
    }
    if rest.is_empty() {
        return Ok(usage_error("kill", "not enough arguments"));
    }

    let mut result = ExecResult::ok();
    let mut self_signal = false;
    for target in rest {
        match signal_target(ctx, target, signal) {
            Ok(Delivery::ToShell) => self_signal = true,
            Ok(Delivery::Sent) => {}
            Err(msg) => {
                result.stderr.push_str(&builtin_error("kill", msg).stderr);
                result.exit_code = 1;
            }
        }
    }
    if self_signal && signal != 0 {
        let delivered = deliver_signal(ctx, signal).map_err(|e| e.prepend_output(&result.stdout, &result.stderr))?;
        result.stdout.push_str(&delivered.stdout);
        result.stderr.push_str(&delivered.stderr);
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::execution_engine::ExecutionEngine;
    use crate::parser::parse;

    fn run(script: &str) -> ExecResult {
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        ExecutionEngine.run_isolated(&mut ctx, &parse(script).unwrap())
    }

    #[test]
    fn test_kill_list() {
        let r = list_signals(&["130".to_string(), "TERM".to_string()]);
        assert_eq!(r.stdout, "INT\n15\n");
        assert!(list_signals(&[]).stdout.contains("HUP INT"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_kill_job_by_spec_and_pid() {
        let r = run("sleep 5 & kill -s KILL %1; wait %1; echo $?; sleep 5 & kill -INT $!; wait $!; echo $?");
        assert_eq!(r.stdout, "137\n130\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_self_signal_runs_trap() {
        let r = run("trap 'echo caught' USR1; kill -USR1 $$; echo after");
        assert_eq!(r.stdout, "caught\nafter\n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_untrapped_self_signal_exits() {
        let r = run("kill -TERM $$; echo unreachable");
        assert_eq!(r.stdout, "");
        assert_eq!(r.exit_code, 143);
    }

    #[test]
    fn test_bad_usage() {
        let mut ctx = ShellContext::default();
        assert_eq!(handle_kill(&mut ctx, &[]).unwrap().exit_code, 2);
        let r = handle_kill(&mut ctx, &["-BOGUS".to_string(), "1".to_string()]).unwrap();
        assert_eq!(r.stderr, "zshell: kill: unknown signal: BOGUS\n");
    }
}
