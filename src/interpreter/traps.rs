//! Trap Execution
//!
//! Handlers registered with `trap` run in the current context. `$?` is
//! restored afterwards so a handler never changes the status the script
//! sees. A handler is not re-entered while it is running.

use crate::interpreter::errors::{ExitError, InterpreterError};
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::helpers::script::{parse_with_aliases, syntax_error_message};
use crate::interpreter::jobs::{signal_name, signal_number};
use crate::interpreter::types::{ExecResult, ShellContext, TrapAction};

/// Canonical trap name: `SIGINT`, `int` and `2` all become `INT`
pub fn normalize_trap_name(name: &str) -> Option<String> {
    let upper = name.to_ascii_uppercase();
    match upper.strip_prefix("SIG").unwrap_or(&upper) {
        "ERR" | "ZERR" => Some("ERR".to_string()),
        "DEBUG" => Some("DEBUG".to_string()),
        _ => signal_number(name).and_then(signal_name).map(str::to_string),
    }
}

/// Run the handler for `name`, if one is set.
pub fn run_trap(ctx: &mut ShellContext, name: &str) -> Result<ExecResult, InterpreterError> {
    let Some(TrapAction::Command(command)) = ctx.traps.get(name).cloned() else {
        return Ok(ExecResult::ok());
    };
    if command.is_empty() {
        return Ok(ExecResult::ok());
    }

    let script = match parse_with_aliases(ctx, &command) {
        Ok(script) => script,
        Err(e) => return Ok(ExecResult::failure(syntax_error_message(&e))),
    };

    let saved_status = ctx.last_exit_code;
    ctx.traps.remove(name);
    ctx.condition_depth += 1;
    let result = ExecutionEngine.execute_script(ctx, &script);
    ctx.condition_depth -= 1;
    ctx.traps.entry(name.to_string()).or_insert(TrapAction::Command(command));
    ctx.last_exit_code = saved_status;

    match result {
        Ok(r) => Ok(ExecResult::new(r.stdout, r.stderr, saved_status)),
        Err(InterpreterError::Exit(e)) => Err(e.into()),
        Err(InterpreterError::Return(e)) => Ok(ExecResult::new(e.stdout, e.stderr, saved_status)),
        Err(e) => Ok(ExecResult::new(e.stdout().to_string(), e.stderr().to_string(), saved_status)),
    }
}

/// Run the EXIT handler once; it is cleared before running.
pub fn run_exit_trap(ctx: &mut ShellContext) -> ExecResult {
    if !matches!(ctx.traps.get("EXIT"), Some(TrapAction::Command(_))) {
        return ExecResult::ok();
    }
    let status = ctx.last_exit_code;
    let result = match run_trap(ctx, "EXIT") {
        Ok(r) => r,
        Err(e) => ExecResult::new(e.stdout().to_string(), e.stderr().to_string(), status),
    };
    ctx.traps.remove("EXIT");
    result
}

/// The shell sent itself `signal` (`kill -TERM $$`). A trapped signal runs
/// its handler; an ignored one does nothing; anything else ends the
/// script as if killed.
pub fn deliver_signal(ctx: &mut ShellContext, signal: i32) -> Result<ExecResult, InterpreterError> {
    let Some(name) = signal_name(signal) else {
        return Ok(ExecResult::ok());
    };
    match ctx.traps.get(name) {
        Some(TrapAction::Ignore) => Ok(ExecResult::ok()),
        Some(TrapAction::Command(_)) => run_trap(ctx, name),
        None if matches!(name, "CHLD" | "WINCH" | "CONT") => Ok(ExecResult::ok()),
        None => Err(ExitError::new(128 + signal).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_trap_name("SIGINT").as_deref(), Some("INT"));
        assert_eq!(normalize_trap_name("term").as_deref(), Some("TERM"));
        assert_eq!(normalize_trap_name("0").as_deref(), Some("EXIT"));
        assert_eq!(normalize_trap_name("15").as_deref(), Some("TERM"));
        assert_eq!(normalize_trap_name("zerr").as_deref(), Some("ERR"));
        assert_eq!(normalize_trap_name("BOGUS"), None);
    }

    #[test]
    fn test_trap_preserves_status() {
        let mut ctx = ShellContext::default();
        ctx.traps.insert("USR1".into(), TrapAction::Command("echo got; false".into()));
        ctx.last_exit_code = 7;
        let r = run_trap(&mut ctx, "USR1").unwrap();
        assert_eq!(r.stdout, "got\n");
        assert_eq!(ctx.last_exit_code, 7);
        assert!(ctx.traps.contains_key("USR1"));
    }

    #[test]
    fn test_untrapped_signal_terminates() {
        let mut ctx = ShellContext::default();
        let err = deliver_signal(&mut ctx, 15).unwrap_err();
        assert_eq!(err.exit_code(), 143);
        ctx.traps.insert("TERM".into(), TrapAction::Ignore);
        assert!(deliver_signal(&mut ctx, 15).is_ok());
    }
}
