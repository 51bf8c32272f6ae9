//! trap - Register handlers for signals and shell events
//!
//! trap                 - list handlers
//! trap -l              - list signal names
//! trap cmd SIG ...     - run cmd when SIG arrives (EXIT, ERR/ZERR, DEBUG too)
//! trap '' SIG ...      - ignore SIG
//! trap - SIG ...       - restore the default
//!
//! Signals may be given as names, with or without `SIG`, or numbers.

use super::builtin_error;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::quoting::single_quote;
use crate::interpreter::jobs::{signal_names, signal_number};
use crate::interpreter::traps::normalize_trap_name;
use crate::interpreter::types::{ExecResult, ShellContext, TrapAction};

fn list_traps(ctx: &ShellContext, only: &[String]) -> String {
    let mut names: Vec<&String> = ctx.traps.keys().collect();
    names.sort_by_key(|name| (signal_number(name).unwrap_or(i32::MAX), name.to_string()));
    names
        .into_iter()
        .filter(|name| only.is_empty() || only.contains(name))
        .filter_map(|name| {
            let command = match ctx.traps.get(name)? {
                TrapAction::Command(c) => single_quote(c),
                TrapAction::Ignore => "''".to_string(),
            };
            Some(format!("trap -- {} {}\n", command, name))
        })
        .collect()
}

/// Handle the trap builtin command
pub fn handle_trap(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let mut args = args;
    match args.first().map(String::as_str) {
        None => return Ok(ExecResult::new(list_traps(ctx, &[]), String::new(), 0)),
        Some("-l") => {
            let stdout = signal_names().join(" ") + "\n";
            return Ok(ExecResult::new(stdout, String::new(), 0));
        }
        Some("-p") => {
            let only: Vec<String> = args[1..].iter().filter_map(|n| normalize_trap_name(n)).collect();
            return Ok(ExecResult::new(list_traps(ctx, &only), String::new(), 0));
        }
        Some("--") => args = &args[1..],
        _ => {}
    }

    let Some((action, signals)) = args.split_first() else {
        return Ok(ExecResult::new(list_traps(ctx, &[]), String::new(), 0));
    };
    // A lone signal operand resets it
    let (action, signals) = if signals.is_empty() {
        ("-", args)
    } else {
        (action.as_str(), signals)
    };

    let mut result = ExecResult::ok();
    for signal in signals {
        let Some(name) = normalize_trap_name(signal) else {
            let err = builtin_error("trap", format!("undefined signal: {}", signal));
            result.stderr.push_str(&err.stderr);
            result.exit_code = 1;
            continue;
        };
        match action {
            "-" => {
                ctx.traps.remove(&name);
            }
            "" => {
                ctx.traps.insert(name, TrapAction::Ignore);
            }
            command => {
                ctx.traps.insert(name, TrapAction::Command(command.to_string()));
            }
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_register_and_list() {
        let mut ctx = ShellContext::default();
        handle_trap(&mut ctx, &args(&["echo bye", "EXIT", "SIGTERM"])).unwrap();
        handle_trap(&mut ctx, &args(&["", "2"])).unwrap();
        let r = handle_trap(&mut ctx, &[]).unwrap();
        assert_eq!(r.stdout, "trap -- 'echo bye' EXIT\ntrap -- '' INT\ntrap -- 'echo bye' TERM\n");
    }

    #[test]
    fn test_reset() {
        let mut ctx = ShellContext::default();
        handle_trap(&mut ctx, &args(&["echo x", "USR1"])).unwrap();
        handle_trap(&mut ctx, &args(&["-", "USR1"])).unwrap();
        assert!(ctx.traps.is_empty());
        handle_trap(&mut ctx, &args(&["echo x", "USR1"])).unwrap();
        handle_trap(&mut ctx, &args(&["USR1"])).unwrap();
        assert!(ctx.traps.is_empty());
    }

    #[test]
    fn test_undefined_signal() {
        let mut ctx = ShellContext::default();
        let r = handle_trap(&mut ctx, &args(&["echo", "NOPE"])).unwrap();
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.stderr, "zshell: trap: undefined signal: NOPE\n");
    }

    #[test]
    fn test_zerr_alias() {
        let mut ctx = ShellContext::default();
        handle_trap(&mut ctx, &args(&["echo failed", "ZERR"])).unwrap();
        assert_eq!(ctx.traps.get("ERR"), Some(&TrapAction::Command("echo failed".into())));
    }
}
