//! Builtin Commands
//!
//! Every builtin has the same shape: it receives the context and its
//! arguments (without the command name) and returns its captured output.
//! Control flow builtins (`break`, `return`, `exit`, ...) answer with an
//! `InterpreterError` instead.

use std::fmt::Display;

use crate::interpreter::types::ExecResult;

pub mod alias_cmd;
pub mod break_cmd;
pub mod cd_cmd;
pub mod continue_cmd;
pub mod declare_cmd;
pub mod echo_cmd;
pub mod eval_cmd;
pub mod exit_cmd;
pub mod export_cmd;
pub mod getopts_cmd;
pub mod history_cmd;
pub mod jobs_cmd;
pub mod kill_cmd;
pub mod let_cmd;
pub mod local_cmd;
pub mod printf_cmd;
pub mod read_cmd;
pub mod return_cmd;
pub mod set_cmd;
pub mod setopt_cmd;
pub mod shift_cmd;
pub mod source_cmd;
pub mod test_cmd;
pub mod trap_cmd;
pub mod type_cmd;
pub mod unset_cmd;

/// `zshell: cmd: msg` with status 1
pub fn builtin_error(cmd: &str, msg: impl Display) -> ExecResult {
    ExecResult::failure_with_code(format!("zshell: {}: {}\n", cmd, msg), 1)
}

/// Bad options or arguments: status 2
pub fn usage_error(cmd: &str, msg: impl Display) -> ExecResult {
    ExecResult::failure_with_code(format!("zshell: {}: {}\n", cmd, msg), 2)
}

/// Split leading `-abc`/`+abc` flag words from the operands. `--` ends the
/// flags; a lone `-` is an operand.
pub fn split_flags(args: &[String]) -> (Vec<(char, bool)>, &[String]) {
    let mut flags = Vec::new();
    let mut i = 0;
    while let Some(arg) = args.get(i) {
        if arg == "--" {
            i += 1;
            break;
        }
        let on = match arg.chars().next() {
            Some('-') => true,
            Some('+') => false,
            _ => break,
        };
        if arg.len() < 2 {
            break;
        }
        flags.extend(arg[1..].chars().map(|c| (c, on)));
        i += 1;
    }
    (flags, &args[i..])
}

/// Whether a name is a valid variable identifier
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => chars.all(|c| c.is_ascii_alphanumeric() || c == '_'),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_flags() {
        let args: Vec<String> = ["-ab", "+x", "--", "-c", "name"].iter().map(|s| s.to_string()).collect();
        let (flags, rest) = split_flags(&args);
        assert_eq!(flags, vec![('a', true), ('b', true), ('x', false)]);
        assert_eq!(rest, &args[3..]);
        let args: Vec<String> = vec!["-".to_string()];
        assert_eq!(split_flags(&args).1.len(), 1);
    }

    #[test]
    fn test_identifier() {
        assert!(is_identifier("_a1"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier(""));
    }
}
