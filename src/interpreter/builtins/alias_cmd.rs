//! alias / unalias - Define and remove command aliases
//!
//! alias                 - list aliases
//! alias name=value ...  - define
//! alias name ...        - print definitions
//! unalias [-a] name ... - remove
//!
//! Aliases are expanded by the parser, so a definition takes effect from
//! the next line (or the next `eval`) on.

use super::{builtin_error, split_flags};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::quoting::quote_value;
use crate::interpreter::types::{ExecResult, ShellContext};

fn format_alias(name: &str, value: &str) -> String {
    format!("{}={}\n", name, quote_value(value))
}

/// Handle the alias builtin command
pub fn handle_alias(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (_, operands) = split_flags(args);
    if operands.is_empty() {
        let mut names: Vec<&String> = ctx.aliases.keys().collect();
        names.sort();
        let stdout: String = names.into_iter().map(|n| format_alias(n, &ctx.aliases[n.as_str()])).collect();
        return Ok(ExecResult::new(stdout, String::new(), 0));
    }

    let mut result = ExecResult::ok();
    for operand in operands {
        match operand.split_once('=') {
            Some((name, _)) if name.is_empty() => {
                result.stderr.push_str(&format!("zshell: alias: bad assignment: {}\n", operand));
                result.exit_code = 1;
            }
            Some((name, value)) => {
                ctx.aliases.insert(name.to_string(), value.to_string());
            }
            None => match ctx.aliases.get(operand.as_str()) {
                Some(value) => result.stdout.push_str(&format_alias(operand, value)),
                None => result.exit_code = 1,
            },
        }
    }
    Ok(result)
}

pub fn handle_unalias(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, operands) = split_flags(args);
    if flags.iter().any(|(c, _)| *c == 'a') {
        ctx.aliases.clear();
        return Ok(ExecResult::ok());
    }
    if operands.is_empty() {
        return Ok(builtin_error("unalias", "not enough arguments"));
    }
    let mut result = ExecResult::ok();
    for name in operands {
        if ctx.aliases.shift_remove(name.as_str()).is_none() {
            result.stderr.push_str(&format!("zshell: unalias: no such hash table element: {}\n", name));
            result.exit_code = 1;
        }
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::execution_engine::ExecutionEngine;
    use crate::parser::parse;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_define_list_remove() {
        let mut ctx = ShellContext::default();
        handle_alias(&mut ctx, &args(&["ll=ls -l", "g=grep"])).unwrap();
        let r = handle_alias(&mut ctx, &[]).unwrap();
        assert_eq!(r.stdout, "g=grep\nll='ls -l'\n");
        assert_eq!(handle_alias(&mut ctx, &args(&["ll"])).unwrap().stdout, "ll='ls -l'\n");
        assert_eq!(handle_alias(&mut ctx, &args(&["nope"])).unwrap().exit_code, 1);
        handle_unalias(&mut ctx, &args(&["g"])).unwrap();
        assert!(!ctx.aliases.contains_key("g"));
        let r = handle_unalias(&mut ctx, &args(&["g"])).unwrap();
        assert_eq!(r.exit_code, 1);
    }

    #[test]
    fn test_alias_used_on_later_lines() {
        let mut ctx = ShellContext::default();
        let script = parse("alias say='echo said'\neval 'say hi'").unwrap();
        let r = ExecutionEngine.run_isolated(&mut ctx, &script);
        assert_eq!(r.stdout, "said hi\n");
    }
}
