//! export - Mark variables for the environment of child processes
//!
//! export [-p] [-n] [name[=value] ...]
//! - no operands / -p  - list exported variables
//! - -n                - remove the export attribute

use super::{builtin_error, is_identifier, split_flags};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::quoting::quote_value;
use crate::interpreter::types::{ExecResult, ShellContext};

fn list_exported(ctx: &ShellContext) -> String {
    let mut names: Vec<&String> = ctx.exported.iter().collect();
    names.sort();
    names
        .into_iter()
        .filter_map(|name| {
            let value = ctx.vars.get(name).cloned().or_else(|| ctx.arrays.get(name).map(|a| a.values().join(" ")))?;
            Some(format!("export {}={}\n", name, quote_value(&value)))
        })
        .collect()
}

/// Handle the export builtin command
pub fn handle_export(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, operands) = split_flags(args);
    let mut unexport = false;
    for (flag, _) in flags {
        match flag {
            'n' => unexport = true,
            'p' => {}
            other => return Ok(builtin_error("export", format!("bad option: -{}", other))),
        }
    }

    if operands.is_empty() {
        return Ok(ExecResult::new(list_exported(ctx), String::new(), 0));
    }

    let mut result = ExecResult::ok();
    for operand in operands {
        let (name, value) = match operand.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (operand.as_str(), None),
        };
        if !is_identifier(name) {
            result.stderr.push_str(&format!("zshell: export: not an identifier: {}\n", name));
            result.exit_code = 1;
            continue;
        }
        if unexport {
            ctx.exported.remove(name);
            if let Some(v) = value {
                ctx.assign(name, v)?;
            }
            continue;
        }
        if let Some(v) = value {
            ctx.assign(name, v)?;
        }
        ctx.export(name);
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
    fn test_export_assign_and_list() {
        let mut ctx = ShellContext::default();
        ctx.exported.clear();
        handle_export(&mut ctx, &args(&["A=1", "B=two words"])).unwrap();
        assert!(ctx.child_env().contains(&("A".to_string(), "1".to_string())));
        let r = handle_export(&mut ctx, &args(&["-p"])).unwrap();
        assert_eq!(r.stdout, "export A=1\nexport B='two words'\n");
    }

    #[test]
    fn test_export_n_removes_attribute() {
        let mut ctx = ShellContext::default();
        handle_export(&mut ctx, &args(&["A=1"])).unwrap();
        handle_export(&mut ctx, &args(&["-n", "A"])).unwrap();
        assert!(!ctx.exported.contains("A"));
        assert_eq!(ctx.get_var("A").as_deref(), Some("1"));
    }

    #[test]
    fn test_export_invalid_name() {
        let mut ctx = ShellContext::default();
        let r = handle_export(&mut ctx, &args(&["1x=1"])).unwrap();
        assert_eq!(r.exit_code, 1);
    }
}
