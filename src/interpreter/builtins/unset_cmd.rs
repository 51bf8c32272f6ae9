//! unset - Remove variables, array elements or functions
//!
//! unset [-v] name ...      - remove variables
//! unset 'name[subscript]'  - remove one array element
//! unset -f name ...        - remove functions

use super::{builtin_error, is_identifier, split_flags};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};
use crate::interpreter::word_expansion::subscript_key;

/// `name[sub]` -> (`name`, `sub`)
fn split_subscript(operand: &str) -> Option<(&str, &str)> {
    let open = operand.find('[')?;
    let inner = operand[open + 1..].strip_suffix(']')?;
    Some((&operand[..open], inner))
}

fn unset_element(ctx: &mut ShellContext, name: &str, subscript: &str) -> Result<(), InterpreterError> {
    ctx.check_writable(name)?;
    if subscript == "@" || subscript == "*" {
        return ctx.unset_var(name);
    }
    let key = subscript_key(ctx, name, subscript)?;
    if let Some(array) = ctx.arrays.get_mut(name) {
        array.remove(&key);
    } else if key == "0" {
        ctx.unset_var(name)?;
    }
    Ok(())
}

/// Handle the unset builtin command
pub fn handle_unset(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (flags, operands) = split_flags(args);
    let mut functions = false;
    for (flag, _) in flags {
        match flag {
            'f' => functions = true,
            'v' => functions = false,
            other => return Ok(builtin_error("unset", format!("bad option: -{}", other))),
        }
    }

    let mut result = ExecResult::ok();
    for operand in operands {
        if functions {
            ctx.functions.shift_remove(operand.as_str());
            continue;
        }
        if let Some((name, subscript)) = split_subscript(operand) {
            if is_identifier(name) {
                unset_element(ctx, name, subscript)?;
                continue;
            }
        }
        if !is_identifier(operand) {
            result.stderr.push_str(&format!("zshell: unset: {}: invalid parameter name\n", operand));
            result.exit_code = 1;
            continue;
        }
        ctx.unset_var(operand)?;
    }
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::assoc_arrays::ShellArray;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_unset_variable() {
        let mut ctx = ShellContext::default();
        ctx.set_var("x", "1");
        ctx.export("x");
        handle_unset(&mut ctx, &args(&["x"])).unwrap();
        assert!(!ctx.is_set("x"));
        assert!(!ctx.exported.contains("x"));
    }

    #[test]
    fn test_unset_array_element() {
        let mut ctx = ShellContext::default();
        ctx.set_array("a", ShellArray::from_values(args(&["x", "y", "z"]))).unwrap();
        handle_unset(&mut ctx, &args(&["a[1]"])).unwrap();
        assert_eq!(ctx.array_values("a"), Some(args(&["x", "z"])));
        handle_unset(&mut ctx, &args(&["a[@]"])).unwrap();
        assert!(!ctx.is_set("a"));
    }

    #[test]
    fn test_unset_readonly_fails() {
        let mut ctx = ShellContext::default();
        ctx.set_var("r", "1");
        ctx.readonly.insert("r".into());
        assert!(handle_unset(&mut ctx, &args(&["r"])).is_err());
    }

    #[test]
    fn test_unset_function() {
        let mut ctx = ShellContext::default();
        let script = crate::parser::parse("f() { :; }").unwrap();
        crate::interpreter::execution_engine::ExecutionEngine.run_isolated(&mut ctx, &script);
        assert!(ctx.functions.contains_key("f"));
        handle_unset(&mut ctx, &args(&["-f", "f"])).unwrap();
        assert!(!ctx.functions.contains_key("f"));
    }
}
