//! shift - Shift positional parameters
//!
//! shift [n] [array ...]
//!
//! Drops the first n (default 1) positional parameters, or the first n
//! elements of each named array.

use super::builtin_error;
use crate::interpreter::assoc_arrays::ShellArray;
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::types::{ExecResult, ShellContext};
use crate::interpreter::word_expansion::evaluate_arithmetic_text;

pub fn handle_shift(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let (count, arrays) = match args.first() {
        Some(first) if !ctx.is_array(first) => {
            let n = evaluate_arithmetic_text(ctx, first)?.as_int();
            (n, &args[1..])
        }
        _ => (1, args),
    };
    if count < 0 {
        return Ok(builtin_error("shift", format!("argument to shift must be non-negative: {}", count)));
    }
    let count = count as usize;

    if arrays.is_empty() {
        if count > ctx.positional.len() {
            return Ok(builtin_error("shift", "shift count must be <= $#"));
        }
        ctx.positional.drain(..count);
        return Ok(ExecResult::ok());
    }

    for name in arrays {
        let values = ctx.array_values(name).unwrap_or_default();
        if count > values.len() {
            return Ok(builtin_error("shift", format!("shift count must be <= ${{#{}}}", name)));
        }
        ctx.set_array(name, ShellArray::from_values(values[count..].to_vec()))?;
    }
    Ok(ExecResult::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shift_positional() {
        let mut ctx = ShellContext::default();
        ctx.positional = args(&["a", "b", "c"]);
        handle_shift(&mut ctx, &[]).unwrap();
        assert_eq!(ctx.positional, args(&["b", "c"]));
        handle_shift(&mut ctx, &args(&["2"])).unwrap();
        assert!(ctx.positional.is_empty());
        let r = handle_shift(&mut ctx, &[]).unwrap();
        assert_eq!(r.exit_code, 1);
    }

    #[test]
    fn test_shift_array() {
        let mut ctx = ShellContext::default();
        ctx.set_array("arr", ShellArray::from_values(args(&["x", "y", "z"]))).unwrap();
        handle_shift(&mut ctx, &args(&["2", "arr"])).unwrap();
        assert_eq!(ctx.array_values("arr").unwrap(), args(&["z"]));
        handle_shift(&mut ctx, &args(&["arr"])).unwrap();
        assert!(ctx.array_values("arr").unwrap().is_empty());
    }
}
