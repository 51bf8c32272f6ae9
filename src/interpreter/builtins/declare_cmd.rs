//! typeset / declare / readonly / integer - Declare variables and give them attributes
//!
//! typeset [-aAirxgp] [+irx] [name[=value] ...]
//! - no operands   - list variables (those carrying the given attributes)
//! - -p            - print declarations that can be read back
//! - -a / -A       - indexed / associative array; `name=(...)` sets elements
//! - -i            - integer; assignments are evaluated arithmetically
//! - -x / +x       - export / stop exporting
//! - -r            - readonly
//! - -g            - inside a function, operate on the global variable
//! - -f            - list or check function names
//!
//! Inside a function every name is made local unless `-g` is given.

use super::{builtin_error, is_identifier, split_flags};
use crate::interpreter::assoc_arrays::{ArrayKind, ShellArray};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::quoting::{quote_value, single_quote};
use crate::interpreter::types::{ExecResult, ShellContext};
use crate::interpreter::word_expansion::evaluate_arithmetic_text;

/// Attribute flags of one declaration command
#[derive(Debug, Default, Clone, Copy)]
pub(super) struct Attributes {
    pub indexed: bool,
    pub associative: bool,
    pub integer: bool,
    pub export: bool,
    pub unexport: bool,
    pub readonly: bool,
    pub global: bool,
    pub print: bool,
    pub functions: bool,
    /// Make names local even when `-g` is absent and no scope exists
    pub local: bool,
}

impl Attributes {
    fn filters(&self) -> bool {
        self.indexed || self.associative || self.integer || self.export || self.readonly
    }

    fn matches(&self, ctx: &ShellContext, name: &str) -> bool {
        (!self.indexed || (ctx.is_array(name) && !ctx.arrays.is_associative(name)))
            && (!self.associative || ctx.arrays.is_associative(name))
            && (!self.integer || ctx.integer_vars.contains(name))
            && (!self.export || ctx.exported.contains(name))
            && (!self.readonly || ctx.readonly.contains(name))
    }
}

/// Render one variable as a `typeset` command
pub(super) fn format_declaration(ctx: &ShellContext, name: &str) -> Option<String> {
    let mut flags = String::new();
    let value = if let Some(array) = ctx.arrays.get(name) {
        if array.is_associative() {
            flags.push('A');
            let entries: Vec<String> = array
                .keys()
                .iter()
                .filter_map(|k| array.get(k).map(|v| format!("[{}]={}", quote_value(k), single_quote(v))))
                .collect();
            format!("( {} )", entries.join(" "))
        } else {
            flags.push('a');
            let values: Vec<String> = array.values().iter().map(|v| single_quote(v)).collect();
            format!("( {} )", values.join(" "))
        }
    } else {
        single_quote(ctx.vars.get(name)?)
    };
    if ctx.integer_vars.contains(name) {
        flags.push('i');
    }
    if ctx.readonly.contains(name) {
        flags.push('r');
    }
    if ctx.exported.contains(name) {
        flags.push('x');
    }
    let flags = if flags.is_empty() { String::new() } else { format!("-{} ", flags) };
    Some(format!("typeset {}{}={}", flags, name, value))
}

/// Every variable name, scalars and arrays, sorted
pub(super) fn variable_names(ctx: &ShellContext) -> Vec<String> {
    let mut names: Vec<String> = ctx.vars.keys().cloned().collect();
    names.extend(ctx.arrays.names());
    names.sort();
    names.dedup();
    names
}

/// Elements of an `(a b [k]=v)` literal, already expanded
fn parse_array_literal(value: &str) -> Option<Vec<(Option<String>, String)>> {
    let inner = value.strip_prefix('(')?.strip_suffix(')')?;
    let elements = inner
        .split_whitespace()
        .map(|word| {
            if let Some(rest) = word.strip_prefix('[') {
                if let Some((key, value)) = rest.split_once("]=") {
                    return (Some(key.to_string()), value.to_string());
                }
            }
            (None, word.to_string())
        })
        .collect();
    Some(elements)
}

fn build_array(kind: ArrayKind, elements: Vec<(Option<String>, String)>) -> ShellArray {
    let mut array = ShellArray::new(kind);
    let mut pending_key: Option<String> = None;
    for (key, value) in elements {
        match (key, kind) {
            (Some(key), _) => {
                array.set(&key, value);
            }
            (None, ArrayKind::Indexed) => array.push(value),
            (None, ArrayKind::Associative) => match pending_key.take() {
                Some(key) => {
                    array.set(&key, value);
                }
                None => pending_key = Some(value),
            },
        }
    }
    if let Some(key) = pending_key {
        array.set(&key, String::new());
    }
    array
}

fn declare_one(
    ctx: &mut ShellContext,
    attrs: &Attributes,
    name: &str,
    value: Option<&str>,
) -> Result<(), InterpreterError> {
    let in_function = !ctx.local_scopes.is_empty();
    let make_local = (attrs.local || in_function) && !attrs.global;
    let fresh_local = make_local && !ctx.is_local(name);
    if make_local {
        ctx.declare_local(name);
    }
    if fresh_local {
        // A new local starts out empty; attributes are not inherited
        ctx.check_writable(name)?;
        ctx.vars.remove(name);
        ctx.arrays.remove(name);
        ctx.integer_vars.remove(name);
        ctx.exported.remove(name);
    }

    if attrs.integer {
        ctx.integer_vars.insert(name.to_string());
    }

    let literal = value.and_then(parse_array_literal);
    if attrs.associative || attrs.indexed || literal.is_some() {
        let kind = if attrs.associative || ctx.arrays.is_associative(name) {
            ArrayKind::Associative
        } else {
            ArrayKind::Indexed
        };
        ctx.check_writable(name)?;
        match literal {
            Some(elements) => ctx.set_array(name, build_array(kind, elements))?,
            None => {
                let scalar = ctx.vars.remove(name);
                let array = ctx.arrays.declare(name, kind);
                if let (Some(v), ArrayKind::Indexed) = (scalar, kind) {
                    if array.is_empty() {
                        array.set("0", v);
                    }
                }
                if let Some(v) = value {
                    array.set("0", v.to_string());
                }
            }
        }
    } else if let Some(v) = value {
        let v = if ctx.integer_vars.contains(name) {
            evaluate_arithmetic_text(ctx, v)?.as_int().to_string()
        } else {
            v.to_string()
        };
        ctx.assign(name, v)?;
    } else if fresh_local || !ctx.is_set(name) {
        ctx.assign(name, if attrs.integer { "0" } else { "" })?;
    } else if attrs.integer {
        let current = ctx.get_var(name).unwrap_or_default();
        let n = evaluate_arithmetic_text(ctx, &current)?.as_int();
        ctx.assign(name, n.to_string())?;
    }

    if attrs.export {
        ctx.export(name);
    }
    if attrs.unexport {
        ctx.exported.remove(name);
    }
    if attrs.readonly {
        ctx.readonly.insert(name.to_string());
    }
    Ok(())
}

fn list_variables(ctx: &ShellContext, attrs: &Attributes) -> String {
    let mut out = String::new();
    for name in variable_names(ctx) {
        if !attrs.matches(ctx, &name) {
            continue;
        }
        let line = if attrs.print || attrs.filters() {
            format_declaration(ctx, &name)
        } else if let Some(values) = ctx.arrays.get(&name).map(|a| a.values()) {
            let quoted: Vec<String> = values.iter().map(|v| quote_value(v)).collect();
            Some(format!("{}=( {} )", name, quoted.join(" ")))
        } else {
            ctx.vars.get(&name).map(|v| format!("{}={}", name, quote_value(v)))
        };
        if let Some(line) = line {
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

/// Shared body of `typeset`, `local`, `readonly`, `integer` and `export`
pub(super) fn run_declaration(
    ctx: &mut ShellContext,
    cmd: &str,
    args: &[String],
    mut attrs: Attributes,
) -> Result<ExecResult, InterpreterError> {
    let (flags, operands) = split_flags(args);
    for (flag, on) in flags {
        match (flag, on) {
            ('a', true) => attrs.indexed = true,
            ('A', true) => attrs.associative = true,
            ('i', true) => attrs.integer = true,
            ('i', false) => attrs.integer = false,
            ('x', true) => attrs.export = true,
            ('x', false) => attrs.unexport = true,
            ('r', true) => attrs.readonly = true,
            ('g', _) => attrs.global = true,
            ('p', _) => attrs.print = true,
            ('f', _) => attrs.functions = true,
            (other, _) => return Ok(builtin_error(cmd, format!("bad option: -{}", other))),
        }
    }

    if attrs.functions {
        return Ok(list_functions(ctx, cmd, operands));
    }
    if operands.is_empty() {
        return Ok(ExecResult::new(list_variables(ctx, &attrs), String::new(), 0));
    }

    let mut stdout = String::new();
    let mut stderr = String::new();
    let mut status = 0;
    for operand in operands {
        let (name, value) = match operand.split_once('=') {
            Some((n, v)) => (n, Some(v)),
            None => (operand.as_str(), None),
        };
        if !is_identifier(name) {
            stderr.push_str(&format!("zshell: {}: not an identifier: {}\n", cmd, name));
            status = 1;
            continue;
        }
        if attrs.print && value.is_none() {
            match format_declaration(ctx, name) {
                Some(line) => {
                    stdout.push_str(&line);
                    stdout.push('\n');
                }
                None => {
                    stderr.push_str(&format!("zshell: {}: no such variable: {}\n", cmd, name));
                    status = 1;
                }
            }
            continue;
        }
        declare_one(ctx, &attrs, name, value)?;
    }
    Ok(ExecResult::new(stdout, stderr, status))
}

fn list_functions(ctx: &ShellContext, cmd: &str, names: &[String]) -> ExecResult {
    if names.is_empty() {
        let stdout: String = ctx.functions.keys().map(|n| format!("{}\n", n)).collect();
        return ExecResult::new(stdout, String::new(), 0);
    }
    let mut result = ExecResult::ok();
    for name in names {
        if ctx.functions.contains_key(name.as_str()) {
            result.stdout.push_str(&format!("{}\n", name));
        } else {
            result.stderr.push_str(&format!("zshell: {}: no such function: {}\n", cmd, name));
            result.exit_code = 1;
        }
    }
    result
}

/// Handle the typeset/declare builtin command
pub fn handle_typeset(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    run_declaration(ctx, "typeset", args, Attributes::default())
}

pub fn handle_readonly(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let attrs = Attributes {
        readonly: true,
        global: true,
        ..Attributes::default()
    };
    run_declaration(ctx, "readonly", args, attrs)
}

pub fn handle_integer(ctx: &mut ShellContext, args: &[String]) -> Result<ExecResult, InterpreterError> {
    let attrs = Attributes {
        integer: true,
        ..Attributes::default()
    };
    run_declaration(ctx, "integer", args, attrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::execution_engine::ExecutionEngine;
    use crate::parser::parse;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn run(script: &str) -> ExecResult {
        let mut ctx = ShellContext::default();
        ExecutionEngine.run_isolated(&mut ctx, &parse(script).unwrap())
    }

    #[test]
    fn test_typeset_scalar_and_print() {
        let mut ctx = ShellContext::default();
        handle_typeset(&mut ctx, &args(&["-x", "name=it's"])).unwrap();
        assert!(ctx.exported.contains("name"));
        let r = handle_typeset(&mut ctx, &args(&["-p", "name"])).unwrap();
        assert_eq!(r.stdout, "typeset -x name='it'\\''s'\n");
    }

    #[test]
    fn test_typeset_arrays() {
        let mut ctx = ShellContext::default();
        handle_typeset(&mut ctx, &args(&["-a", "list=(a b c)"])).unwrap();
        assert_eq!(ctx.array_values("list"), Some(args(&["a", "b", "c"])));
        handle_typeset(&mut ctx, &args(&["-A", "map=([k]=v [x]=y)"])).unwrap();
        assert!(ctx.arrays.is_associative("map"));
        assert_eq!(ctx.arrays.get("map").unwrap().get("x").map(String::as_str), Some("y"));
        let r = handle_typeset(&mut ctx, &args(&["-p", "map"])).unwrap();
        assert_eq!(r.stdout, "typeset -A map=( [k]='v' [x]='y' )\n");
    }

    #[test]
    fn test_integer_attribute() {
        let mut ctx = ShellContext::default();
        handle_integer(&mut ctx, &args(&["n=6*7"])).unwrap();
        assert_eq!(ctx.get_var("n").as_deref(), Some("42"));
        assert!(ctx.integer_vars.contains("n"));
    }

    #[test]
    fn test_readonly() {
        let mut ctx = ShellContext::default();
        handle_readonly(&mut ctx, &args(&["R=1"])).unwrap();
        let err = handle_typeset(&mut ctx, &args(&["R=2"])).unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert_eq!(ctx.get_var("R").as_deref(), Some("1"));
    }

    #[test]
    fn test_invalid_identifier() {
        let mut ctx = ShellContext::default();
        let r = handle_typeset(&mut ctx, &args(&["1x=3"])).unwrap();
        assert_eq!(r.exit_code, 1);
        assert_eq!(r.stderr, "zshell: typeset: not an identifier: 1x\n");
    }

    #[test]
    fn test_typeset_in_function_is_local() {
        let r = run("x=g; f() { typeset x=l; typeset -g y=global; echo $x; }; f; echo $x $y");
        assert_eq!(r.stdout, "l\ng global\n");
    }
}
