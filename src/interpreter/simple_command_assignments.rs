//! Simple Command Assignment Handling
//!
//! - Scalar assignments: `VAR=value`, `VAR+=value`
//! - Array assignments: `VAR=(a b c)`, `VAR+=(d)`, `VAR=([k]=v)`
//! - Subscript assignments: `VAR[idx]=value`
//! - Integer variables (`typeset -i`) evaluate the value arithmetically
//!
//! Assignments without a command persist. Assignments in front of a
//! builtin or function are applied for its duration and then undone; in
//! front of an external command they only reach its environment.

use crate::ast::types::{ArrayElement, AssignmentNode};
use crate::interpreter::assoc_arrays::{ArrayKind, ShellArray};
use crate::interpreter::errors::InterpreterError;
use crate::interpreter::helpers::quoting::quote_value;
use crate::interpreter::types::ShellContext;
use crate::interpreter::word_expansion::{
    associative_key, evaluate_arithmetic_text, expand_word_fields, expand_word_string, subscript_key,
};

/// Apply assignments for good. Returns the words xtrace should show.
pub fn apply_assignments(
    ctx: &mut ShellContext,
    assignments: &[AssignmentNode],
) -> Result<Vec<String>, InterpreterError> {
    let mut traced = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        traced.push(apply_assignment(ctx, assignment)?);
    }
    Ok(traced)
}

/// Apply one assignment; returns its xtrace rendering
pub fn apply_assignment(ctx: &mut ShellContext, assignment: &AssignmentNode) -> Result<String, InterpreterError> {
    let name = assignment.name.as_str();
    let op = if assignment.append { "+=" } else { "=" };

    if let Some(elements) = &assignment.array {
        let values = assign_array(ctx, name, elements, assignment.append)?;
        let rendered: Vec<String> = values.iter().map(|v| quote_value(v)).collect();
        return Ok(format!("{}{}( {} )", name, op, rendered.join(" ")));
    }

    let value = match &assignment.value {
        Some(word) => expand_word_string(ctx, word)?,
        None => String::new(),
    };

    if let Some(subscript) = &assignment.subscript {
        let key = subscript_key(ctx, name, subscript)?;
        let value = if assignment.append {
            let current = ctx.arrays.get(name).and_then(|a| a.get(&key)).cloned().unwrap_or_default();
            current + &value
        } else {
            value
        };
        ctx.set_array_element(name, &key, value.clone())?;
        return Ok(format!("{}[{}]={}", name, key, quote_value(&value)));
    }

    let value = scalar_value(ctx, name, value, assignment.append)?;
    if assignment.append && ctx.is_array(name) && !ctx.arrays.is_associative(name) {
        ctx.check_writable(name)?;
        if let Some(array) = ctx.arrays.get_mut(name) {
            array.push(value.clone());
        }
    } else {
        ctx.assign(name, value.clone())?;
    }
    Ok(format!("{}={}", name, quote_value(&value)))
}

/// Final value of a scalar assignment, honouring `+=` and integer
/// variables
fn scalar_value(ctx: &mut ShellContext, name: &str, value: String, append: bool) -> Result<String, InterpreterError> {
    if ctx.integer_vars.contains(name) {
        let n = evaluate_arithmetic_text(ctx, &value)?.as_int();
        if append {
            let current: i64 = ctx.vars.get(name).and_then(|v| v.parse().ok()).unwrap_or(0);
            return Ok(current.wrapping_add(n).to_string());
        }
        return Ok(n.to_string());
    }
    if append && !ctx.is_array(name) {
        let current = ctx.get_var(name).unwrap_or_default();
        return Ok(current + &value);
    }
    Ok(value)
}

fn assign_array(
    ctx: &mut ShellContext,
    name: &str,
    elements: &[ArrayElement],
    append: bool,
) -> Result<Vec<String>, InterpreterError> {
    ctx.check_writable(name)?;
    let associative = ctx.arrays.is_associative(name);
    let mut array = match (append, ctx.arrays.get(name)) {
        (true, Some(existing)) => existing.clone(),
        (true, None) => {
            let mut a = ShellArray::new(ArrayKind::Indexed);
            if let Some(v) = ctx.vars.get(name) {
                a.set("0", v.clone());
            }
            a
        }
        (false, _) if associative => ShellArray::new(ArrayKind::Associative),
        (false, _) => ShellArray::new(ArrayKind::Indexed),
    };

    let mut shown = Vec::new();
    let mut pending_key: Option<String> = None;
    for element in elements {
        match &element.key {
            Some(key_text) => {
                let key = subscript_key_for(ctx, &array, name, key_text)?;
                let value = expand_word_string(ctx, &element.value)?;
                shown.push(value.clone());
                array.set(&key, value);
            }
            None => {
                for value in expand_word_fields(ctx, &element.value)? {
                    shown.push(value.clone());
                    if array.is_associative() {
                        // Plain words alternate key, value
                        match pending_key.take() {
                            Some(key) => {
                                array.set(&key, value);
                            }
                            None => pending_key = Some(value),
                        }
                    } else {
                        array.push(value);
                    }
                }
            }
        }
    }
    if let Some(key) = pending_key {
        array.set(&key, String::new());
    }

    ctx.set_array(name, array)?;
    Ok(shown)
}

fn subscript_key_for(
    ctx: &mut ShellContext,
    array: &ShellArray,
    name: &str,
    key_text: &str,
) -> Result<String, InterpreterError> {
    if array.is_associative() {
        return associative_key(ctx, key_text);
    }
    subscript_key(ctx, name, key_text)
}

// ============================================================================
// Prefix assignments
// ============================================================================

/// Expand prefix assignments (`A=1 B=2 cmd`) to name/value pairs without
/// applying them
pub fn expand_prefix_assignments(
    ctx: &mut ShellContext,
    assignments: &[AssignmentNode],
) -> Result<Vec<(String, String)>, InterpreterError> {
    let mut pairs = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let value = match (&assignment.array, &assignment.value) {
            (Some(elements), _) => {
                let mut values = Vec::new();
                for element in elements {
                    values.extend(expand_word_fields(ctx, &element.value)?);
                }
                values.join(" ")
            }
            (None, Some(word)) => expand_word_string(ctx, word)?,
            (None, None) => String::new(),
        };
        let value = scalar_value(ctx, &assignment.name, value, assignment.append)?;
        pairs.push((assignment.name.clone(), value));
    }
    Ok(pairs)
}

/// Prefix assignments in effect for a builtin or function call
#[derive(Debug, Default)]
pub struct TemporaryAssignments {
    saved: Vec<(String, Option<String>, bool)>,
}

impl TemporaryAssignments {
    /// Apply `pairs` as exported variables, remembering what they replaced
    pub fn apply(ctx: &mut ShellContext, pairs: &[(String, String)]) -> Result<Self, InterpreterError> {
        let mut saved = Vec::with_capacity(pairs.len());
        for (name, value) in pairs {
            ctx.check_writable(name)?;
            saved.push((name.clone(), ctx.vars.get(name).cloned(), ctx.exported.contains(name)));
            ctx.set_var(name, value.clone());
            ctx.export(name);
        }
        Ok(Self { saved })
    }

    pub fn restore(self, ctx: &mut ShellContext) {
        for (name, value, exported) in self.saved.into_iter().rev() {
            match value {
                Some(v) => {
                    ctx.vars.insert(name.clone(), v);
                }
                None => {
                    ctx.vars.remove(&name);
                }
            }
            if !exported {
                ctx.exported.remove(&name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::{CommandNode, StatementNode};
    use crate::parser::parse;

    fn assignments(src: &str) -> Vec<AssignmentNode> {
        let script = parse(src).unwrap();
        let StatementNode { pipelines, .. } = &script.statements[0];
        match &pipelines[0].commands[0] {
            CommandNode::Simple(cmd) => cmd.assignments.clone(),
            other => panic!("not a simple command: {:?}", other),
        }
    }

    #[test]
    fn test_scalar_and_append() {
        let mut ctx = ShellContext::default();
        apply_assignments(&mut ctx, &assignments("X=hello")).unwrap();
        apply_assignments(&mut ctx, &assignments("X+=' world'")).unwrap();
        assert_eq!(ctx.get_var("X").as_deref(), Some("hello world"));
    }

    #[test]
    fn test_integer_variable() {
        let mut ctx = ShellContext::default();
        ctx.integer_vars.insert("n".into());
        apply_assignments(&mut ctx, &assignments("n=2+3")).unwrap();
        assert_eq!(ctx.get_var("n").as_deref(), Some("5"));
        apply_assignments(&mut ctx, &assignments("n+=10")).unwrap();
        assert_eq!(ctx.get_var("n").as_deref(), Some("15"));
    }

    #[test]
    fn test_arrays() {
        let mut ctx = ShellContext::default();
        apply_assignments(&mut ctx, &assignments("a=(one two)")).unwrap();
        apply_assignments(&mut ctx, &assignments("a+=(three)")).unwrap();
        apply_assignments(&mut ctx, &assignments("a[5]=six")).unwrap();
        assert_eq!(
            ctx.array_values("a").unwrap(),
            vec!["one", "two", "three", "six"]
        );
        ctx.arrays.declare("m", ArrayKind::Associative);
        apply_assignments(&mut ctx, &assignments("m=(k1 v1 [k2]=v2)")).unwrap();
        let m = ctx.arrays.get("m").unwrap();
        assert_eq!(m.get("k1").map(String::as_str), Some("v1"));
        assert_eq!(m.get("k2").map(String::as_str), Some("v2"));
    }

    #[test]
    fn test_readonly_rejected() {
        let mut ctx = ShellContext::default();
        ctx.set_var("R", "1");
        ctx.readonly.insert("R".into());
        assert!(apply_assignments(&mut ctx, &assignments("R=2")).is_err());
    }

    #[test]
    fn test_temporary_assignments_restore() {
        let mut ctx = ShellContext::default();
        ctx.set_var("A", "outer");
        let pairs = vec![("A".to_string(), "inner".to_string()), ("B".to_string(), "x".to_string())];
        let saved = TemporaryAssignments::apply(&mut ctx, &pairs).unwrap();
        assert_eq!(ctx.get_var("A").as_deref(), Some("inner"));
        assert!(ctx.exported.contains("B"));
        saved.restore(&mut ctx);
        assert_eq!(ctx.get_var("A").as_deref(), Some("outer"));
        assert!(!ctx.exported.contains("A"));
        assert_eq!(ctx.get_var("B"), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_associative_keys_drop_quotes() {
        use crate::interpreter::execution_engine::ExecutionEngine;
        let mut ctx = ShellContext::new(std::env::temp_dir(), std::env::vars().collect());
        let script = parse(
            "typeset -A m; m[\"b c\"]=2; k='b c'; echo \"[${m[$k]}]\"; echo \"${!m[@]}\"\n\
             typeset -A n; n['x']=1; echo ${!n[@]} ${n[x]}",
        )
        .unwrap();
        let r = ExecutionEngine.run_isolated(&mut ctx, &script);
        assert_eq!(r.stdout, "[2]\nb c\nx 1\n");
    }
}
