//! Arithmetic Evaluation
//!
//! Evaluates [`ArithExpr`] trees against the shell state:
//! - 64-bit signed integers with wrapping overflow, and doubles
//! - C operators with short-circuit `&&`/`||` and `?:`
//! - assignment operators, `++`/`--`, `**`, comma
//! - variables whose values are themselves expressions (`x="y+1"`)
//!
//! Mixed integer/float operands promote to float.

use crate::interpreter::errors::{ArithmeticError, InterpreterError};
use crate::interpreter::types::ShellContext;
use crate::parser::arithmetic_parser::{
    parse_arithmetic, parse_int_literal, ArithExpr, AssignOp, BinaryOp, UnaryOp,
};

/// Nesting bound for variables that refer to other expressions
const MAX_VALUE_RECURSION: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArithValue {
    Int(i64),
    Float(f64),
}

impl ArithValue {
    pub fn as_int(&self) -> i64 {
        match self {
            ArithValue::Int(i) => *i,
            ArithValue::Float(f) => *f as i64,
        }
    }

    pub fn as_float(&self) -> f64 {
        match self {
            ArithValue::Int(i) => *i as f64,
            ArithValue::Float(f) => *f,
        }
    }

    pub fn is_true(&self) -> bool {
        match self {
            ArithValue::Int(i) => *i != 0,
            ArithValue::Float(f) => *f != 0.0,
        }
    }
}

impl std::fmt::Display for ArithValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArithValue::Int(i) => write!(f, "{}", i),
            // zsh prints integral doubles with a trailing dot
            ArithValue::Float(x) if x.fract() == 0.0 && x.is_finite() => write!(f, "{}.", *x as i64),
            ArithValue::Float(x) => write!(f, "{}", x),
        }
    }
}

fn bool_value(b: bool) -> ArithValue {
    ArithValue::Int(b as i64)
}

// ============================================================================
// Operators
// ============================================================================

fn apply_binary_op(left: ArithValue, right: ArithValue, op: BinaryOp) -> Result<ArithValue, ArithmeticError> {
    use ArithValue::{Float, Int};

    // Bitwise and shift operators always work on integers
    let int_only = matches!(
        op,
        BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor
    );
    match (left, right) {
        (Int(l), Int(r)) => apply_int_op(l, r, op).map(Int),
        _ if int_only => apply_int_op(left.as_int(), right.as_int(), op).map(Int),
        _ => {
            let (l, r) = (left.as_float(), right.as_float());
            Ok(match op {
                BinaryOp::Add => Float(l + r),
                BinaryOp::Sub => Float(l - r),
                BinaryOp::Mul => Float(l * r),
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(ArithmeticError::new("division by zero"));
                    }
                    Float(l / r)
                }
                BinaryOp::Mod => {
                    if r == 0.0 {
                        return Err(ArithmeticError::new("division by zero"));
                    }
                    Float(l % r)
                }
                BinaryOp::Pow => Float(l.powf(r)),
                BinaryOp::Lt => bool_value(l < r),
                BinaryOp::Le => bool_value(l <= r),
                BinaryOp::Gt => bool_value(l > r),
                BinaryOp::Ge => bool_value(l >= r),
                BinaryOp::Eq => bool_value(l == r),
                BinaryOp::Ne => bool_value(l != r),
                BinaryOp::Comma => right,
                BinaryOp::And => bool_value(l != 0.0 && r != 0.0),
                BinaryOp::Or => bool_value(l != 0.0 || r != 0.0),
                BinaryOp::Shl | BinaryOp::Shr | BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                    Int(apply_int_op(l as i64, r as i64, op)?)
                }
            })
        }
    }
}

fn apply_int_op(l: i64, r: i64, op: BinaryOp) -> Result<i64, ArithmeticError> {
    Ok(match op {
        BinaryOp::Add => l.wrapping_add(r),
        BinaryOp::Sub => l.wrapping_sub(r),
        BinaryOp::Mul => l.wrapping_mul(r),
        BinaryOp::Div => {
            if r == 0 {
                return Err(ArithmeticError::new("division by zero"));
            }
            l.wrapping_div(r)
        }
        BinaryOp::Mod => {
            if r == 0 {
                return Err(ArithmeticError::new("division by zero"));
            }
            l.wrapping_rem(r)
        }
        BinaryOp::Pow => {
            if r < 0 {
                return Err(ArithmeticError::new("exponent less than 0"));
            }
            l.wrapping_pow(r.min(u32::MAX as i64) as u32)
        }
        BinaryOp::Shl => l.wrapping_shl((r & 63) as u32),
        BinaryOp::Shr => l.wrapping_shr((r & 63) as u32),
        BinaryOp::Lt => (l < r) as i64,
        BinaryOp::Le => (l <= r) as i64,
        BinaryOp::Gt => (l > r) as i64,
        BinaryOp::Ge => (l >= r) as i64,
        BinaryOp::Eq => (l == r) as i64,
        BinaryOp::Ne => (l != r) as i64,
        BinaryOp::BitAnd => l & r,
        BinaryOp::BitOr => l | r,
        BinaryOp::BitXor => l ^ r,
        BinaryOp::And => (l != 0 && r != 0) as i64,
        BinaryOp::Or => (l != 0 || r != 0) as i64,
        BinaryOp::Comma => r,
    })
}

fn apply_unary_op(operand: ArithValue, op: UnaryOp) -> ArithValue {
    match (op, operand) {
        (UnaryOp::Neg, ArithValue::Int(i)) => ArithValue::Int(i.wrapping_neg()),
        (UnaryOp::Neg, ArithValue::Float(f)) => ArithValue::Float(-f),
        (UnaryOp::Plus, v) => v,
        (UnaryOp::Not, v) => bool_value(!v.is_true()),
        (UnaryOp::BitNot, v) => ArithValue::Int(!v.as_int()),
    }
}

// ============================================================================
// Variables
// ============================================================================

/// Convert a variable's text to a number. Non-numeric text is evaluated as
/// an expression of its own; empty or unset is 0.
fn value_of_text(ctx: &mut ShellContext, text: &str, depth: usize) -> Result<ArithValue, ArithmeticError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(ArithValue::Int(0));
    }
    if let Some(i) = parse_int_literal(trimmed) {
        return Ok(ArithValue::Int(i));
    }
    if trimmed.contains('.') {
        if let Ok(f) = trimmed.parse::<f64>() {
            return Ok(ArithValue::Float(f));
        }
    }
    if depth >= MAX_VALUE_RECURSION {
        return Err(ArithmeticError::new(format!("{}: expression recursion level exceeded", trimmed)));
    }
    let expr = parse_arithmetic(trimmed).map_err(|e| ArithmeticError::new(format!("{}: {}", trimmed, e)))?;
    eval_expr(ctx, &expr, depth + 1)
}

/// Resolve the subscript of `a[...]`: associative keys are literal,
/// indexed subscripts are arithmetic.
fn resolve_subscript(ctx: &mut ShellContext, name: &str, subscript: &str, depth: usize) -> Result<String, ArithmeticError> {
    if ctx.arrays.is_associative(name) {
        return Ok(subscript.trim_matches(|c| c == '"' || c == '\'').to_string());
    }
    Ok(value_of_text(ctx, subscript, depth)?.as_int().to_string())
}

fn read_variable(
    ctx: &mut ShellContext,
    name: &str,
    subscript: Option<&str>,
    depth: usize,
) -> Result<ArithValue, ArithmeticError> {
    let text = match subscript {
        Some(sub) => {
            let key = resolve_subscript(ctx, name, sub, depth)?;
            ctx.arrays.get(name).and_then(|a| a.get(&key).cloned())
        }
        None => ctx.get_var(name),
    };
    match text {
        Some(t) => value_of_text(ctx, &t, depth),
        None => Ok(ArithValue::Int(0)),
    }
}

fn write_variable(
    ctx: &mut ShellContext,
    name: &str,
    subscript: Option<&str>,
    value: ArithValue,
    depth: usize,
) -> Result<(), ArithmeticError> {
    let text = value.to_string();
    let result = match subscript {
        Some(sub) => {
            let key = resolve_subscript(ctx, name, sub, depth)?;
            ctx.set_array_element(name, &key, text)
        }
        None => ctx.assign(name, text),
    };
    result.map_err(|e| ArithmeticError::new(e.to_string()))
}

// ============================================================================
// Evaluation
// ============================================================================

fn eval_expr(ctx: &mut ShellContext, expr: &ArithExpr, depth: usize) -> Result<ArithValue, ArithmeticError> {
    match expr {
        ArithExpr::Int(i) => Ok(ArithValue::Int(*i)),
        ArithExpr::Float(f) => Ok(ArithValue::Float(*f)),
        ArithExpr::Variable { name, subscript } => read_variable(ctx, name, subscript.as_deref(), depth),
        ArithExpr::Unary { op, operand } => {
            let v = eval_expr(ctx, operand, depth)?;
            Ok(apply_unary_op(v, *op))
        }
        ArithExpr::Binary { op: BinaryOp::And, left, right } => {
            if !eval_expr(ctx, left, depth)?.is_true() {
                return Ok(ArithValue::Int(0));
            }
            Ok(bool_value(eval_expr(ctx, right, depth)?.is_true()))
        }
        ArithExpr::Binary { op: BinaryOp::Or, left, right } => {
            if eval_expr(ctx, left, depth)?.is_true() {
                return Ok(ArithValue::Int(1));
            }
            Ok(bool_value(eval_expr(ctx, right, depth)?.is_true()))
        }
        ArithExpr::Binary { op, left, right } => {
            let l = eval_expr(ctx, left, depth)?;
            let r = eval_expr(ctx, right, depth)?;
            apply_binary_op(l, r, *op)
        }
        ArithExpr::Ternary { condition, then_expr, else_expr } => {
            if eval_expr(ctx, condition, depth)?.is_true() {
                eval_expr(ctx, then_expr, depth)
            } else {
                eval_expr(ctx, else_expr, depth)
            }
        }
        ArithExpr::Assign { op, name, subscript, value } => {
            let rhs = eval_expr(ctx, value, depth)?;
            let new_value = match op {
                AssignOp::Assign => rhs,
                AssignOp::Compound(bin) => {
                    let current = read_variable(ctx, name, subscript.as_deref(), depth)?;
                    apply_binary_op(current, rhs, *bin)?
                }
            };
            write_variable(ctx, name, subscript.as_deref(), new_value, depth)?;
            Ok(new_value)
        }
        ArithExpr::IncDec { name, subscript, delta, prefix } => {
            let current = read_variable(ctx, name, subscript.as_deref(), depth)?;
            let updated = apply_binary_op(current, ArithValue::Int(*delta), BinaryOp::Add)?;
            write_variable(ctx, name, subscript.as_deref(), updated, depth)?;
            Ok(if *prefix { updated } else { current })
        }
    }
}

/// Evaluate a parsed expression
pub fn evaluate(ctx: &mut ShellContext, expr: &ArithExpr) -> Result<ArithValue, ArithmeticError> {
    eval_expr(ctx, expr, 0)
}

/// Parse and evaluate already-expanded expression text
pub fn evaluate_str(ctx: &mut ShellContext, text: &str) -> Result<ArithValue, InterpreterError> {
    let expr = parse_arithmetic(text).map_err(|e| ArithmeticError::new(format!("{}: {}", text.trim(), e)))?;
    Ok(evaluate(ctx, &expr)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(ctx: &mut ShellContext, s: &str) -> String {
        evaluate_str(ctx, s).unwrap().to_string()
    }

    #[test]
    fn test_precedence() {
        let mut ctx = ShellContext::default();
        assert_eq!(eval(&mut ctx, "2+3*4"), "14");
        assert_eq!(eval(&mut ctx, "(2+3)*4"), "20");
        assert_eq!(eval(&mut ctx, "2**3**2"), "512");
        assert_eq!(eval(&mut ctx, "-2**2"), "4");
        assert_eq!(eval(&mut ctx, "1 ? 2 : 3"), "2");
        assert_eq!(eval(&mut ctx, "7 % 3 + (1 << 4)"), "17");
    }

    #[test]
    fn test_division_by_zero() {
        let mut ctx = ShellContext::default();
        let err = evaluate_str(&mut ctx, "5/0").unwrap_err();
        assert_eq!(err.stderr(), "zshell: division by zero\n");
        assert!(evaluate_str(&mut ctx, "5%0").is_err());
    }

    #[test]
    fn test_literals_and_floats() {
        let mut ctx = ShellContext::default();
        assert_eq!(eval(&mut ctx, "0x1f"), "31");
        assert_eq!(eval(&mut ctx, "010"), "8");
        assert_eq!(eval(&mut ctx, "2#1010"), "10");
        assert_eq!(eval(&mut ctx, "1.5 * 2"), "3.");
        assert_eq!(eval(&mut ctx, "1 / 4.0"), "0.25");
    }

    #[test]
    fn test_assignment_and_incdec() {
        let mut ctx = ShellContext::default();
        assert_eq!(eval(&mut ctx, "x = 5"), "5");
        assert_eq!(eval(&mut ctx, "x += 2"), "7");
        assert_eq!(eval(&mut ctx, "x++"), "7");
        assert_eq!(ctx.get_var("x").as_deref(), Some("8"));
        assert_eq!(eval(&mut ctx, "--x"), "7");
        assert_eq!(eval(&mut ctx, "y = x, y * 2"), "14");
    }

    #[test]
    fn test_short_circuit() {
        let mut ctx = ShellContext::default();
        assert_eq!(eval(&mut ctx, "0 && (z = 1)"), "0");
        assert_eq!(ctx.get_var("z"), None);
        assert_eq!(eval(&mut ctx, "1 || 5/0"), "1");
    }

    #[test]
    fn test_variables_as_expressions() {
        let mut ctx = ShellContext::default();
        ctx.set_var("a", "3");
        ctx.set_var("b", "a + 1");
        assert_eq!(eval(&mut ctx, "b * 2"), "8");
        assert_eq!(eval(&mut ctx, "unset_name + 1"), "1");
    }

    #[test]
    fn test_array_elements() {
        let mut ctx = ShellContext::default();
        eval(&mut ctx, "arr[1] = 10");
        eval(&mut ctx, "arr[1+1] = arr[1] * 2");
        assert_eq!(ctx.array_values("arr"), Some(vec!["10".to_string(), "20".to_string()]));
    }
}
