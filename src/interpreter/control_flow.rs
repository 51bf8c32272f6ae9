//! Control Flow Execution
//!
//! Handles control flow constructs:
//! - if/elif/else
//! - for loops
//! - C-style for loops
//! - while/until loops
//! - case statements, including `;&` and `;;&`
//! - `(( ))` arithmetic commands
//!
//! Conditions run with `condition_depth` raised so errexit and the ERR
//! trap leave them alone. `break n`/`continue n` arrive as errors and are
//! consumed one loop level at a time.

use crate::ast::types::{
    ArithForNode, ArithmeticCommandNode, CaseItemNode, CaseNode, CaseTerminator, ForNode, IfNode, StatementNode,
    WhileNode,
};
use crate::interpreter::errors::{
    BreakError, ContinueError, ExecutionLimitError, InterpreterError, LimitType,
};
use crate::interpreter::execution_engine::ExecutionEngine;
use crate::interpreter::helpers::quoting::quote_value;
use crate::interpreter::helpers::xtrace::trace_text;
use crate::interpreter::types::{ExecResult, ShellContext};
use crate::interpreter::word_expansion::{
    compile_pattern, evaluate_arithmetic_text, expand_pattern, expand_word_string, expand_words,
};

/// What a loop does after its body raised an error
enum LoopStep {
    /// `continue`: next iteration
    Next,
    /// `break`: leave the loop
    Stop,
    /// Anything else, or a break/continue aimed at an outer loop
    Propagate(InterpreterError),
}

fn loop_step(error: InterpreterError, out: &mut ExecResult) -> LoopStep {
    match error {
        InterpreterError::Break(e) => {
            out.stdout.push_str(&e.stdout);
            out.stderr.push_str(&e.stderr);
            if e.levels > 1 {
                return LoopStep::Propagate(BreakError::new(e.levels - 1).into());
            }
            LoopStep::Stop
        }
        InterpreterError::Continue(e) => {
            out.stdout.push_str(&e.stdout);
            out.stderr.push_str(&e.stderr);
            if e.levels > 1 {
                return LoopStep::Propagate(ContinueError::new(e.levels - 1).into());
            }
            LoopStep::Next
        }
        other => LoopStep::Propagate(other),
    }
}

/// Run one loop body. Ok(false) when the loop should end.
fn run_iteration(
    ctx: &mut ShellContext,
    body: &[StatementNode],
    out: &mut ExecResult,
) -> Result<bool, InterpreterError> {
    match ExecutionEngine.execute_statements(ctx, body) {
        Ok(r) => {
            out.append(r);
            Ok(true)
        }
        Err(e) => match loop_step(e, out) {
            LoopStep::Next => {
                out.exit_code = 0;
                Ok(true)
            }
            LoopStep::Stop => {
                out.exit_code = 0;
                Ok(false)
            }
            LoopStep::Propagate(e) => Err(e.prepend_output(&out.stdout, &out.stderr)),
        },
    }
}

fn count_iteration(ctx: &ShellContext, iterations: &mut u64) -> Result<(), InterpreterError> {
    *iterations += 1;
    if *iterations > ctx.limits.max_loop_iterations {
        return Err(ExecutionLimitError::new(
            format!("too many loop iterations (>{})", ctx.limits.max_loop_iterations),
            LimitType::Iterations,
        )
        .into());
    }
    Ok(())
}

/// Run a condition list. Its status is `last_exit_code` afterwards.
fn run_condition(ctx: &mut ShellContext, statements: &[StatementNode]) -> Result<ExecResult, InterpreterError> {
    ctx.condition_depth += 1;
    let result = ExecutionEngine.execute_statements(ctx, statements);
    ctx.condition_depth -= 1;
    result
}

/// Run a loop with `loop_depth` raised for `break`/`continue`
fn in_loop<F>(ctx: &mut ShellContext, body: F) -> Result<ExecResult, InterpreterError>
where
    F: FnOnce(&mut ShellContext) -> Result<ExecResult, InterpreterError>,
{
    ctx.loop_depth += 1;
    let result = body(ctx);
    ctx.loop_depth -= 1;
    result
}

pub fn execute_if(ctx: &mut ShellContext, node: &IfNode) -> Result<ExecResult, InterpreterError> {
    let mut out = ExecResult::ok();
    for clause in &node.clauses {
        let cond = run_condition(ctx, &clause.condition).map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?;
        out.stdout.push_str(&cond.stdout);
        out.stderr.push_str(&cond.stderr);
        if cond.exit_code == 0 {
            return run_branch(ctx, &clause.body, out);
        }
    }
    match &node.else_body {
        Some(body) => run_branch(ctx, body, out),
        None => {
            out.exit_code = 0;
            Ok(out)
        }
    }
}

fn run_branch(
    ctx: &mut ShellContext,
    body: &[StatementNode],
    mut out: ExecResult,
) -> Result<ExecResult, InterpreterError> {
    if body.is_empty() {
        out.exit_code = 0;
        return Ok(out);
    }
    let r = ExecutionEngine
        .execute_statements(ctx, body)
        .map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?;
    out.append(r);
    Ok(out)
}

pub fn execute_for(ctx: &mut ShellContext, node: &ForNode) -> Result<ExecResult, InterpreterError> {
    let values = match &node.words {
        Some(words) => expand_words(ctx, words)?,
        None => ctx.positional.clone(),
    };

    in_loop(ctx, |ctx| {
        let mut out = ExecResult::ok();
        let mut iterations = 0;
        for value in values {
            if ctx.is_cancelled() {
                break;
            }
            count_iteration(ctx, &mut iterations).map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?;
            if let Some(trace) = trace_text(ctx, &format!("{}={}", node.variable, quote_value(&value))) {
                out.stderr.push_str(&trace);
            }
            ctx.assign(&node.variable, value)
                .map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?;
            if !run_iteration(ctx, &node.body, &mut out)? {
                break;
            }
        }
        Ok(out)
    })
}

pub fn execute_arith_for(ctx: &mut ShellContext, node: &ArithForNode) -> Result<ExecResult, InterpreterError> {
    if !node.init.trim().is_empty() {
        evaluate_arithmetic_text(ctx, &node.init)?;
    }

    in_loop(ctx, |ctx| {
        let mut out = ExecResult::ok();
        let mut iterations = 0;
        loop {
            if ctx.is_cancelled() {
                break;
            }
            let keep_going = node.condition.trim().is_empty()
                || evaluate_arithmetic_text(ctx, &node.condition)
                    .map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?
                    .is_true();
            if !keep_going {
                break;
            }
            count_iteration(ctx, &mut iterations).map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?;
            if !run_iteration(ctx, &node.body, &mut out)? {
                break;
            }
            if !node.update.trim().is_empty() {
                evaluate_arithmetic_text(ctx, &node.update)
                    .map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?;
            }
        }
        Ok(out)
    })
}

/// `while` and `until`
pub fn execute_while(ctx: &mut ShellContext, node: &WhileNode) -> Result<ExecResult, InterpreterError> {
    in_loop(ctx, |ctx| {
        let mut out = ExecResult::ok();
        let mut iterations = 0;
        loop {
            if ctx.is_cancelled() {
                break;
            }
            let cond = match run_condition(ctx, &node.condition) {
                Ok(r) => r,
                Err(e) => match loop_step(e, &mut out) {
                    LoopStep::Next => continue,
                    LoopStep::Stop => break,
                    LoopStep::Propagate(e) => return Err(e.prepend_output(&out.stdout, &out.stderr)),
                },
            };
            out.stdout.push_str(&cond.stdout);
            out.stderr.push_str(&cond.stderr);
            if (cond.exit_code == 0) == node.until {
                break;
            }
            count_iteration(ctx, &mut iterations).map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?;
            if !run_iteration(ctx, &node.body, &mut out)? {
                break;
            }
        }
        Ok(out)
    })
}

fn case_item_matches(ctx: &mut ShellContext, item: &CaseItemNode, subject: &str) -> Result<bool, InterpreterError> {
    for word in &item.patterns {
        let pattern = expand_pattern(ctx, word)?;
        if compile_pattern(ctx, &pattern).matches(subject) {
            return Ok(true);
        }
    }
    Ok(false)
}

pub fn execute_case(ctx: &mut ShellContext, node: &CaseNode) -> Result<ExecResult, InterpreterError> {
    let subject = expand_word_string(ctx, &node.word)?;
    let mut out = ExecResult::ok();
    let mut fall_through = false;

    for item in &node.items {
        let matched = fall_through
            || case_item_matches(ctx, item, &subject).map_err(|e| e.prepend_output(&out.stdout, &out.stderr))?;
        fall_through = false;
        if !matched {
            continue;
        }
        out = run_branch(ctx, &item.body, out)?;
        match item.terminator {
            CaseTerminator::Break => break,
            CaseTerminator::FallThrough => fall_through = true,
            CaseTerminator::Continue => {}
        }
    }
    Ok(out)
}

/// `(( expr ))`: status 0 when the value is non-zero
pub fn execute_arith_command(
    ctx: &mut ShellContext,
    node: &ArithmeticCommandNode,
) -> Result<ExecResult, InterpreterError> {
    if node.line > 0 {
        ctx.current_line = node.line;
    }
    let trace = trace_text(ctx, &format!("(({}))", node.expression)).unwrap_or_default();
    let value = evaluate_arithmetic_text(ctx, &node.expression).map_err(|e| e.prepend_output("", &trace))?;
    let status = if value.is_true() { 0 } else { 1 };
    Ok(ExecResult::new(String::new(), trace, status))
}
